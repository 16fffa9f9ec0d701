use image::{DynamicImage, RgbaImage};

use crate::foundation::color::Rgba8;

pub type PremulRgba8 = [u8; 4];

/// Decoded pixels handed from an adapter to the compositor and encoder.
///
/// Pixels are straight-alpha RGBA8. `background` records the color a background pass
/// already flattened onto the image so a second pass is a no-op.
#[derive(Clone, Debug)]
pub struct NormalizedImage {
    pixels: RgbaImage,
    background: Option<Rgba8>,
}

impl NormalizedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            background: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `(width, height)`.
    pub fn bounds(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    pub fn background(&self) -> Option<Rgba8> {
        self.background
    }

    pub(crate) fn set_background(&mut self, bg: Rgba8) {
        self.background = Some(bg);
    }
}

impl From<DynamicImage> for NormalizedImage {
    fn from(img: DynamicImage) -> Self {
        Self::new(img.into_rgba8())
    }
}

impl From<RgbaImage> for NormalizedImage {
    fn from(pixels: RgbaImage) -> Self {
        Self::new(pixels)
    }
}

/// Map a 1-based page request onto a 0-based index into `count` pages.
///
/// `0` means "unset" and picks the first page; anything past the end also falls back to
/// the first page.
pub fn select_page(page: u32, count: usize) -> usize {
    let page = page as usize;
    if page == 0 || page > count {
        0
    } else {
        page - 1
    }
}

/// Source-over of premultiplied `src` onto premultiplied `dst`.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

pub fn premultiply(px: [u8; 4]) -> PremulRgba8 {
    let a = u16::from(px[3]);
    [
        mul_div255(u16::from(px[0]), a),
        mul_div255(u16::from(px[1]), a),
        mul_div255(u16::from(px[2]), a),
        px[3],
    ]
}

pub fn unpremultiply(px: PremulRgba8) -> [u8; 4] {
    let a = u32::from(px[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    if a == 255 {
        return px;
    }
    let un = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;
    [un(px[0]), un(px[1]), un(px[2]), px[3]]
}

pub fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

//! Background underlay and matrix-code border.

use image::{Rgba, RgbaImage};

use crate::config::RenderConfig;
use crate::foundation::color::Rgba8;
use crate::foundation::core::{NormalizedImage, over, premultiply, unpremultiply};
use crate::registry::Strategy;

/// Background to flatten under an image decoded by `strategy` as `media_type`, if any.
///
/// SVG fills its own background while rasterizing, so it never gets one here. Diagrams
/// fall back to the diagram background when none is configured.
pub fn background_for(
    config: &RenderConfig,
    strategy: Option<Strategy>,
    media_type: &str,
) -> Option<Rgba8> {
    if media_type == "image/svg" {
        return None;
    }
    let bg = match (config.bg, strategy) {
        (Some(bg), _) => bg,
        (None, Some(Strategy::Diagram)) => config.mermaid_bg,
        (None, _) => return None,
    };
    (!bg.is_transparent()).then_some(bg)
}

/// Premultiplied source-over of every pixel onto `bg`.
///
/// An image that already carries a background is returned unchanged.
pub fn apply_background(img: &mut NormalizedImage, bg: Rgba8) {
    if bg.is_transparent() || img.background().is_some() {
        return;
    }
    let base = bg.to_premul();
    for px in img.pixels_mut().pixels_mut() {
        px.0 = unpremultiply(over(base, premultiply(px.0)));
    }
    img.set_background(bg);
}

/// New canvas of `(w + 2b) x (h + 2b)` filled with `bg`, with `img` drawn over at `(b, b)`.
pub fn add_border(img: &NormalizedImage, border: u32, bg: Rgba8) -> NormalizedImage {
    let (w, h) = img.bounds();
    let mut canvas = RgbaImage::from_pixel(w + 2 * border, h + 2 * border, Rgba(bg.to_array()));
    let base = bg.to_premul();
    for (x, y, px) in img.pixels().enumerate_pixels() {
        let out = unpremultiply(over(base, premultiply(px.0)));
        canvas.put_pixel(x + border, y + border, Rgba(out));
    }
    let mut out = NormalizedImage::new(canvas);
    if !bg.is_transparent() {
        out.set_background(bg);
    }
    out
}

/// Run the compositor stage for one decoded target.
pub fn composite(
    config: &RenderConfig,
    strategy: Option<Strategy>,
    media_type: &str,
    mut img: NormalizedImage,
) -> NormalizedImage {
    if let Some(bg) = background_for(config, strategy, media_type) {
        tracing::debug!("background {bg}");
        apply_background(&mut img, bg);
    }
    img
}

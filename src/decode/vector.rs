use resvg::tiny_skia;

use crate::decode::{DecodeContext, Source};
use crate::foundation::color::Rgba8;
use crate::foundation::core::{NormalizedImage, unpremultiply};
use crate::foundation::error::{IvError, IvResult};

const MAX_DIM: u32 = 16_384;

pub fn decode(ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    let content = src.handle.into_stream()?;
    let bytes = content.read_all()?;
    render_svg(ctx, &bytes)
}

/// Parse and rasterize SVG with the system font database.
///
/// Best-fit scaled into the configured display bounds when any is set, and filled with the
/// configured background.
pub fn render_svg(ctx: &DecodeContext<'_>, bytes: &[u8]) -> IvResult<NormalizedImage> {
    let opts = usvg::Options {
        fontdb: ctx.engines.system_fonts(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| IvError::decode(format!("parse svg: {e}")))?;

    let size = tree.size();
    let (w, h) = raster_size(size.width(), size.height(), ctx.config.fit_bounds())?;
    let mut pixmap = tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| IvError::decode("failed to allocate svg pixmap"))?;
    if let Some(bg) = ctx.config.bg {
        pixmap.fill(skia_color(bg));
    }

    let xform = tiny_skia::Transform::from_scale(
        w as f32 / size.width(),
        h as f32 / size.height(),
    );
    resvg::render(&tree, xform, &mut pixmap.as_mut());
    pixmap_to_image(&pixmap)
}

/// Pixel size for an SVG of `(w, h)` user units, best-fit into `bounds` when given.
pub fn raster_size(w: f32, h: f32, bounds: Option<(u32, u32)>) -> IvResult<(u32, u32)> {
    if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
        return Err(IvError::decode("svg has invalid width/height"));
    }
    let scale = match bounds {
        Some((bw, bh)) => (bw as f32 / w).min(bh as f32 / h),
        None => 1.0,
    };
    let pw = ((w * scale).round() as u32).max(1);
    let ph = ((h * scale).round() as u32).max(1);
    if pw > MAX_DIM || ph > MAX_DIM {
        return Err(IvError::decode(format!(
            "svg raster size too large: {pw}x{ph} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }
    Ok((pw, ph))
}

pub(crate) fn skia_color(c: Rgba8) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

/// Premultiplied pixmap to a straight-alpha image.
pub(crate) fn pixmap_to_image(pixmap: &tiny_skia::Pixmap) -> IvResult<NormalizedImage> {
    let mut data = pixmap.data().to_vec();
    for px in data.chunks_exact_mut(4) {
        let out = unpremultiply([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&out);
    }
    let img = image::RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .ok_or_else(|| IvError::decode("pixmap size mismatch"))?;
    Ok(NormalizedImage::new(img))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_size_without_bounds() {
        assert_eq!(raster_size(120.0, 80.0, None).unwrap(), (120, 80));
    }

    #[test]
    fn best_fit_preserves_aspect() {
        assert_eq!(raster_size(100.0, 50.0, Some((400, 400))).unwrap(), (400, 200));
        assert_eq!(raster_size(100.0, 50.0, Some((64, 400))).unwrap(), (64, 32));
    }

    #[test]
    fn rejects_degenerate_and_huge() {
        assert!(raster_size(0.0, 10.0, None).is_err());
        assert!(raster_size(f32::NAN, 10.0, None).is_err());
        assert!(raster_size(20_000.0, 10.0, None).is_err());
    }

    #[test]
    fn pixmap_conversion_unpremultiplies() {
        let mut pm = tiny_skia::Pixmap::new(1, 1).unwrap();
        pm.fill(tiny_skia::Color::from_rgba8(255, 0, 0, 128));
        let img = pixmap_to_image(&pm).unwrap();
        let px = img.pixels().get_pixel(0, 0).0;
        assert_eq!(px[3], 128);
        assert!(px[0] >= 254);
    }
}

use image::Rgba;
use qrcode::{EcLevel, QrCode};

use crate::composite;
use crate::config::RenderConfig;
use crate::foundation::color::Rgba8;
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::{IvError, IvResult};

/// Media type reported for generated matrix codes.
pub const MEDIA_TYPE: &str = "image/bitmap";

/// Pixels per QR module.
pub const MODULE_PX: u32 = 10;

/// Encode `text` (a URL or `WIFI:` string) as a QR code framed by the configured border.
pub fn render_url(config: &RenderConfig, text: &str) -> IvResult<NormalizedImage> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M)
        .map_err(|e| IvError::decode(format!("qr: {e}")))?;
    let bg = config.bg.unwrap_or(Rgba8::TRANSPARENT);
    let pixels = code
        .render::<Rgba<u8>>()
        .dark_color(Rgba(config.fg.to_array()))
        .light_color(Rgba(bg.to_array()))
        .quiet_zone(false)
        .module_dimensions(MODULE_PX, MODULE_PX)
        .build();
    tracing::debug!(modules = code.width(), "qr {}x{}", pixels.width(), pixels.height());
    Ok(composite::add_border(
        &NormalizedImage::new(pixels),
        config.border,
        bg,
    ))
}

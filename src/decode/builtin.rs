use crate::decode::{DecodeContext, Source};
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::{IvError, IvResult};

/// Decode with the `image` crate, format guessed from content.
pub fn decode(_ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    let content = src.handle.into_stream()?;
    let bytes = content.read_all()?;
    decode_bytes(&bytes)
}

/// Decode an in-memory PNG, JPEG, GIF, BMP, ICO, TIFF, WebP or Netpbm image.
pub fn decode_bytes(bytes: &[u8]) -> IvResult<NormalizedImage> {
    let img = image::load_from_memory(bytes).map_err(|e| IvError::decode(e.to_string()))?;
    tracing::debug!("decoded {}x{}", img.width(), img.height());
    Ok(NormalizedImage::from(img))
}

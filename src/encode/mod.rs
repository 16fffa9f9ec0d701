//! Terminal graphics output.

pub mod detection;
pub mod iterm2;
pub mod kitty;

use std::io::{Cursor, Write};

use crate::foundation::core::NormalizedImage;
use crate::foundation::error::{IvError, IvResult};

pub use detection::{Protocol, TerminalCapabilities};

/// Writes one image as a terminal escape sequence.
pub trait GraphicsEncoder {
    fn protocol(&self) -> Protocol;

    fn encode(&self, w: &mut dyn Write, img: &NormalizedImage) -> IvResult<()>;
}

pub fn encoder_for(protocol: Protocol) -> Box<dyn GraphicsEncoder> {
    match protocol {
        Protocol::Kitty => Box::new(kitty::KittyEncoder),
        Protocol::Iterm2 => Box::new(iterm2::Iterm2Encoder),
    }
}

/// PNG bytes of the image.
pub fn png_bytes(img: &NormalizedImage) -> IvResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.pixels()
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| IvError::Other(anyhow::anyhow!("encode png: {e}")))?;
    Ok(buf)
}

fn write_err(e: std::io::Error) -> IvError {
    IvError::Other(anyhow::Error::new(e).context("write terminal output"))
}

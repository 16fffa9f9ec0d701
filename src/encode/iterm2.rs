use std::io::Write;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::{GraphicsEncoder, Protocol, png_bytes, write_err};
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::IvResult;

/// iTerm2 inline images (OSC 1337).
#[derive(Clone, Copy, Debug, Default)]
pub struct Iterm2Encoder;

impl GraphicsEncoder for Iterm2Encoder {
    fn protocol(&self) -> Protocol {
        Protocol::Iterm2
    }

    fn encode(&self, w: &mut dyn Write, img: &NormalizedImage) -> IvResult<()> {
        let png = png_bytes(img)?;
        write!(w, "{}", sequence(&png)).map_err(write_err)
    }
}

fn sequence(png: &[u8]) -> String {
    format!(
        "\x1b]1337;File=name={};size={};inline=1:{}\x07",
        STANDARD.encode("iv.png"),
        png.len(),
        STANDARD.encode(png)
    )
}

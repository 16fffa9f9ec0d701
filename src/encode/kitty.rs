use std::io::Write;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::{GraphicsEncoder, Protocol, png_bytes, write_err};
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::IvResult;

/// Base64 payload bytes per escape sequence.
pub const CHUNK: usize = 4096;

/// Kitty graphics protocol: PNG payload, transmitted and displayed in one action.
#[derive(Clone, Copy, Debug, Default)]
pub struct KittyEncoder;

impl GraphicsEncoder for KittyEncoder {
    fn protocol(&self) -> Protocol {
        Protocol::Kitty
    }

    fn encode(&self, w: &mut dyn Write, img: &NormalizedImage) -> IvResult<()> {
        let png = png_bytes(img)?;
        write_payload(w, &png).map_err(write_err)
    }
}

fn write_payload(w: &mut dyn Write, png: &[u8]) -> std::io::Result<()> {
    let data = STANDARD.encode(png);
    let chunks: Vec<&[u8]> = data.as_bytes().chunks(CHUNK).collect();
    if chunks.is_empty() {
        return w.write_all(b"\x1b_Ga=T,f=100,q=2,m=0;\x1b\\");
    }
    let last = chunks.len() - 1;
    for (i, chunk) in chunks.iter().enumerate() {
        let more = u8::from(i != last);
        if i == 0 {
            write!(w, "\x1b_Ga=T,f=100,q=2,m={more};")?;
        } else {
            write!(w, "\x1b_Gm={more};")?;
        }
        w.write_all(chunk)?;
        w.write_all(b"\x1b\\")?;
    }
    Ok(())
}

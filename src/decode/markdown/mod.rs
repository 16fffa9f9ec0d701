//! Markdown rendered through an intermediate PDF.
//!
//! The text is laid out onto Letter pages with the PDF base-14 fonts, written to an in-memory
//! PDF and handed back to the registry, which routes it to the raster engine.

pub mod layout;
pub mod pdf;

use std::borrow::Cow;
use std::sync::mpsc;
use std::time::Duration;

use image::RgbaImage;

use crate::classify::ClassifiedContent;
use crate::content::MemoryContent;
use crate::decode::{DecodeContext, Handle, Source};
use crate::foundation::core::NormalizedImage;
use crate::foundation::error::{IvError, IvResult};

/// Upper bound on a single image fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const POLL: Duration = Duration::from_millis(50);

pub fn decode(ctx: &DecodeContext<'_>, src: Source<'_>) -> IvResult<NormalizedImage> {
    let content = src.handle.into_stream()?;
    let bytes = content.read_all()?;
    let text = decode_text(&bytes);

    let laid = layout::layout(&text, &mut |url: &str| fetch_image(ctx, url))?;
    tracing::debug!(
        pages = laid.pages.len(),
        images = laid.images.len(),
        "markdown laid out"
    );
    let pdf = pdf::write(&laid)?;

    let id = format!("{}.pdf", src.identifier);
    let mut mem = MemoryContent::new(id.clone(), pdf);
    ctx.decode(&id, &ClassifiedContent::pdf(), Handle::Stream(&mut mem))
}

/// UTF-8 when the bytes are valid UTF-8 (a leading BOM is dropped), Latin-1 otherwise.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(body) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(body.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Download and decode an image link. Failures are logged and the image skipped; only
/// cancellation is an error.
fn fetch_image(ctx: &DecodeContext<'_>, url: &str) -> IvResult<Option<RgbaImage>> {
    let bytes = match fetch(ctx, url) {
        Ok(b) => b,
        Err(IvError::Cancelled) => return Err(IvError::Cancelled),
        Err(e) => {
            tracing::warn!("unable to fetch {url}: {e}");
            return Ok(None);
        }
    };
    match ctx.decode_bytes(url, bytes) {
        Ok(img) => Ok(Some(img.into_pixels())),
        Err(IvError::Cancelled) => Err(IvError::Cancelled),
        Err(e) => {
            tracing::warn!("unable to decode {url}: {e}");
            Ok(None)
        }
    }
}

/// GET `url` on a helper thread while polling the cancellation token.
#[tracing::instrument(skip(ctx))]
fn fetch(ctx: &DecodeContext<'_>, url: &str) -> IvResult<Vec<u8>> {
    let client = ctx.engines.http()?.clone();
    let target = url.to_owned();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let res = client
            .get(&target)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map(|b| b.to_vec())
            .map_err(|e| e.to_string());
        let _ = tx.send(res);
    });

    loop {
        ctx.cancel.check()?;
        match rx.recv_timeout(POLL) {
            Ok(res) => {
                return res.map_err(|e| IvError::Other(anyhow::anyhow!(e)));
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(IvError::Other(anyhow::anyhow!("fetch worker exited")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::decode::Engines;
    use crate::foundation::cancel::CancelToken;
    use crate::process::Tools;

    #[test]
    fn latin1_text_is_decoded_per_byte() {
        assert_eq!(decode_text(b"# Caf\xe9 M\xfcnchen"), "# Café München");
        assert_eq!(decode_text("# Café".as_bytes()), "# Café");
        assert_eq!(decode_text(b"\xEF\xBB\xBFhi"), "hi");
    }

    #[test]
    fn cancelled_fetch_returns_promptly() {
        let config = RenderConfig::default();
        let engines = Engines::new(Tools::with_search_path(Vec::new()));
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = DecodeContext::new(&config, &engines, &cancel);
        let err = fetch_image(&ctx, "http://192.0.2.1/x.png").unwrap_err();
        assert!(matches!(err, IvError::Cancelled));
    }

    #[test]
    fn unreachable_host_is_skipped() {
        let config = RenderConfig::default();
        let engines = Engines::new(Tools::with_search_path(Vec::new()));
        let cancel = CancelToken::new();
        let ctx = DecodeContext::new(&config, &engines, &cancel);
        assert!(fetch_image(&ctx, "http://127.0.0.1:9/x.png").unwrap().is_none());
    }
}

use std::io::Read;
use std::path::Path;

use crate::foundation::error::{IvError, IvResult};

/// Bytes read from the head of a stream when sniffing its media type.
pub const SNIFF_LEN: u64 = 3072;

/// Normalized media type plus lowercased file extension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassifiedContent {
    pub media_type: String,
    pub extension: String,
}

impl ClassifiedContent {
    /// Build from a raw media type and extension, normalizing the media type.
    pub fn new(media_type: &str, extension: &str) -> Self {
        Self {
            media_type: normalize_media_type(media_type),
            extension: extension.to_ascii_lowercase(),
        }
    }

    /// Classification used when re-entering the registry with a generated PDF.
    pub fn pdf() -> Self {
        Self::new("application/pdf", "pdf")
    }

    /// Classification used when re-entering the registry with generated SVG.
    pub fn svg() -> Self {
        Self::new("image/svg", "svg")
    }
}

/// Sniff `reader` and pair the result with the extension of `name`.
///
/// Reads at most [`SNIFF_LEN`] bytes; the caller rewinds before decoding.
pub fn classify(reader: &mut dyn Read, name: &str) -> IvResult<ClassifiedContent> {
    let mut prefix = Vec::with_capacity(SNIFF_LEN as usize);
    reader
        .take(SNIFF_LEN)
        .read_to_end(&mut prefix)
        .map_err(|e| IvError::classification(e.to_string()))?;
    Ok(ClassifiedContent::new(&sniff(&prefix), &file_ext(name)))
}

/// Lowercased extension of `name` without the leading dot; empty when there is none.
pub fn file_ext(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Drop any `;param` suffix and a trailing `+xml`.
pub fn normalize_media_type(raw: &str) -> String {
    let base = raw.split(';').next().unwrap_or(raw).trim();
    base.strip_suffix("+xml").unwrap_or(base).to_owned()
}

/// Raw (unnormalized) media type for a byte prefix.
pub fn sniff(prefix: &[u8]) -> String {
    if let Some(kind) = infer::get(prefix)
        && kind.matcher_type() != infer::MatcherType::Text
    {
        return alias(kind.mime_type(), prefix).to_owned();
    }
    if let Some(t) = sniff_binary(prefix) {
        return t.to_owned();
    }
    sniff_text(prefix).to_owned()
}

fn alias<'a>(mime: &'a str, prefix: &[u8]) -> &'a str {
    match mime {
        "image/vnd.microsoft.icon" => "image/x-icon",
        "application/vnd.rar" => "application/x-rar-compressed",
        "image/vnd.ms-photo" => "image/jxr",
        "audio/x-flac" => "audio/flac",
        "application/x-msdownload" | "application/x-dosexec" => {
            "application/vnd.microsoft.portable-executable"
        }
        "application/msword" => "application/vnd.ms-word",
        "application/rtf" => "text/rtf",
        "application/font-woff" if prefix.starts_with(b"wOF2") => "font/woff2",
        "application/font-woff" => "font/woff",
        "application/font-sfnt" if prefix.starts_with(b"OTTO") => "font/otf",
        "application/font-sfnt" => "font/ttf",
        other => other,
    }
}

fn sniff_binary(prefix: &[u8]) -> Option<&'static str> {
    if let &[b'P', kind, sep, ..] = prefix
        && sep.is_ascii_whitespace()
    {
        let t = match kind {
            b'1' | b'4' => Some("image/x-portable-bitmap"),
            b'2' | b'5' => Some("image/x-portable-graymap"),
            b'3' | b'6' => Some("image/x-portable-pixmap"),
            b'7' => Some("image/x-portable-arbitrarymap"),
            b'f' | b'F' => Some("image/x-portable-floatmap"),
            _ => None,
        };
        if t.is_some() {
            return t;
        }
    }
    if prefix.get(60..68) == Some(b"BOOKMOBI".as_slice()) {
        return Some("application/x-mobipocket-ebook");
    }
    if prefix.starts_with(b"ttcf") {
        return Some("font/collection");
    }
    None
}

fn sniff_text(prefix: &[u8]) -> &'static str {
    let body = prefix.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(prefix);
    if body.starts_with(b"{\\rtf") {
        return "text/rtf";
    }
    if !is_utf8_text(body) {
        return if is_legacy_text(body) {
            "text/plain; charset=iso-8859-1"
        } else {
            "application/octet-stream"
        };
    }

    let text = String::from_utf8_lossy(body);
    let head = text.trim_start();
    let lower = head.to_ascii_lowercase();
    if lower.starts_with("<?xml") || lower.starts_with("<svg") || lower.starts_with("<!doctype svg")
    {
        return if lower.contains("<svg") {
            "image/svg+xml"
        } else {
            "text/xml"
        };
    }
    if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
        return "text/html; charset=utf-8";
    }
    "text/plain; charset=utf-8"
}

/// Valid UTF-8 without NUL bytes; a multi-byte sequence cut off by the prefix bound is fine.
fn is_utf8_text(bytes: &[u8]) -> bool {
    if bytes.contains(&0) {
        return false;
    }
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && bytes.len() as u64 >= SNIFF_LEN - 3,
    }
}

/// Single-byte encoded text: no NUL and at most one stray control byte per hundred.
fn is_legacy_text(bytes: &[u8]) -> bool {
    if bytes.contains(&0) {
        return false;
    }
    let controls = bytes
        .iter()
        .filter(|&&b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b)) || b == 0x7f)
        .count();
    controls * 100 <= bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(bytes: &[u8]) -> String {
        normalize_media_type(&sniff(bytes))
    }

    #[test]
    fn normalizes_params_and_xml_suffix() {
        assert_eq!(normalize_media_type("text/plain; charset=utf-8"), "text/plain");
        assert_eq!(normalize_media_type("image/svg+xml"), "image/svg");
        assert_eq!(normalize_media_type("application/pdf"), "application/pdf");
    }

    #[test]
    fn extension_is_lowercased_without_dot() {
        assert_eq!(file_ext("a/b/Photo.JPG"), "jpg");
        assert_eq!(file_ext("archive.tar.gz"), "gz");
        assert_eq!(file_ext("README"), "");
    }

    #[test]
    fn sniffs_binary_signatures() {
        assert_eq!(kind(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"), "image/png");
        assert_eq!(kind(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(kind(b"GIF89a\x01\0\x01\0"), "image/gif");
    }

    #[test]
    fn sniffs_netpbm_and_mobi() {
        assert_eq!(kind(b"P6\n2 2\n255\n"), "image/x-portable-pixmap");
        assert_eq!(kind(b"P1 1 1 0"), "image/x-portable-bitmap");
        assert_eq!(kind(b"Pf\n1 1\n-1\n"), "image/x-portable-floatmap");

        let mut mobi = vec![0u8; 60];
        mobi.extend_from_slice(b"BOOKMOBI");
        assert_eq!(kind(&mobi), "application/x-mobipocket-ebook");
    }

    #[test]
    fn sniffs_text_forms() {
        assert_eq!(kind(b"# Title\n\nbody"), "text/plain");
        assert_eq!(kind(b""), "text/plain");
        assert_eq!(kind(b"{\\rtf1\\ansi hello}"), "text/rtf");
        assert_eq!(
            kind(b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
            "image/svg"
        );
        assert_eq!(kind(b"<svg viewBox=\"0 0 1 1\"></svg>"), "image/svg");
        assert_eq!(kind(b"<?xml version=\"1.0\"?><FictionBook/>"), "text/xml");
        assert_eq!(kind(b"\x00\x01\x02\x03garbage"), "application/octet-stream");
    }

    #[test]
    fn single_byte_encoded_text_is_plain_text() {
        assert_eq!(kind(b"name,city\nJos\xe9,M\xfcnchen\n"), "text/plain");
        assert_eq!(kind(b"# R\xe9sum\xe9\n\nCaf\xe9 cr\xe8me\n"), "text/plain");
        assert_eq!(kind(b"\x01\x02\x03\x04\xff\xfe\x05"), "application/octet-stream");
    }

    #[test]
    fn classify_reads_bounded_prefix() {
        let mut data = b"plain text ".repeat(1000);
        data.push(0);
        let mut r = std::io::Cursor::new(data);
        let c = classify(&mut r, "notes.MD").unwrap();
        assert_eq!(c.media_type, "text/plain");
        assert_eq!(c.extension, "md");
        assert_eq!(r.position(), SNIFF_LEN);
    }

    #[test]
    fn read_failure_is_classification_error() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("boom"))
            }
        }
        let err = classify(&mut Broken, "x").unwrap_err();
        assert!(matches!(err, IvError::Classification(_)));
        assert!(err.to_string().starts_with("mime detection failed:"));
    }

    #[test]
    fn synthetic_classifications() {
        assert_eq!(ClassifiedContent::pdf().media_type, "application/pdf");
        assert_eq!(ClassifiedContent::svg().media_type, "image/svg");
        assert_eq!(ClassifiedContent::svg().extension, "svg");
    }
}

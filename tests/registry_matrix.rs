use iv::registry::lookup;
use iv::{ClassifiedContent, IvError, Mode, Strategy};

fn pick(t: &str, ext: &str) -> Result<(Strategy, Mode), IvError> {
    lookup(&ClassifiedContent::new(t, ext)).map(|e| (e.strategy, e.mode))
}

#[test]
fn every_branch_in_order() {
    use Mode::*;
    use Strategy::*;

    let cases: &[(&str, &str, Strategy, Mode)] = &[
        ("image/svg+xml", "svg", Vector, Stream),
        ("image/svg+xml", "txt", Vector, Stream),
        ("image/png", "png", Builtin, Stream),
        ("image/jpeg", "jpg", Builtin, Stream),
        ("image/gif", "gif", Builtin, Stream),
        ("image/bmp", "bmp", Builtin, Stream),
        ("image/webp", "webp", Builtin, Stream),
        ("image/tiff", "tif", Builtin, Stream),
        ("image/x-icon", "ico", Builtin, Stream),
        ("image/x-portable-bitmap", "pbm", Builtin, Stream),
        (
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "docx",
            Office,
            Path,
        ),
        ("application/vnd.ms-excel", "xls", Office, Path),
        ("application/vnd.oasis.opendocument.text", "odt", Office, Path),
        ("text/rtf", "rtf", Office, Path),
        ("text/csv", "csv", Office, Path),
        ("text/tab-separated-values", "tsv", Office, Path),
        ("text/plain", "tsv", Office, Path),
        ("application/pdf", "pdf", Raster, Stream),
        ("image/heif", "heic", Raster, Stream),
        ("image/avif", "avif", Raster, Stream),
        ("image/jxl", "jxl", Raster, Stream),
        ("application/epub+zip", "epub", Document, Stream),
        ("application/x-mobipocket-ebook", "mobi", Document, Stream),
        ("text/fb2+xml", "fb2", Document, Stream),
        ("text/xml", "fb2", Document, Stream),
        ("image/vnd.adobe.photoshop", "psd", Document, Stream),
        ("application/zip", "xps", Document, Stream),
        ("text/plain", "mmd", Diagram, Path),
        ("text/plain; charset=utf-8", "md", Markdown, Stream),
        ("text/plain", "", Markdown, Stream),
        ("font/ttf", "ttf", Font, Stream),
        ("font/woff2", "woff2", Font, Stream),
        ("video/mp4", "mp4", Video, Path),
        ("video/x-matroska", "mkv", Video, Path),
        ("audio/mpeg", "mp3", CoverArt, Stream),
        ("audio/flac", "flac", CoverArt, Stream),
        ("application/x-7z-compressed", "cb7", ComicArchive, Stream),
        ("application/x-rar-compressed", "cbr", ComicArchive, Stream),
        ("application/x-tar", "cbt", ComicArchive, Stream),
        ("application/zip", "cbz", ComicArchive, Stream),
        (
            "application/vnd.microsoft.portable-executable",
            "exe",
            PeIcon,
            Stream,
        ),
    ];

    for (t, ext, strategy, mode) in cases {
        let got = pick(t, ext).unwrap_or_else(|e| panic!("{t} {ext}: {e}"));
        assert_eq!(got, (*strategy, *mode), "{t} + {ext}");
    }
}

#[test]
fn unmatched_types_are_unsupported() {
    for (t, ext) in [
        ("application/zip", "zip"),
        ("application/x-tar", "tar"),
        ("image/x-portable-floatmap", "pfm"),
        ("image/jxr", "jxr"),
        ("application/octet-stream", ""),
    ] {
        match pick(t, ext) {
            Err(IvError::Unsupported(m)) => assert_eq!(m, t),
            other => panic!("{t} + {ext}: {other:?}"),
        }
    }
}

#[test]
fn lookup_is_deterministic() {
    let class = ClassifiedContent::new("application/zip", "cbz");
    let first = lookup(&class).unwrap().strategy;
    for _ in 0..10 {
        assert_eq!(lookup(&class).unwrap().strategy, first);
    }
}

use crate::classify::ClassifiedContent;
use crate::foundation::error::{IvError, IvResult};

/// Rendering path selected for a classified target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// SVG through usvg/resvg.
    Vector,
    /// Formats the `image` crate decodes in process.
    Builtin,
    /// LibreOffice conversion to PDF.
    Office,
    /// libvips, including PDF.
    Raster,
    /// MuPDF for ebooks, XPS, PSD and Netpbm.
    Document,
    /// Mermaid source through `mmdc`.
    Diagram,
    /// Markdown laid out to PDF.
    Markdown,
    /// Font specimen sheet.
    Font,
    /// Single video frame through ffmpeg.
    Video,
    /// Embedded audio cover art.
    CoverArt,
    /// Page from a comic book archive.
    ComicArchive,
    /// Icon resource from a Windows executable.
    PeIcon,
}

/// How the pipeline hands content to a strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Open, rewound handle; the pipeline closes it after the call.
    Stream,
    /// Filesystem path; the pipeline closes its handle before the call.
    Path,
}

/// One record of the dispatch table.
#[derive(Clone, Copy)]
pub struct Entry {
    pub strategy: Strategy,
    pub mode: Mode,
    predicate: fn(&str, &str) -> bool,
}

impl Entry {
    pub fn matches(&self, media_type: &str, ext: &str) -> bool {
        (self.predicate)(media_type, ext)
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("strategy", &self.strategy)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Dispatch table; first match wins.
pub static REGISTRY: &[Entry] = &[
    Entry {
        strategy: Strategy::Vector,
        mode: Mode::Stream,
        predicate: |t, _| t == "image/svg",
    },
    Entry {
        strategy: Strategy::Builtin,
        mode: Mode::Stream,
        predicate: |t, _| is_builtin(t),
    },
    Entry {
        strategy: Strategy::Office,
        mode: Mode::Path,
        predicate: is_office,
    },
    Entry {
        strategy: Strategy::Raster,
        mode: Mode::Stream,
        predicate: |t, _| is_raster(t),
    },
    Entry {
        strategy: Strategy::Document,
        mode: Mode::Stream,
        predicate: is_document,
    },
    Entry {
        strategy: Strategy::Diagram,
        mode: Mode::Path,
        predicate: |t, ext| t == "text/plain" && ext == "mmd",
    },
    Entry {
        strategy: Strategy::Markdown,
        mode: Mode::Stream,
        predicate: |t, _| t == "text/plain",
    },
    Entry {
        strategy: Strategy::Font,
        mode: Mode::Stream,
        predicate: |t, _| t.starts_with("font/"),
    },
    Entry {
        strategy: Strategy::Video,
        mode: Mode::Path,
        predicate: |t, _| t.starts_with("video/"),
    },
    Entry {
        strategy: Strategy::CoverArt,
        mode: Mode::Stream,
        predicate: |t, _| t.starts_with("audio/"),
    },
    Entry {
        strategy: Strategy::ComicArchive,
        mode: Mode::Stream,
        predicate: is_comic_archive,
    },
    Entry {
        strategy: Strategy::PeIcon,
        mode: Mode::Stream,
        predicate: |t, _| t == "application/vnd.microsoft.portable-executable",
    },
];

/// First entry claiming `content`, or [`IvError::Unsupported`].
pub fn lookup(content: &ClassifiedContent) -> IvResult<&'static Entry> {
    REGISTRY
        .iter()
        .find(|e| e.matches(&content.media_type, &content.extension))
        .ok_or_else(|| IvError::unsupported(content.media_type.as_str()))
}

fn is_netpbm(t: &str) -> bool {
    t.starts_with("image/x-portable-") && t != "image/x-portable-floatmap"
}

fn is_builtin(t: &str) -> bool {
    matches!(
        t,
        "image/bmp"
            | "image/jpeg"
            | "image/png"
            | "image/gif"
            | "image/webp"
            | "image/tiff"
            | "image/x-icon"
    ) || is_netpbm(t)
}

fn is_office(t: &str, ext: &str) -> bool {
    t.starts_with("application/vnd.openxmlformats-officedocument.")
        || t.starts_with("application/vnd.ms-")
        || t.starts_with("application/vnd.oasis.opendocument.")
        || matches!(t, "text/rtf" | "text/csv" | "text/tab-separated-values")
        || (t == "text/plain" && matches!(ext, "csv" | "tsv"))
}

fn is_raster(t: &str) -> bool {
    match t {
        "application/pdf" => true,
        "image/vnd.adobe.photoshop" => false,
        _ => {
            t.starts_with("image/")
                && !t.starts_with("image/x-portable-")
                && !t.contains("jxr")
        }
    }
}

fn is_document(t: &str, ext: &str) -> bool {
    matches!(
        t,
        "application/epub+zip"
            | "application/x-mobipocket-ebook"
            | "text/fb2+xml"
            | "text/fb2"
            | "image/vnd.adobe.photoshop"
    ) || (t == "text/xml" && ext == "fb2")
        || (t == "application/zip" && ext == "xps")
        || is_netpbm(t)
}

fn is_comic_archive(t: &str, ext: &str) -> bool {
    matches!(
        (t, ext),
        ("application/x-7z-compressed", "cb7")
            | ("application/x-rar-compressed", "cbr")
            | ("application/x-tar", "cbt")
            | ("application/zip", "cbz")
    )
}

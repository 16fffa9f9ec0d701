//! Command-line arguments to an ordered render queue.

use std::path::{Path, PathBuf};

use crate::classify::file_ext;
use crate::foundation::error::{IvError, IvResult};

/// Extensions picked up when expanding a directory.
pub const EXTENSIONS: &[&str] = &[
    "3g2", "3gp", "aac", "asf", "avif", "avi", "bmp", "bpg", "csv", "doc", "docx", "dvb", "dwg",
    "eot", "flac", "flv", "gif", "heic", "heif", "ico", "jp2", "jpeg", "jpf", "jpg", "jxl", "jxs",
    "m4a", "m4v", "markdown", "md", "mj2", "mkv", "mov", "mp3", "mp4", "mpeg3", "mpeg", "mpg",
    "odc", "odf", "odg", "odp", "ods", "odt", "oga", "ogg", "ogv", "otf", "otg", "otp", "ots",
    "ott", "pdf", "png", "ppt", "pptx", "pub", "rtf", "svg", "tiff", "tsv", "ttc", "ttf", "txt",
    "webm", "webp", "woff2", "woff", "xls", "xlsx", "xpm", "cb7", "cba", "cbr", "cbt", "cbz",
    "xps", "epub", "mobi", "fb2", "mmd", "exe",
];

/// One unit of work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    File(PathBuf),
    /// Text rendered as a matrix code.
    Url(String),
}

impl Target {
    /// The argument as shown in output and error lines.
    pub fn display_name(&self) -> String {
        match self {
            Target::File(p) => p.display().to_string(),
            Target::Url(u) => u.clone(),
        }
    }
}

/// `true` when a directory entry with this name is renderable.
pub fn is_allowed(path: &Path) -> bool {
    EXTENSIONS.contains(&file_ext(&path.to_string_lossy()).as_str())
}

fn is_url(arg: &str) -> bool {
    arg.starts_with("WIFI:") || (arg.contains("://") && url::Url::parse(arg).is_ok())
}

/// Expand one argument.
///
/// A directory yields its immediate allow-listed files sorted by path; an existing file
/// yields itself; a URL or `WIFI:` string yields a matrix-code target.
pub fn resolve(arg: &str) -> IvResult<Vec<Target>> {
    let path = Path::new(arg);
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => expand_dir(path),
        Ok(_) => Ok(vec![Target::File(path.to_path_buf())]),
        Err(_) if is_url(arg) => Ok(vec![Target::Url(arg.to_owned())]),
        Err(e) => Err(IvError::open(e.to_string())),
    }
}

fn expand_dir(dir: &Path) -> IvResult<Vec<Target>> {
    let entries = std::fs::read_dir(dir).map_err(|e| IvError::open(e.to_string()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IvError::open(e.to_string()))?;
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir && is_allowed(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    tracing::debug!("{}: {} targets", dir.display(), paths.len());
    Ok(paths.into_iter().map(Target::File).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_and_wifi_strings() {
        assert_eq!(
            resolve("https://example.com/a?b=c").unwrap(),
            vec![Target::Url("https://example.com/a?b=c".to_owned())]
        );
        assert_eq!(
            resolve("WIFI:S:net;T:WPA;P:pw;;").unwrap(),
            vec![Target::Url("WIFI:S:net;T:WPA;P:pw;;".to_owned())]
        );
    }

    #[test]
    fn missing_path_is_an_open_error() {
        let err = resolve("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, IvError::Open(_)));
        assert!(matches!(resolve("not a url").unwrap_err(), IvError::Open(_)));
    }

    #[test]
    fn existing_file_is_kept_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("notes.weird");
        std::fs::write(&p, b"x").unwrap();
        assert_eq!(resolve(p.to_str().unwrap()).unwrap(), vec![Target::File(p)]);
    }

    #[test]
    fn allow_list_is_case_insensitive() {
        assert!(is_allowed(Path::new("/a/B.PNG")));
        assert!(is_allowed(Path::new("book.cbz")));
        assert!(!is_allowed(Path::new("archive.zip")));
        assert!(!is_allowed(Path::new("Makefile")));
    }
}

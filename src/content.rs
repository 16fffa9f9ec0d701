use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{IvError, IvResult};

/// Seekable byte source handed to stream-mode decoders.
pub trait Content: Read + Seek {
    /// Human-readable name, used in logs and errors.
    fn identifier(&self) -> &str;

    /// The backing file when the content is a named file on disk.
    ///
    /// Strategies that need random access through a real file descriptor use this and fail
    /// with [`IvError::Capability`] when it returns `None`.
    fn as_named(&mut self) -> Option<NamedHandle<'_>>;

    /// Seek back to the first byte.
    fn rewind_start(&mut self) -> IvResult<()> {
        self.seek(SeekFrom::Start(0))
            .map(|_| ())
            .with_context(|| format!("could not seek start of {}", self.identifier()))
            .map_err(IvError::from)
    }

    /// Read everything from the current position.
    fn read_all(&mut self) -> IvResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)
            .with_context(|| format!("read {}", self.identifier()))?;
        Ok(buf)
    }
}

/// Borrowed view of a content's backing file.
pub struct NamedHandle<'a> {
    pub file: &'a mut File,
    pub path: &'a Path,
}

/// `Err(IvError::Capability)` unless `content` is backed by a named file.
pub fn require_named(content: &mut dyn Content) -> IvResult<NamedHandle<'_>> {
    let id = content.identifier().to_owned();
    content
        .as_named()
        .ok_or_else(|| IvError::capability(format!("{id} is not a named file")))
}

/// Content backed by an open file; closed when dropped.
#[derive(Debug)]
pub struct FileContent {
    file: File,
    path: PathBuf,
    id: String,
}

impl FileContent {
    pub fn open(path: impl Into<PathBuf>) -> IvResult<Self> {
        let path = path.into();
        let file = File::open(&path)
            .with_context(|| format!("open {}", path.display()))
            .map_err(IvError::from)?;
        let id = path.display().to_string();
        Ok(Self { file, path, id })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for FileContent {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for FileContent {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Content for FileContent {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn as_named(&mut self) -> Option<NamedHandle<'_>> {
        Some(NamedHandle {
            file: &mut self.file,
            path: &self.path,
        })
    }
}

/// In-memory content, used for intermediate PDF/SVG output and fetched bytes.
#[derive(Debug)]
pub struct MemoryContent {
    cursor: Cursor<Vec<u8>>,
    id: String,
}

impl MemoryContent {
    pub fn new(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            id: id.into(),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}

impl Read for MemoryContent {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemoryContent {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl Content for MemoryContent {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn as_named(&mut self) -> Option<NamedHandle<'_>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_content_is_not_named() {
        let mut c = MemoryContent::new("mem", b"abc".to_vec());
        let err = require_named(&mut c).err().unwrap();
        assert!(matches!(err, IvError::Capability(_)));
    }

    #[test]
    fn file_content_is_named_and_rewinds() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("x.bin");
        std::fs::write(&p, b"hello").unwrap();

        let mut c = FileContent::open(&p).unwrap();
        assert_eq!(c.read_all().unwrap(), b"hello");
        c.rewind_start().unwrap();
        assert_eq!(c.read_all().unwrap(), b"hello");

        let named = require_named(&mut c).unwrap();
        assert_eq!(named.path, p.as_path());
    }

    #[test]
    fn missing_file_fails_to_open() {
        assert!(FileContent::open("/definitely/not/here.png").is_err());
    }
}

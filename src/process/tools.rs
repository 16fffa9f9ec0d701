use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::foundation::error::{IvError, IvResult};

/// External engines iv knows how to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tool {
    Vips,
    VipsHeader,
    Mutool,
    Soffice,
    Mmdc,
    Ffprobe,
    Ffmpeg,
    SevenZip,
}

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::Vips,
        Tool::VipsHeader,
        Tool::Mutool,
        Tool::Soffice,
        Tool::Mmdc,
        Tool::Ffprobe,
        Tool::Ffmpeg,
        Tool::SevenZip,
    ];

    /// Executable name searched for on `PATH`.
    pub fn name(self) -> &'static str {
        match self {
            Tool::Vips => "vips",
            Tool::VipsHeader => "vipsheader",
            Tool::Mutool => "mutool",
            Tool::Soffice => "soffice",
            Tool::Mmdc => "mmdc",
            Tool::Ffprobe => "ffprobe",
            Tool::Ffmpeg => "ffmpeg",
            Tool::SevenZip => "7z",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Lazily resolved tool locations.
///
/// Each tool is searched for at most once; a miss is cached too and reported as
/// [`IvError::ToolUnavailable`] to every target that needs it.
#[derive(Debug)]
pub struct Tools {
    search: Vec<PathBuf>,
    found: [OnceLock<Option<PathBuf>>; Tool::ALL.len()],
}

impl Tools {
    /// Search the directories listed in `PATH`.
    pub fn from_env() -> Self {
        let search = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();
        Self::with_search_path(search)
    }

    /// Search an explicit list of directories.
    pub fn with_search_path(search: Vec<PathBuf>) -> Self {
        Self {
            search,
            found: Default::default(),
        }
    }

    /// Absolute path of `tool`.
    pub fn locate(&self, tool: Tool) -> IvResult<&Path> {
        self.found[tool.index()]
            .get_or_init(|| {
                let hit = find_executable(&self.search, tool.name());
                match &hit {
                    Some(p) => tracing::debug!(tool = tool.name(), path = %p.display(), "tool found"),
                    None => tracing::debug!(tool = tool.name(), "tool not found"),
                }
                hit
            })
            .as_deref()
            .ok_or_else(|| IvError::tool_unavailable(tool.name()))
    }

    pub fn is_available(&self, tool: Tool) -> bool {
        self.locate(tool).is_ok()
    }
}

impl Default for Tools {
    fn default() -> Self {
        Self::from_env()
    }
}

fn find_executable(search: &[PathBuf], name: &str) -> Option<PathBuf> {
    search
        .iter()
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(p: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt as _;
    std::fs::metadata(p)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(p: &Path) -> bool {
    p.is_file() || p.with_extension("exe").is_file()
}

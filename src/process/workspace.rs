use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{IvError, IvResult};

/// Scratch directory owned by a single strategy call.
///
/// Removed on drop; [`TempWorkspace::close`] removes it eagerly and reports failures as
/// [`IvError::Cleanup`].
#[derive(Debug)]
pub struct TempWorkspace {
    dir: Option<tempfile::TempDir>,
    path: PathBuf,
}

impl TempWorkspace {
    /// Create `iv.XXXXXX` under `root`.
    pub fn create(root: &Path) -> IvResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("iv.")
            .tempdir_in(root)
            .with_context(|| format!("create temp dir in {}", root.display()))?;
        let path = dir.path().to_path_buf();
        tracing::debug!(path = %path.display(), "temp dir");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Copy `reader` into `name` inside the workspace.
    pub fn spool<R: Read + ?Sized>(&self, reader: &mut R, name: &str) -> IvResult<PathBuf> {
        let dest = self.join(name);
        let mut out = std::fs::File::create(&dest)
            .with_context(|| format!("create {}", dest.display()))?;
        let n = std::io::copy(reader, &mut out)
            .with_context(|| format!("spool into {}", dest.display()))?;
        tracing::debug!(bytes = n, path = %dest.display(), "spooled");
        Ok(dest)
    }

    /// Remove the workspace after a strategy call.
    ///
    /// A failed call keeps its own error and the directory is removed best-effort; a
    /// successful call turns a removal failure into [`IvError::Cleanup`].
    pub fn finish<T>(self, res: IvResult<T>) -> IvResult<T> {
        match res {
            Ok(v) => {
                self.close()?;
                Ok(v)
            }
            Err(e) => {
                if let Err(cleanup) = self.close() {
                    tracing::warn!("{cleanup}");
                }
                Err(e)
            }
        }
    }

    /// Remove the workspace now.
    pub fn close(mut self) -> IvResult<()> {
        match self.dir.take() {
            Some(dir) => {
                tracing::debug!(path = %self.path.display(), "removing");
                dir.close()
                    .map_err(|e| IvError::cleanup(format!("{}: {e}", self.path.display())))
            }
            None => Ok(()),
        }
    }
}

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{IvError, IvResult};
use crate::process::tools::{Tool, Tools};

/// Longest stderr prefix carried in a [`IvError::Subprocess`].
pub const STDERR_PREFIX_LEN: usize = 100;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A single external engine run.
#[derive(Clone, Debug)]
pub struct Invocation {
    tool: Tool,
    program: OsString,
    args: Vec<OsString>,
    env: Vec<(OsString, OsString)>,
}

/// Captured output of a successful run.
#[derive(Clone, Debug, Default)]
pub struct Output {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Invocation {
    /// Resolve `tool` through `tools`; fails with [`IvError::ToolUnavailable`] when missing.
    pub fn new(tools: &Tools, tool: Tool) -> IvResult<Self> {
        let program = tools.locate(tool)?.as_os_str().to_owned();
        Ok(Self {
            tool,
            program,
            args: Vec::new(),
            env: Vec::new(),
        })
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_owned(), value.as_ref().to_owned()));
        self
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Run to completion, polling `cancel`.
    ///
    /// On cancellation the child is killed and reaped before [`IvError::Cancelled`] is
    /// returned. A non-zero exit becomes [`IvError::Subprocess`] with a bounded stderr
    /// prefix.
    #[tracing::instrument(skip(self, cancel), fields(tool = self.tool.name()))]
    pub fn run(&self, cancel: &CancelToken) -> IvResult<Output> {
        cancel.check()?;
        tracing::debug!(
            "executing: {} {}",
            Path::new(&self.program).display(),
            self.args
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        let start = Instant::now();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        let child = cmd.spawn().map_err(|e| {
            IvError::Other(anyhow::anyhow!("failed to spawn {}: {e}", self.tool.name()))
        })?;
        let mut guard = ChildGuard::new(child);
        let stdout = guard.drain_stdout();
        let stderr = guard.drain_stderr();

        let status = guard.wait(cancel)?;
        let stdout = join_drain(stdout, self.tool, "stdout")?;
        let stderr = join_drain(stderr, self.tool, "stderr")?;
        tracing::debug!(elapsed = ?start.elapsed(), %status, "{} finished", self.tool.name());

        if !status.success() {
            return Err(IvError::Subprocess {
                tool: self.tool.name().to_owned(),
                status: status.to_string(),
                stderr: bounded_stderr(&stderr),
            });
        }
        Ok(Output { stdout, stderr })
    }
}

/// Lossy, trimmed stderr cut to [`STDERR_PREFIX_LEN`] bytes on a char boundary.
pub fn bounded_stderr(bytes: &[u8]) -> String {
    let s = String::from_utf8_lossy(bytes);
    let s = s.trim();
    if s.len() <= STDERR_PREFIX_LEN {
        return s.to_owned();
    }
    let mut end = STDERR_PREFIX_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_owned()
}

type Drain = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

/// Kills and reaps the child on drop unless it already exited.
struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    fn drain_stdout(&mut self) -> Drain {
        let mut out = self.child.as_mut()?.stdout.take()?;
        Some(std::thread::spawn(move || {
            let mut buf = Vec::new();
            out.read_to_end(&mut buf)?;
            Ok(buf)
        }))
    }

    fn drain_stderr(&mut self) -> Drain {
        let mut err = self.child.as_mut()?.stderr.take()?;
        Some(std::thread::spawn(move || {
            let mut buf = Vec::new();
            err.read_to_end(&mut buf)?;
            Ok(buf)
        }))
    }

    fn wait(&mut self, cancel: &CancelToken) -> IvResult<ExitStatus> {
        loop {
            let Some(child) = self.child.as_mut() else {
                return Err(IvError::Other(anyhow::anyhow!("child already reaped")));
            };
            let polled = child
                .try_wait()
                .map_err(|e| IvError::Other(anyhow::anyhow!("wait failed: {e}")))?;
            if let Some(status) = polled {
                self.child = None;
                return Ok(status);
            }
            if cancel.is_cancelled() {
                self.kill();
                return Err(IvError::Cancelled);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::debug!("kill failed: {e}");
            }
            if let Err(e) = child.wait() {
                tracing::debug!("reap failed: {e}");
            }
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

fn join_drain(drain: Drain, tool: Tool, stream: &str) -> IvResult<Vec<u8>> {
    match drain {
        Some(handle) => handle
            .join()
            .map_err(|_| {
                IvError::Other(anyhow::anyhow!(
                    "{} {stream} drain thread panicked",
                    tool.name()
                ))
            })?
            .map_err(|e| {
                IvError::Other(anyhow::anyhow!("{} {stream} read failed: {e}", tool.name()))
            }),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_is_trimmed_and_bounded() {
        assert_eq!(bounded_stderr(b"  oops \n"), "oops");
        let long = "x".repeat(250);
        assert_eq!(bounded_stderr(long.as_bytes()).len(), STDERR_PREFIX_LEN);
    }

    #[test]
    fn stderr_bound_respects_char_boundaries() {
        let mut s = "a".repeat(99);
        s.push('é');
        s.push_str("tail");
        let out = bounded_stderr(s.as_bytes());
        assert_eq!(out, "a".repeat(99));
    }

    #[test]
    fn missing_tool_fails_before_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let tools = Tools::with_search_path(vec![dir.path().to_path_buf()]);
        let err = Invocation::new(&tools, Tool::Ffmpeg).unwrap_err();
        assert!(matches!(err, IvError::ToolUnavailable(_)));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt as _;

        fn fake_tool(dir: &Path, name: &str, body: &str) {
            let p = dir.join(name);
            std::fs::write(&p, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&p, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        #[test]
        fn captures_stdout_and_env() {
            let dir = tempfile::tempdir().unwrap();
            fake_tool(dir.path(), "vips", r#"printf '%s|%s' "$1" "$VIPS_CONCURRENCY""#);
            let tools = Tools::with_search_path(vec![dir.path().to_path_buf()]);
            let out = Invocation::new(&tools, Tool::Vips)
                .unwrap()
                .arg("copy")
                .env("VIPS_CONCURRENCY", "3")
                .run(&CancelToken::new())
                .unwrap();
            assert_eq!(out.stdout, b"copy|3");
        }

        #[test]
        fn failure_carries_bounded_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let noise = "e".repeat(300);
            fake_tool(dir.path(), "mutool", &format!("echo {noise} >&2; exit 3"));
            let tools = Tools::with_search_path(vec![dir.path().to_path_buf()]);
            let err = Invocation::new(&tools, Tool::Mutool)
                .unwrap()
                .run(&CancelToken::new())
                .unwrap_err();
            match err {
                IvError::Subprocess { tool, stderr, .. } => {
                    assert_eq!(tool, "mutool");
                    assert_eq!(stderr.len(), STDERR_PREFIX_LEN);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn cancellation_kills_child() {
            let dir = tempfile::tempdir().unwrap();
            fake_tool(dir.path(), "ffmpeg", "exec sleep 30");
            let tools = Tools::with_search_path(vec![dir.path().to_path_buf()]);
            let cancel = CancelToken::new();
            let trip = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(100));
                trip.cancel();
            });
            let start = Instant::now();
            let err = Invocation::new(&tools, Tool::Ffmpeg)
                .unwrap()
                .run(&cancel)
                .unwrap_err();
            assert!(matches!(err, IvError::Cancelled));
            assert!(start.elapsed() < Duration::from_secs(10));
        }
    }
}

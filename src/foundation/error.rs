/// Convenience result type used across iv.
pub type IvResult<T> = Result<T, IvError>;

/// Per-target error taxonomy.
///
/// Every variant is recoverable at the batch boundary: the renderer prints it against the
/// failing target and moves on to the next one.
#[derive(thiserror::Error, Debug)]
pub enum IvError {
    /// The target could not be opened or expanded.
    #[error("{0}")]
    Open(String),

    /// The content could not be sniffed.
    #[error("mime detection failed: {0}")]
    Classification(String),

    /// No registry entry claims the media type.
    #[error("mime type {0:?} not supported")]
    Unsupported(String),

    /// A decoder adapter rejected the content or its engine reported a failure.
    #[error("{0}")]
    Decode(String),

    /// A required external binary is not on `PATH`.
    #[error("{0} not in path")]
    ToolUnavailable(String),

    /// An external engine exited unsuccessfully.
    #[error("{tool}: {status}: {stderr}")]
    Subprocess {
        /// Tool name.
        tool: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Bounded stderr prefix.
        stderr: String,
    },

    /// A temp workspace could not be removed.
    #[error("cleanup failed: {0}")]
    Cleanup(String),

    /// The strategy needs a seekable named file and the source is not one.
    #[error("capability not supported for this source: {0}")]
    Capability(String),

    /// The run was cancelled while this target was in flight.
    #[error("cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IvError {
    /// Build an [`IvError::Open`] value.
    pub fn open(msg: impl Into<String>) -> Self {
        Self::Open(msg.into())
    }

    /// Build an [`IvError::Classification`] value.
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Build an [`IvError::Unsupported`] value.
    pub fn unsupported(media_type: impl Into<String>) -> Self {
        Self::Unsupported(media_type.into())
    }

    /// Build an [`IvError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build an [`IvError::ToolUnavailable`] value.
    pub fn tool_unavailable(tool: impl Into<String>) -> Self {
        Self::ToolUnavailable(tool.into())
    }

    /// Build an [`IvError::Cleanup`] value.
    pub fn cleanup(msg: impl Into<String>) -> Self {
        Self::Cleanup(msg.into())
    }

    /// Build an [`IvError::Capability`] value.
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            IvError::classification("x")
                .to_string()
                .contains("mime detection failed:")
        );
        assert_eq!(
            IvError::unsupported("application/x-thing").to_string(),
            r#"mime type "application/x-thing" not supported"#
        );
        assert_eq!(
            IvError::tool_unavailable("ffmpeg").to_string(),
            "ffmpeg not in path"
        );
        assert!(
            IvError::capability("memory stream")
                .to_string()
                .starts_with("capability not supported for this source")
        );
    }

    #[test]
    fn subprocess_carries_status_and_stderr() {
        let err = IvError::Subprocess {
            tool: "soffice".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "soffice: exit status: 1: boom");
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = IvError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Unsupported script type: {}", path.display())]
    UnsupportedScriptKind { path: PathBuf },

    #[error("Exec channel error: {0}")]
    Channel(String),

    #[error("Deadline exceeded after {timeout:?} while {operation}")]
    DeadlineExceeded { operation: String, timeout: Duration },

    #[error("Upload to {path} failed: {reason}")]
    UplinkFailure { path: String, reason: String },

    #[error("Download of {path} failed: {reason}")]
    DownlinkFailure { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    /// Returns true for the structural timeout variant.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunnerError::DeadlineExceeded { .. })
    }
}

pub type Error = RunnerError;
pub type Result<T> = std::result::Result<T, Error>;

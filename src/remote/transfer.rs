//! File transfer layered over an exec channel.
//!
//! The channel has no copy primitive, so [`ShellTransfer`] moves bytes as
//! base64 text: uploads pipe the payload into `base64 -d` on the remote side,
//! downloads read `base64 <file>` back from stdout. Orchestration only sees
//! the [`FileTransfer`] trait, so a channel with native copy support can plug
//! in its own implementation.

use std::time::Duration;

use log::debug;

use crate::error::{Error, Result};
use crate::interpreter::shell_escape;
use crate::remote::channel::ExecChannel;
use crate::remote::codec;
use crate::remote::diagnostics::diagnose_transfer_failure;

/// Uplink/downlink of whole files through an exec channel.
pub trait FileTransfer {
    /// Writes `data` to `remote_path`, replacing any existing file.
    fn push(
        &self,
        channel: &mut dyn ExecChannel,
        data: &[u8],
        remote_path: &str,
        timeout: Option<Duration>,
    ) -> Result<()>;

    /// Reads the full content of `remote_path`.
    fn pull(
        &self,
        channel: &mut dyn ExecChannel,
        remote_path: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>>;
}

/// Base64-over-shell transfer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellTransfer;

impl ShellTransfer {
    pub fn new() -> Self {
        Self
    }

    pub fn push_command(remote_path: &str) -> String {
        format!("base64 -d > {}", shell_escape(remote_path))
    }

    pub fn pull_command(remote_path: &str) -> String {
        format!("base64 < {}", shell_escape(remote_path))
    }
}

impl FileTransfer for ShellTransfer {
    fn push(
        &self,
        channel: &mut dyn ExecChannel,
        data: &[u8],
        remote_path: &str,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let encoded = codec::encode(data);
        debug!(
            "Uploading {} bytes ({} encoded) to {}",
            data.len(),
            encoded.len(),
            remote_path
        );

        let output = channel
            .run_with_input(&Self::push_command(remote_path), encoded.as_bytes(), timeout)
            .map_err(|e| uplink_error(e, remote_path))?;

        if !output.is_success() {
            return Err(Error::UplinkFailure {
                path: remote_path.to_string(),
                reason: diagnose_transfer_failure(output.exit_code, &output.stderr),
            });
        }

        Ok(())
    }

    fn pull(
        &self,
        channel: &mut dyn ExecChannel,
        remote_path: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        debug!("Downloading {}", remote_path);

        let output = channel
            .run(&Self::pull_command(remote_path), timeout)
            .map_err(|e| downlink_error(e, remote_path))?;

        if !output.is_success() {
            return Err(Error::DownlinkFailure {
                path: remote_path.to_string(),
                reason: diagnose_transfer_failure(output.exit_code, &output.stderr),
            });
        }

        let data = codec::decode(&output.stdout_text()).map_err(|e| Error::DownlinkFailure {
            path: remote_path.to_string(),
            reason: e.to_string(),
        })?;

        debug!("Downloaded {} bytes from {}", data.len(), remote_path);
        Ok(data)
    }
}

// Timeouts keep their own kind; every other channel error becomes a transfer failure.
fn uplink_error(err: Error, remote_path: &str) -> Error {
    match err {
        Error::DeadlineExceeded { .. } => err,
        other => Error::UplinkFailure {
            path: remote_path.to_string(),
            reason: other.to_string(),
        },
    }
}

fn downlink_error(err: Error, remote_path: &str) -> Error {
    match err {
        Error::DeadlineExceeded { .. } => err,
        other => Error::DownlinkFailure {
            path: remote_path.to_string(),
            reason: other.to_string(),
        },
    }
}

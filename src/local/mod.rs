//! Host-only execution path used when no remote target is given.

use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};
use crate::interpreter;

/// Runs `script` with its interpreter on this host, inheriting stdio.
///
/// Returns the child's exit code; a child killed by a signal reports 1.
pub fn run_local(script: &Path) -> Result<i32> {
    let cmd = interpreter::resolve(script)?;
    debug!("Executing {}", cmd);

    let status = Command::new(cmd.program())
        .args(cmd.args())
        .status()
        .map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to start {}: {}", cmd.program(), e),
            ))
        })?;

    Ok(status.code().unwrap_or(1))
}

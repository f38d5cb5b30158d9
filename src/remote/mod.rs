//! Remote execution over exec-only channels.
//!
//! The remote environment is reachable only by running commands, so file
//! transfer, status capture and artifact collection are all built from
//! "run a command, read its output, optionally feed it input".

pub mod channel;
pub mod codec;
pub mod diagnostics;
pub mod layout;
pub mod orchestrator;
pub mod process;
pub mod ssh;
pub mod transfer;

pub use channel::{Deadline, ExecChannel, ExecOutput};
pub use layout::RemoteLayout;
pub use orchestrator::{OrchestratorSettings, Phase, RemoteExecutionResult, RemoteOrchestrator};
pub use process::ProcessChannel;
pub use ssh::SshChannel;
pub use transfer::{FileTransfer, ShellTransfer};

use crate::config::TargetConfig;
use crate::error::Result;

/// Opens the exec channel for a configured target.
pub fn open_channel(target: &TargetConfig) -> Result<Box<dyn ExecChannel>> {
    match target {
        TargetConfig::Kubernetes(k8s) => Ok(Box::new(ProcessChannel::kubectl(k8s.clone()))),
        TargetConfig::Ssh(ssh) => Ok(Box::new(SshChannel::connect(ssh.clone())?)),
    }
}

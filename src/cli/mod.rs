pub mod config;
pub mod run;

use crate::error::RunnerError;

/// Exit code for a failed invocation.
///
/// Usage errors report 2, unsupported script kinds report 3, anything else 1.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<RunnerError>() {
        Some(RunnerError::Usage(_)) => 2,
        Some(RunnerError::UnsupportedScriptKind { .. }) => 3,
        _ => 1,
    }
}

//! The exec channel abstraction.
//!
//! An exec channel runs exactly one remote command at a time and hands back
//! its captured streams. It is the only way the runner can reach the remote
//! environment; file transfer is layered on top of it.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Captured outcome of one remote command.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    /// Raw standard output
    pub stdout: Vec<u8>,
    /// Standard error, lossily decoded
    pub stderr: String,
    /// Exit code (0 for success)
    pub exit_code: i32,
}

impl ExecOutput {
    /// Returns true if the command succeeded (exit code 0).
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }
}

/// A command-exec capability owned by a single run.
///
/// Implementations report an elapsed `timeout` as
/// [`Error::DeadlineExceeded`] and connectivity problems as
/// [`Error::Channel`]. A remote command exiting non-zero is not an error at
/// this level; it is reported through [`ExecOutput::exit_code`]. Resources are
/// released when the channel is dropped.
pub trait ExecChannel {
    /// Runs `command` through `/bin/sh -c` on the remote side.
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> Result<ExecOutput>;

    /// Runs `command` with `input` written to its standard input.
    fn run_with_input(
        &mut self,
        command: &str,
        input: &[u8],
        timeout: Option<Duration>,
    ) -> Result<ExecOutput>;

    /// Human-readable description of the remote end, for logs.
    fn describe(&self) -> String;
}

impl<C: ExecChannel + ?Sized> ExecChannel for Box<C> {
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> Result<ExecOutput> {
        (**self).run(command, timeout)
    }

    fn run_with_input(
        &mut self,
        command: &str,
        input: &[u8],
        timeout: Option<Duration>,
    ) -> Result<ExecOutput> {
        (**self).run_with_input(command, input, timeout)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Run-level time budget shared by every channel command of one run.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn new(budget: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Time left, or `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .map(|budget| budget.saturating_sub(self.started.elapsed()))
    }

    /// Fails with [`Error::DeadlineExceeded`] once the budget is spent.
    pub fn check(&self, operation: &str) -> Result<()> {
        match (self.budget, self.remaining()) {
            (Some(budget), Some(left)) if left.is_zero() => Err(Error::DeadlineExceeded {
                operation: operation.to_string(),
                timeout: budget,
            }),
            _ => Ok(()),
        }
    }
}

//! Run a local script inside a remote environment reachable only through an
//! exec channel, then bring back its log, exit status and artifacts.

pub mod cli;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod local;
pub mod remote;

pub use error::{Error, Result, RunnerError};

//! Interpreter selection by file extension.
//!
//! The table is fixed and matched exactly (case-insensitively) against the
//! final extension of the script path. No globbing and no content sniffing.

use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Interpreters known to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpreter {
    Python,
    Shell,
    Go,
    Mongo,
}

/// Tool family an interpreter belongs to; each family logs to its own file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFamily {
    Script,
    Query,
}

const EXTENSION_TABLE: &[(&str, Interpreter)] = &[
    ("py", Interpreter::Python),
    ("sh", Interpreter::Shell),
    ("go", Interpreter::Go),
    ("mongo", Interpreter::Mongo),
    ("js", Interpreter::Mongo),
];

impl Interpreter {
    /// Looks up the interpreter for `path` by its lowercased extension.
    pub fn for_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .ok_or_else(|| Error::UnsupportedScriptKind {
                path: path.to_path_buf(),
            })?;

        EXTENSION_TABLE
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, interpreter)| *interpreter)
            .ok_or_else(|| Error::UnsupportedScriptKind {
                path: path.to_path_buf(),
            })
    }

    /// Command prefix placed before the script path.
    pub fn prefix(&self) -> &'static [&'static str] {
        match self {
            Interpreter::Python => &["python3"],
            Interpreter::Shell => &["/bin/sh"],
            Interpreter::Go => &["go", "run"],
            Interpreter::Mongo => &["mongosh"],
        }
    }

    pub fn log_family(&self) -> LogFamily {
        match self {
            Interpreter::Mongo => LogFamily::Query,
            _ => LogFamily::Script,
        }
    }

    /// Builds the full invocation for `target`.
    pub fn command(&self, target: &str) -> InterpreterCommand {
        let mut tokens: Vec<String> = self.prefix().iter().map(|s| s.to_string()).collect();
        tokens.push(target.to_string());
        InterpreterCommand { tokens }
    }
}

/// Interpreter invocation: executable first, script path last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterCommand {
    tokens: Vec<String>,
}

impl InterpreterCommand {
    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Renders the command as a single-quoted shell line.
    pub fn to_shell_line(&self) -> String {
        shell_join(&self.tokens)
    }
}

impl fmt::Display for InterpreterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

/// Resolves the interpreter command for a local script path.
pub fn resolve(path: &Path) -> Result<InterpreterCommand> {
    let interpreter = Interpreter::for_path(path)?;
    Ok(interpreter.command(&path.to_string_lossy()))
}

/// Quotes `arg` for a POSIX shell.
pub fn shell_escape(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let escaped = arg.replace('\'', "'\\''");
    format!("'{}'", escaped)
}

pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|a| shell_escape(a))
        .collect::<Vec<_>>()
        .join(" ")
}

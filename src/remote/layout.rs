//! Fixed remote file layout and artifact-name handling.
//!
//! ```text
//! /tmp/<script basename>   staged script (overwritten every run)
//! /tmp/out_script.log      combined output of script-family interpreters
//! /tmp/out_mongo.log       combined output of query-family interpreters
//! /tmp/status              exit status of the interpreter
//! /tmp/artifacts/          files the script wants collected
//! ```
//!
//! Paths are not namespaced per run, so two runs against the same
//! environment at once will trample each other.

use std::path::{Component, Path, PathBuf};

use crate::interpreter::LogFamily;

pub const REMOTE_ROOT: &str = "/tmp";
pub const SCRIPT_LOG_NAME: &str = "out_script.log";
pub const QUERY_LOG_NAME: &str = "out_mongo.log";
pub const STATUS_NAME: &str = "status";
pub const ARTIFACTS_DIR_NAME: &str = "artifacts";

/// Remote paths used by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    root: String,
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self {
            root: REMOTE_ROOT.to_string(),
        }
    }
}

impl RemoteLayout {
    /// Layout under a different root directory.
    pub fn rooted_at(root: impl Into<String>) -> Self {
        let root: String = root.into();
        let trimmed = root.trim_end_matches('/');
        Self {
            root: if trimmed.is_empty() {
                "/".to_string()
            } else {
                trimmed.to_string()
            },
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn join(&self, name: &str) -> String {
        if self.root == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", self.root, name)
        }
    }

    /// Staging path for a script, derived from its basename.
    pub fn staged_script(&self, basename: &str) -> String {
        self.join(basename)
    }

    pub fn log_name(family: LogFamily) -> &'static str {
        match family {
            LogFamily::Script => SCRIPT_LOG_NAME,
            LogFamily::Query => QUERY_LOG_NAME,
        }
    }

    pub fn log_path(&self, family: LogFamily) -> String {
        self.join(Self::log_name(family))
    }

    pub fn status_path(&self) -> String {
        self.join(STATUS_NAME)
    }

    pub fn artifacts_dir(&self) -> String {
        self.join(ARTIFACTS_DIR_NAME)
    }

    pub fn artifact_path(&self, name: &str) -> String {
        format!("{}/{}", self.artifacts_dir(), name)
    }
}

/// Validates an untrusted artifact name from a remote listing.
///
/// Only a single normal path component is accepted, so the name can be
/// joined under the local output directory without escaping it.
pub fn sanitize_artifact_name(name: &str) -> Option<&str> {
    if name.is_empty() || name.contains('\0') || name.contains('/') || name.contains('\\') {
        return None;
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Some(name),
        _ => None,
    }
}

/// Local destination for an artifact, or `None` if the name is unsafe.
pub fn local_artifact_path(output_dir: &Path, name: &str) -> Option<PathBuf> {
    sanitize_artifact_name(name).map(|safe| output_dir.join(safe))
}

//! Configuration management for podrun.
//!
//! Named remote targets and run defaults live in a YAML file. Nothing here is
//! consulted implicitly by the orchestrator: the CLI loads the file, merges
//! its own flags on top, and passes plain values down.
//!
//! # Configuration File Location
//!
//! - Linux: `~/.config/podrun/config.yml`
//! - macOS: `~/Library/Application Support/podrun/config.yml`
//! - Windows: `C:\Users\<User>\AppData\Roaming\podrun\config.yml`
//!
//! # Example Configuration
//!
//! ```yaml
//! defaults:
//!   namespace: default
//!   timeout: 600
//! targets:
//!   mongo:
//!     kind: kubernetes
//!     pod: mongo-0
//!     namespace: data
//!     container: mongod
//!     context: prod
//!   buildbox:
//!     kind: ssh
//!     host: build.example.com
//!     user: ci
//!     ssh_key: ~/.ssh/id_ed25519
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default Kubernetes namespace
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default SSH port
const DEFAULT_SSH_PORT: u16 = 22;

/// Default SSH connect timeout in seconds
const DEFAULT_CONNECT_TIMEOUT: u64 = 30;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Named remote environments
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,

    /// Settings used when a flag is not given
    #[serde(default)]
    pub defaults: DefaultSettings,
}

/// Default settings for runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DefaultSettings {
    /// Namespace for `--pod` targets
    pub namespace: Option<String>,

    /// Whole-run timeout in seconds
    pub timeout: Option<u64>,

    /// Local directory receiving logs and artifacts
    pub artifact_dir: Option<PathBuf>,
}

/// A remote environment reachable through an exec channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetConfig {
    Kubernetes(KubernetesTarget),
    Ssh(SshTarget),
}

/// A container inside a Kubernetes pod, reached through `kubectl exec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KubernetesTarget {
    pub pod: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Container name (kubectl picks the default container when absent)
    pub container: Option<String>,

    /// kubeconfig context (current context when absent)
    pub context: Option<String>,
}

/// A host reached over SSH.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshTarget {
    pub host: String,

    pub user: String,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Private key file; agent authentication is tried when absent or failing
    pub ssh_key: Option<String>,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT
}

impl Config {
    /// Returns the default configuration file path for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("podrun").join("config.yml"))
    }

    /// Loads configuration from a specific file path.
    ///
    /// Returns `Ok(Config::default())` if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to read config file: {}\n\n\
                     File path: {}\n\n\
                     Suggestions:\n\
                     • Check file permissions: ls -la {}\n\
                     • Verify the file is readable",
                    e,
                    path.display(),
                    path.display()
                ),
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file: {}\n\n\
                 File path: {}\n\n\
                 Suggestions:\n\
                 • Check YAML syntax in the config file\n\
                 • Verify indentation uses spaces, not tabs\n\
                 • Every target needs a `kind: kubernetes` or `kind: ssh` entry",
                e,
                path.display()
            ))
        })
    }

    /// Parses configuration from YAML text.
    pub fn parse(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Serializes the configuration back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Gets a target configuration by name.
    pub fn get_target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.get(name)
    }

    /// Gets a target by name, failing with a list of known names.
    pub fn require_target(&self, name: &str) -> Result<&TargetConfig> {
        self.get_target(name).ok_or_else(|| {
            let known: Vec<&str> = self.targets.keys().map(String::as_str).collect();
            Error::Config(format!(
                "Unknown target '{}' (configured: {})",
                name,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })
    }

    /// Namespace used for `--pod` targets without `--namespace`.
    pub fn default_namespace(&self) -> &str {
        self.defaults
            .namespace
            .as_deref()
            .unwrap_or(DEFAULT_NAMESPACE)
    }
}

impl TargetConfig {
    /// Short description for listings and logs.
    pub fn summary(&self) -> String {
        match self {
            TargetConfig::Kubernetes(k8s) => k8s.summary(),
            TargetConfig::Ssh(ssh) => ssh.connection_string(),
        }
    }
}

impl KubernetesTarget {
    pub fn new(pod: String) -> Self {
        Self {
            pod,
            namespace: default_namespace(),
            container: None,
            context: None,
        }
    }

    pub fn with_namespace(mut self, namespace: String) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_container(mut self, container: Option<String>) -> Self {
        self.container = container;
        self
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// `context/namespace/pod[:container]`
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if let Some(ctx) = &self.context {
            out.push_str(ctx);
            out.push('/');
        }
        out.push_str(&self.namespace);
        out.push('/');
        out.push_str(&self.pod);
        if let Some(container) = &self.container {
            out.push(':');
            out.push_str(container);
        }
        out
    }
}

impl SshTarget {
    pub fn new(host: String, user: String) -> Self {
        Self {
            host,
            user,
            port: DEFAULT_SSH_PORT,
            ssh_key: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_ssh_key(mut self, key_path: String) -> Self {
        self.ssh_key = Some(key_path);
        self
    }

    /// Returns the SSH connection string (user@host[:port]).
    pub fn connection_string(&self) -> String {
        if self.port == DEFAULT_SSH_PORT {
            format!("{}@{}", self.user, self.host)
        } else {
            format!("{}@{}:{}", self.user, self.host, self.port)
        }
    }

    /// Expands the SSH key path, replacing ~ with the home directory.
    pub fn expanded_ssh_key(&self) -> Option<PathBuf> {
        self.ssh_key.as_ref().map(|key| {
            if let Some(stripped) = key.strip_prefix("~/") {
                if let Some(home) = dirs::home_dir() {
                    return home.join(stripped);
                }
            }
            PathBuf::from(key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
defaults:
  namespace: staging
  timeout: 120
targets:
  mongo:
    kind: kubernetes
    pod: mongo-0
    container: mongod
    context: prod
  buildbox:
    kind: ssh
    host: build.example.com
    user: ci
    port: 2222
    ssh_key: ~/.ssh/id_ed25519
"#;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.targets.is_empty());
        assert_eq!(config.default_namespace(), "default");
    }

    #[test]
    fn test_parse_targets() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.default_namespace(), "staging");
        assert_eq!(config.defaults.timeout, Some(120));

        match config.get_target("mongo") {
            Some(TargetConfig::Kubernetes(k8s)) => {
                assert_eq!(k8s.pod, "mongo-0");
                assert_eq!(k8s.namespace, "default");
                assert_eq!(k8s.container.as_deref(), Some("mongod"));
                assert_eq!(k8s.context.as_deref(), Some("prod"));
            }
            other => panic!("unexpected target: {:?}", other),
        }

        match config.get_target("buildbox") {
            Some(TargetConfig::Ssh(ssh)) => {
                assert_eq!(ssh.connection_string(), "ci@build.example.com:2222");
                assert_eq!(ssh.connect_timeout, 30);
            }
            other => panic!("unexpected target: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let err = Config::parse("targets:\n  x:\n    kind: telnet\n    host: a\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_require_target_lists_known_names() {
        let config = Config::parse(SAMPLE).unwrap();
        let err = config.require_target("nope").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nope"));
        assert!(msg.contains("buildbox, mongo"));
    }

    #[test]
    fn test_yaml_round_trip_keeps_kind_tag() {
        let mut config = Config::default();
        config.targets.insert(
            "db".to_string(),
            TargetConfig::Kubernetes(KubernetesTarget::new("db-0".to_string())),
        );
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("kind: kubernetes"));

        let parsed = Config::parse(&yaml).unwrap();
        assert_eq!(parsed.get_target("db"), config.get_target("db"));
    }

    #[test]
    fn test_load_from_missing_file_is_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.yml")).unwrap();
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_load_from_malformed_file_reports_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "targets: [unclosed\n").unwrap();

        let msg = Config::load_from(&path).unwrap_err().to_string();
        assert!(msg.starts_with("Configuration error: Failed to parse config file:"));
        assert_eq!(msg.matches("Configuration error").count(), 1);
        assert!(msg.contains(&path.display().to_string()));
    }

    #[test]
    fn test_kubernetes_summary() {
        let target = KubernetesTarget::new("api-7f9".to_string())
            .with_namespace("web".to_string())
            .with_container(Some("app".to_string()))
            .with_context(Some("kind-dev".to_string()));
        assert_eq!(target.summary(), "kind-dev/web/api-7f9:app");
        assert_eq!(
            KubernetesTarget::new("p".to_string()).summary(),
            "default/p"
        );
    }

    #[test]
    fn test_expanded_ssh_key() {
        let target = SshTarget::new("h".to_string(), "u".to_string())
            .with_ssh_key("/keys/id".to_string());
        assert_eq!(target.expanded_ssh_key(), Some(PathBuf::from("/keys/id")));

        let tilde = SshTarget::new("h".to_string(), "u".to_string())
            .with_ssh_key("~/.ssh/id_rsa".to_string());
        if let Some(home) = dirs::home_dir() {
            assert_eq!(tilde.expanded_ssh_key(), Some(home.join(".ssh/id_rsa")));
        }
    }
}

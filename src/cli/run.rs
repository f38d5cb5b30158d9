//! `podrun run`: execute a script locally or inside a remote target.

use anyhow::{Context, Result};
use clap::Args;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Config, KubernetesTarget, TargetConfig};
use crate::error::RunnerError;
use crate::interpreter;
use crate::local::run_local;
use crate::remote::{open_channel, OrchestratorSettings, RemoteOrchestrator};

#[derive(Args, Debug)]
pub struct RunCommand {
    #[arg(long, value_name = "PATH", help = "Script to run")]
    pub script_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Query file to run (ignored when --script-file is given)"
    )]
    pub query_file: Option<PathBuf>,

    #[arg(long, help = "Run inside this Kubernetes pod")]
    pub pod: Option<String>,

    #[arg(long, help = "Kubernetes namespace (default from config, else \"default\")")]
    pub namespace: Option<String>,

    #[arg(long, help = "Container name")]
    pub container: Option<String>,

    #[arg(long, help = "Kubernetes context")]
    pub context: Option<String>,

    #[arg(
        long,
        conflicts_with = "pod",
        value_name = "NAME",
        help = "Named target from the configuration file"
    )]
    pub target: Option<String>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Local directory for the log, status and artifacts (default: current directory)"
    )]
    pub artifact_dir: Option<PathBuf>,

    #[arg(long, value_name = "SECS", help = "Give up on the remote run after this many seconds")]
    pub timeout: Option<u64>,
}

impl RunCommand {
    /// Runs the command and returns the process exit code to report.
    ///
    /// The configuration file is read only after the inputs are validated.
    pub fn execute(self, config_path: Option<&Path>) -> Result<i32> {
        let script = self.select_input()?;

        // Reject unknown script kinds before any channel is opened
        interpreter::resolve(&script)?;

        let config = match config_path {
            Some(path) => Config::load_from(path)?,
            None => Config::default(),
        };

        let target = match self.resolve_target(&config)? {
            Some(target) => target,
            None => {
                info!("No remote target given, running {} locally", script.display());
                return Ok(run_local(&script)?);
            }
        };

        let output_dir = self
            .artifact_dir
            .clone()
            .or_else(|| config.defaults.artifact_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let timeout = self
            .timeout
            .or(config.defaults.timeout)
            .map(Duration::from_secs);

        let settings = OrchestratorSettings::new(output_dir).with_timeout(timeout);
        debug!("Run settings: {:?}", settings);

        let channel = open_channel(&target)
            .with_context(|| format!("Failed to open exec channel to {}", target.summary()))?;
        let result = RemoteOrchestrator::new(channel, settings).run(&script)?;

        println!("Log: {}", result.log_path().display());
        for artifact in result.artifacts() {
            println!("Artifact: {}", artifact.display());
        }

        Ok(result.exit_status())
    }

    /// Picks the file to run; the script path wins and the query path is
    /// then never looked at.
    fn select_input(&self) -> std::result::Result<PathBuf, RunnerError> {
        match (&self.script_file, &self.query_file) {
            (Some(script), Some(_)) => {
                debug!("Both --script-file and --query-file given, using the script");
                Ok(script.clone())
            }
            (Some(script), None) => Ok(script.clone()),
            (None, Some(query)) => Ok(query.clone()),
            (None, None) => Err(RunnerError::Usage(
                "At least one of --script-file or --query-file is required.".to_string(),
            )),
        }
    }

    fn resolve_target(&self, config: &Config) -> Result<Option<TargetConfig>> {
        if let Some(name) = &self.target {
            let mut target = config.require_target(name)?.clone();
            if let TargetConfig::Kubernetes(k8s) = &mut target {
                self.apply_overrides(k8s);
            }
            return Ok(Some(target));
        }

        Ok(self.pod.as_ref().map(|pod| {
            let mut k8s = KubernetesTarget::new(pod.clone())
                .with_namespace(config.default_namespace().to_string());
            self.apply_overrides(&mut k8s);
            TargetConfig::Kubernetes(k8s)
        }))
    }

    fn apply_overrides(&self, k8s: &mut KubernetesTarget) {
        if let Some(namespace) = &self.namespace {
            k8s.namespace = namespace.clone();
        }
        if self.container.is_some() {
            k8s.container = self.container.clone();
        }
        if self.context.is_some() {
            k8s.context = self.context.clone();
        }
    }
}

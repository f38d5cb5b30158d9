//! CLI command for inspecting podrun configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::Path;

use crate::config::{Config, TargetConfig};

#[derive(Args, Debug)]
#[command(about = "Inspect podrun configuration")]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show the configuration file path
    Path,

    /// List all configured targets
    ListTargets,
}

impl ConfigCommand {
    pub fn execute(&self, config: &Config, path: Option<&Path>) -> Result<()> {
        match &self.action {
            ConfigAction::Show => Self::show_config(config),
            ConfigAction::Path => Self::show_path(path),
            ConfigAction::ListTargets => Self::list_targets(config),
        }
    }

    fn show_config(config: &Config) -> Result<()> {
        if config.targets.is_empty() && config.defaults == Default::default() {
            println!("No configuration file found or nothing configured.");
            println!("Scripts run locally unless --pod is given.");
            return Ok(());
        }

        println!("{}", config.to_yaml()?);
        Ok(())
    }

    fn show_path(path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                println!("Configuration file path: {}", path.display());
                if path.exists() {
                    println!("Status: File exists");
                } else {
                    println!("Status: File does not exist");
                }
            }
            None => {
                println!("Could not determine configuration directory");
            }
        }

        Ok(())
    }

    fn list_targets(config: &Config) -> Result<()> {
        if config.targets.is_empty() {
            println!("No targets configured.");
            return Ok(());
        }

        println!("Configured targets:");
        println!();

        for (name, target) in &config.targets {
            let kind = match target {
                TargetConfig::Kubernetes(_) => "kubernetes",
                TargetConfig::Ssh(_) => "ssh",
            };
            println!("  {} - {} ({})", name, target.summary(), kind);
        }

        Ok(())
    }
}

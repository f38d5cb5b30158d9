use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use podrun::cli::config::ConfigCommand;
use podrun::cli::exit_code_for;
use podrun::cli::run::RunCommand;
use podrun::config::Config;

#[derive(Parser)]
#[command(name = "podrun")]
#[command(about = "Run a local script inside a pod or remote host and collect its outputs", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: <config dir>/podrun/config.yml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run(RunCommand),
    Config(ConfigCommand),
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    };

    std::process::exit(code);
}

fn dispatch(cli: Cli) -> Result<i32> {
    let config_path = cli.config.or_else(Config::default_path);

    match cli.command {
        Commands::Run(cmd) => cmd.execute(config_path.as_deref()),
        Commands::Config(cmd) => {
            let config = match &config_path {
                Some(path) => Config::load_from(path)?,
                None => Config::default(),
            };
            cmd.execute(&config, config_path.as_deref())?;
            Ok(0)
        }
    }
}

//! mofront CLI: runs the model optimizer front phase on serialized graphs.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use env_logger::Env;

use commands::transform::TransformOptions;
use config::MofrontConfig;

#[derive(Parser)]
#[command(name = "mofront", version, about = "Model optimizer front phase")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the front-phase passes over a graph
    Transform {
        /// Input graph (.json or MOIR container)
        #[arg(long)]
        input: PathBuf,
        /// Output graph (.json or MOIR container)
        #[arg(long)]
        output: PathBuf,
        /// Skip a pass by name (repeatable)
        #[arg(long = "disable", value_name = "PASS")]
        disabled: Vec<String>,
        /// Keep nodes that no longer feed an output
        #[arg(long)]
        no_cleanup: bool,
        /// Configuration file (default: nearest mofront.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show statistics about a graph file
    Inspect {
        /// Graph file (.json or MOIR container)
        #[arg(long)]
        input: PathBuf,
    },
    /// List the front-phase passes
    Passes,
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    let explicit_config: Option<&Path> = match &cli.command {
        Commands::Transform { config, .. } => config.as_deref(),
        _ => None,
    };
    let config = MofrontConfig::resolve(explicit_config, &cwd)?;
    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level())).init();

    match cli.command {
        Commands::Transform {
            input,
            output,
            disabled,
            no_cleanup,
            config: _,
        } => {
            let options = TransformOptions {
                disabled,
                no_cleanup,
            };
            commands::transform::run(&input, &output, &config, &options).map(|_| ())
        }
        Commands::Inspect { input } => commands::inspect::run(&input),
        Commands::Passes => commands::passes::run(&config),
    }
}

//! Disha CLI - Main entry point
//!
//! Developer tooling for waypoint paths: inspect what the AR view would
//! place for a backend response, and write a default configuration.

mod plan;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use disha_core::{load_config, save_default_config, OrderedWaypointPath};
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::plan::ScenePlan;

#[derive(Parser, Debug)]
#[command(name = "disha")]
#[command(about = "Disha AR waypoint navigation tools")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the markers and connectors a path document produces
    Inspect {
        /// Path JSON as returned by the vision backend
        file: PathBuf,

        /// Path to configuration file
        #[arg(short, long, default_value = "disha.toml")]
        config: PathBuf,

        /// Override the backend-to-render scale factor
        #[arg(short, long)]
        scale: Option<f64>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a configuration file with every default spelled out
    InitConfig {
        file: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    debug!("Disha v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Inspect {
            file,
            config,
            scale,
            json,
        } => {
            let plan = inspect(&file, &config, scale)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("{}", plan);
            }
        }
        Command::InitConfig { file, force } => {
            init_config(&file, force)?;
            println!("Wrote default configuration to {}", file.display());
        }
    }

    Ok(())
}

fn inspect(file: &Path, config_path: &Path, scale: Option<f64>) -> Result<ScenePlan> {
    let mut config = load_config(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if let Some(scale) = scale {
        config.path.scale = scale;
        config.validate()?;
    }

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let path = OrderedWaypointPath::from_json(&content)
        .with_context(|| format!("{} is not a usable path", file.display()))?;

    info!(
        waypoints = path.waypoints.len(),
        scale = config.path.scale,
        "Path loaded"
    );
    Ok(ScenePlan::build(&path, &config))
}

fn init_config(file: &Path, force: bool) -> Result<()> {
    if file.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            file.display()
        );
    }
    save_default_config(file)?;
    Ok(())
}

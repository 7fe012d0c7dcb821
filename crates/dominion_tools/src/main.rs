//! Dominion - Development Tools

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dominion_core::races::RaceRegistry;
use dominion_tools::scenario::{Scenario, ScenarioError};
use dominion_tools::validate::validate_data_directory;

#[derive(Parser)]
#[command(name = "dominion-tools")]
#[command(about = "Development tools for the dominion combat engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate race data files
    Validate {
        /// Path to race data directory
        #[arg(default_value = "crates/dominion_tools/data/races")]
        path: PathBuf,
    },
    /// Resolve the invasions in a scenario file
    Simulate {
        /// Path to scenario RON file
        scenario: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating race data in: {}", path.display());
            match validate_data_directory(&path) {
                Ok(report) if report.is_ok() => {
                    tracing::info!("Validation passed: {}", report.races.join(", "));
                }
                Ok(report) => {
                    for problem in &report.problems {
                        tracing::error!("{}: {}", problem.path.display(), problem.message);
                    }
                    std::process::exit(1);
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Simulate { scenario, json } => {
            if let Err(e) = simulate(&scenario, json) {
                tracing::error!("Simulation failed: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn simulate(path: &Path, json: bool) -> Result<(), ScenarioError> {
    let scenario = Scenario::load(path)?;
    let mut races = RaceRegistry::new();
    let loaded = races.load_from_directory(&scenario.races_dir(path))?;
    tracing::info!(races = loaded.len(), scenario = %scenario.name, "Loaded scenario");

    let report = scenario.run(races)?;
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

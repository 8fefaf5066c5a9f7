//! EvaFrontier - Navigation Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nav_tools::scenario::{run_scenario_for, Scenario};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nav-tools")]
#[command(about = "Navigation development tools for EvaFrontier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate unit kind data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "data/units")]
        path: PathBuf,
    },
    /// Run a headless navigation scenario
    Simulate {
        /// Path to the scenario RON file
        scenario: PathBuf,
        /// Override the scenario's tick count
        #[arg(long)]
        ticks: Option<u64>,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating unit data in: {}", path.display());
            match nav_tools::validate::validate_data_directory(&path) {
                Ok(count) => tracing::info!("Validation passed ({count} unit kinds)"),
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Simulate { scenario, ticks } => {
            let report = Scenario::load(&scenario).and_then(|loaded| {
                let ticks = ticks.unwrap_or(loaded.ticks);
                tracing::info!("Running scenario '{}' for {ticks} ticks", loaded.name);
                run_scenario_for(&loaded, ticks)
            });
            match report {
                Ok(report) => {
                    for agent in &report.agents {
                        tracing::info!(
                            id = agent.id,
                            kind = %agent.kind,
                            x = agent.position.0,
                            y = agent.position.1,
                            direction = ?agent.direction,
                            frame = agent.frame,
                            collisions = agent.collisions,
                            arrivals = agent.arrivals,
                            "Agent final state"
                        );
                    }
                    println!("{report}");
                }
                Err(e) => {
                    tracing::error!("Scenario failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line front end of the outage dashboard.
//!
//! ```text
//! outage_map [--data-dir data] summary
//! outage_map [--data-dir data] replay script.toml [--output snapshot.json]
//! outage_map [--data-dir data] interactive
//! ```
//!
//! Running without a subcommand enters interactive mode. `RUST_LOG`
//! controls log output, which is routed through the progress bars.

mod interactive;
mod summary;

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use outage_map_cli_utils::{IndicatifProgress, MultiProgress};
use outage_map_dashboard::{Dashboard, DashboardConfig, Interaction};
use outage_map_prep::{DataContract, Dataset, SourceReaders};
use serde::Deserialize;

const GEOMETRY_FILE: &str = "geometry_data.geojson";
const OUTAGES_FILE: &str = "aggreted_power_outages_complete_no_pr.csv";
const POPULATION_FILE: &str = "pops_2019_2023_county.csv";
const CARTOGRAM_FILE: &str = "cartogram_avg_outage.csv";

#[derive(Parser)]
#[command(name = "outage_map", about = "Explore monthly power outages by county")]
struct Cli {
    /// Directory holding the four input files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Data contract TOML overriding the embedded column names
    #[arg(long)]
    contract: Option<PathBuf>,

    /// Dashboard TOML with a `[dashboard]` table
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the data and print a summary with data-quality counts
    Summary,
    /// Apply a scripted list of interactions and write the final snapshot
    Replay {
        /// TOML file with an `[[interactions]]` array
        script: PathBuf,
        /// Write the snapshot JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Drive the dashboard from a menu
    Interactive,
}

/// A replay script.
#[derive(Debug, Deserialize)]
struct ReplayScript {
    #[serde(default)]
    interactions: Vec<Interaction>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = outage_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let contract = match &cli.contract {
        Some(path) => DataContract::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => DataContract::default(),
    };
    let config = match &cli.config {
        Some(path) => DashboardConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => DashboardConfig::default(),
    };

    let dataset = load(&cli.data_dir, &contract, &multi)?;

    match cli.command {
        Some(Commands::Summary) => {
            print!("{}", summary::dataset(&dataset));
        }
        Some(Commands::Replay { script, output }) => {
            let script: ReplayScript = toml::de::from_str(&std::fs::read_to_string(&script)?)?;
            let mut dashboard = Dashboard::new(dataset, config);
            replay(&mut dashboard, &script.interactions)?;

            let json = serde_json::to_string_pretty(&dashboard.snapshot())?;
            if let Some(path) = output {
                std::fs::write(&path, json)?;
                log::info!("Wrote snapshot to {}", path.display());
            } else {
                println!("{json}");
            }
        }
        Some(Commands::Interactive) | None => {
            interactive::run(Dashboard::new(dataset, config))?;
        }
    }

    Ok(())
}

/// Opens the input files under `data_dir` and prepares the dataset.
fn load(
    data_dir: &Path,
    contract: &DataContract,
    multi: &MultiProgress,
) -> Result<Dataset, Box<dyn std::error::Error>> {
    let open = |name: &str| -> Result<File, std::io::Error> {
        let path = data_dir.join(name);
        File::open(&path).inspect_err(|e| log::error!("Cannot open {}: {e}", path.display()))
    };

    let sources = SourceReaders {
        geometry: Box::new(open(GEOMETRY_FILE)?),
        outages: Box::new(open(OUTAGES_FILE)?),
        population: Box::new(open(POPULATION_FILE)?),
        cartogram: Box::new(open(CARTOGRAM_FILE)?),
    };

    let progress = IndicatifProgress::steps_bar(multi, "Preparing dataset");
    let dataset = outage_map_prep::prepare(sources, contract, &progress)
        .inspect_err(|e| log::error!("Failed to prepare dataset: {e}"))?;
    Ok(dataset)
}

/// Applies `interactions` in order, stopping at the first one that cannot
/// be translated into an event.
fn replay(
    dashboard: &mut Dashboard,
    interactions: &[Interaction],
) -> Result<(), outage_map_dashboard::SelectionError> {
    for (i, interaction) in interactions.iter().enumerate() {
        let reports = dashboard.apply(interaction)?;
        let failures: usize = reports.iter().map(|r| r.failures.len()).sum();
        if failures > 0 {
            log::warn!("Step {}: {interaction} had {failures} handler failures", i + 1);
        }
    }
    log::info!("Replayed {} interactions", interactions.len());
    Ok(())
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset preparation for the outage dashboard.
//!
//! Reads the four input files (county boundaries, monthly outages, county
//! population, state cartogram reference), coerces their fields, drops
//! excluded states and joins everything by county FIPS code into a
//! read-only [`Dataset`]. Opening files is left to the caller: every input
//! is a [`std::io::Read`].
//!
//! Pipeline:
//!
//! 1. **Load**: parse each file against the [`DataContract`]
//! 2. **Join**: attach population and outage totals to each county
//! 3. **Derive**: monthly per-state affected shares for the cartogram

pub mod aggregate;
pub mod coerce;
pub mod contract;
pub mod dataset;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
pub mod load;
pub mod progress;
pub mod quality;
pub mod tiles;

use std::io::Read;
use std::sync::Arc;

use outage_map_geography::GeoError;
use thiserror::Error;

pub use contract::DataContract;
pub use dataset::Dataset;
pub use progress::{ProgressCallback, null_progress};
pub use quality::DataQualityReport;

use dataset::JoinInputs;

/// Errors that make the dataset unusable.
#[derive(Debug, Error)]
pub enum PrepError {
    /// A CSV file could not be read.
    #[error("CSV error in {file} file: {source}")]
    Csv {
        file: &'static str,
        #[source]
        source: csv::Error,
    },

    /// The boundary document could not be read.
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// I/O error opening or reading an input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A key column is absent from a CSV header.
    #[error("Missing column '{column}' in {file} file")]
    MissingColumn { file: &'static str, column: String },

    /// The data contract TOML is invalid.
    #[error("Invalid data contract: {0}")]
    Contract(#[from] toml::de::Error),
}

/// The four input files, already opened.
pub struct SourceReaders {
    pub geometry: Box<dyn Read>,
    pub outages: Box<dyn Read>,
    pub population: Box<dyn Read>,
    pub cartogram: Box<dyn Read>,
}

/// Loads and joins the dataset.
///
/// Lenient decisions (coerced values, dropped rows, join misses) are
/// recorded in the dataset's [`DataQualityReport`] and logged once.
///
/// # Errors
///
/// Returns [`PrepError`] if any input cannot be parsed or lacks a key
/// column. No partial dataset is returned.
pub fn prepare(
    sources: SourceReaders,
    contract: &DataContract,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Dataset, PrepError> {
    let mut quality = DataQualityReport::default();
    progress.set_total(5);

    progress.set_message("Reading county boundaries".to_string());
    let boundaries = load::read_boundaries(sources.geometry, contract, &mut quality)?;
    progress.inc(1);

    progress.set_message("Reading monthly outages".to_string());
    let outages = load::read_outages(sources.outages, contract, &mut quality)?;
    progress.inc(1);

    progress.set_message("Reading county population".to_string());
    let population = load::read_population(sources.population, contract, &mut quality)?;
    progress.inc(1);

    progress.set_message("Reading cartogram reference".to_string());
    let states = load::read_state_references(sources.cartogram, contract, &mut quality)?;
    progress.inc(1);

    progress.set_message("Joining".to_string());
    let dataset = Dataset::join(
        JoinInputs {
            boundaries,
            outages,
            population,
            states,
        },
        quality,
    );
    progress.inc(1);

    dataset.quality().log_summary();
    progress.finish(format!(
        "Prepared {} counties, {} outage rows",
        dataset.regions().len(),
        dataset.record_count()
    ));

    Ok(dataset)
}

//! hygrotrace - sensor log cleaning & displacement analysis
//!
//! Reads a fixed-schema time-series log (two displacement channels plus
//! eight temperature/humidity sensor pairs around a monitored artifact),
//! cleans it — summer-time normalization, device-reset jump correction,
//! leading-row trimming, humidity-fault filtering — and derives the series
//! the analysis consumes: percentage displacement, rolling statistics and
//! the humidity-binned displacement response.
//!
//! The whole pipeline is a single-threaded, single-pass batch computation
//! (only the humidity binning fans out per bin); it runs to completion once
//! per invocation and any failure aborts the run.

pub mod config;
pub mod data;
pub mod stats;

use std::path::Path;
use thiserror::Error;

pub use config::{AnalysisConfig, CleanConfig, Config};
pub use data::{DataCleaner, SensorTable};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] data::LoaderError),
    #[error(transparent)]
    Clean(#[from] data::CleanError),
}

/// Load the log at `path` and run the cleaning pass over it.
///
/// Audit output (detected jumps, dropped humidity rows, summer-time shifts)
/// is emitted as `tracing` events; install a subscriber to see it.
pub fn load(path: &Path, config: &CleanConfig) -> Result<SensorTable, PipelineError> {
    let raw = data::load_log(path)?;
    let table = DataCleaner::new(config.clone()).clean(&raw)?;
    Ok(table)
}

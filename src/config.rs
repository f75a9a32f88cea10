//! Pipeline Configuration Module
//! Cleaning and analysis parameters with defaults matching the published run.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parameters of the cleaning pass.
///
/// The defaults reproduce the values the measurement campaign was published
/// with; override them (e.g. via [`Config::from_json_file`]) when applying
/// the pipeline to another dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    /// Apply jump correction and leading-row trimming. Disable to inspect
    /// the uncorrected series.
    pub correct_jumps: bool,
    /// Minimum step size (mm) flagged as a device reset on the vertical channel.
    pub vertical_jump_threshold: f64,
    /// Minimum step size (mm) flagged as a device reset on the horizontal channel.
    pub horizontal_jump_threshold: f64,
    /// Rows with an averaged relative humidity at or above this are dropped.
    pub humidity_max: f64,
    /// Number of leading rows with irregular sampling intervals to discard.
    pub drop_leading: usize,
    /// Row index (after trimming) known to fall at local midnight; elapsed
    /// days are re-baselined so that this row sits at day 0.
    pub midnight_row: usize,
    /// Start of the summer-time window (exclusive).
    pub summer_start: NaiveDateTime,
    /// End of the summer-time window (exclusive).
    pub summer_end: NaiveDateTime,
    /// Factor applied to the raw displacement readings. The default converts
    /// to millimetres and flips the sign so expansion reads as positive.
    pub displacement_scale: f64,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            correct_jumps: true,
            vertical_jump_threshold: 0.25,
            horizontal_jump_threshold: 0.15,
            humidity_max: 100.0,
            drop_leading: 14,
            midnight_row: 16,
            summer_start: ymd_hms(2021, 3, 28, 2, 30, 0),
            summer_end: ymd_hms(2021, 10, 31, 3, 0, 0),
            displacement_scale: -10.0,
        }
    }
}

/// Parameters of the derived-statistics pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Vertical extent of the monitored artifact (mm), for percentage series.
    pub vertical_extent_mm: f64,
    /// Horizontal extent of the monitored artifact (mm).
    pub horizontal_extent_mm: f64,
    /// Short rolling window in samples (6 h at 30-minute sampling).
    pub short_window: usize,
    /// Long rolling window in samples (30 days at 30-minute sampling).
    pub long_window: usize,
    /// Lower edge of the humidity binning range (%).
    pub rh_min: f64,
    /// Upper edge of the humidity binning range (%).
    pub rh_max: f64,
    /// Width of one humidity bin (%).
    pub rh_bin_width: f64,
    /// Spread reported per bin as this many standard deviations.
    pub n_sigma: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            vertical_extent_mm: 3000.0,
            horizontal_extent_mm: 2400.0,
            short_window: 12,
            long_window: 48 * 30,
            rh_min: 39.0,
            rh_max: 80.0,
            rh_bin_width: 1.0,
            n_sigma: 2.0,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub clean: CleanConfig,
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Load a configuration from a JSON file. Missing fields keep their
    /// defaults, so a partial override file is enough.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

// Known-valid date literals only.
fn ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .and_then(|date| date.and_hms_opt(h, mi, s))
        .unwrap()
}

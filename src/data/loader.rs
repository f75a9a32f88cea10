//! Log Loader Module
//! Parses the fixed-schema displacement/climate log into typed records.

use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Number of paired temperature/humidity sensors around the artifact.
pub const SENSOR_COUNT: usize = 8;

/// date, time, 2 displacement channels, then (T, RV) per sensor.
pub const COLUMN_COUNT: usize = 2 + 2 + 2 * SENSOR_COUNT;

/// Sensors hanging in front of the artifact (1-based ids).
pub const FRONT_SENSORS: [usize; 3] = [1, 4, 7];

/// Sensors hanging behind the artifact. Sensor 7 counts for both sides.
pub const BACK_SENSORS: [usize; 5] = [2, 3, 5, 6, 7];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("failed to read log: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {line}: expected {expected} columns, found {found}")]
    Schema {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {line}, column {column}: cannot parse number from {token:?}")]
    Numeric {
        line: usize,
        column: usize,
        token: String,
    },
    #[error("row {line}: cannot parse timestamp from {token:?}")]
    Timestamp { line: usize, token: String },
    #[error("log file contains no records")]
    Empty,
}

/// One temperature/relative-humidity sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorPair {
    pub temperature: f64,
    pub humidity: f64,
}

/// One log row as read from disk, before any cleaning.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub timestamp: NaiveDateTime,
    /// Raw vertical displacement reading, device units.
    pub vertical: f64,
    /// Raw horizontal displacement reading, device units.
    pub horizontal: f64,
    pub sensors: [SensorPair; SENSOR_COUNT],
}

impl RawRecord {
    fn subset_mean(&self, ids: &[usize], pick: fn(&SensorPair) -> f64) -> f64 {
        let sum: f64 = ids.iter().map(|&i| pick(&self.sensors[i - 1])).sum();
        sum / ids.len() as f64
    }

    pub fn humidity_avg(&self) -> f64 {
        self.sensors.iter().map(|p| p.humidity).sum::<f64>() / SENSOR_COUNT as f64
    }

    pub fn humidity_front(&self) -> f64 {
        self.subset_mean(&FRONT_SENSORS, |p| p.humidity)
    }

    pub fn humidity_back(&self) -> f64 {
        self.subset_mean(&BACK_SENSORS, |p| p.humidity)
    }

    pub fn temperature_avg(&self) -> f64 {
        self.sensors.iter().map(|p| p.temperature).sum::<f64>() / SENSOR_COUNT as f64
    }

    pub fn temperature_front(&self) -> f64 {
        self.subset_mean(&FRONT_SENSORS, |p| p.temperature)
    }

    pub fn temperature_back(&self) -> f64 {
        self.subset_mean(&BACK_SENSORS, |p| p.temperature)
    }
}

/// Read the comma-delimited, headerless sensor log at `path`.
pub fn load_log(path: &Path) -> Result<Vec<RawRecord>, LoaderError> {
    let reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    read_records(reader)
}

fn read_records<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<RawRecord>, LoaderError> {
    let mut records = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        let row = result?;
        let line = idx + 1;

        if row.len() != COLUMN_COUNT {
            return Err(LoaderError::Schema {
                line,
                expected: COLUMN_COUNT,
                found: row.len(),
            });
        }

        let stamp = format!("{} {}", row[0].trim(), row[1].trim());
        let timestamp = NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT)
            .map_err(|_| LoaderError::Timestamp { line, token: stamp })?;

        let mut numeric = [0.0f64; COLUMN_COUNT - 2];
        for (j, slot) in numeric.iter_mut().enumerate() {
            *slot = parse_number(&row[j + 2]).ok_or_else(|| LoaderError::Numeric {
                line,
                column: j + 3,
                token: row[j + 2].to_string(),
            })?;
        }

        let mut sensors = [SensorPair {
            temperature: 0.0,
            humidity: 0.0,
        }; SENSOR_COUNT];
        for (s, pair) in sensors.iter_mut().enumerate() {
            pair.temperature = numeric[2 + 2 * s];
            pair.humidity = numeric[3 + 2 * s];
        }

        records.push(RawRecord {
            timestamp,
            vertical: numeric[0],
            horizontal: numeric[1],
            sensors,
        });
    }

    if records.is_empty() {
        return Err(LoaderError::Empty);
    }
    Ok(records)
}

/// Parse a numeric token, tolerating locale decimal commas ("12,5").
fn parse_number(token: &str) -> Option<f64> {
    let cleaned = token.trim();
    if let Ok(v) = cleaned.parse::<f64>() {
        return Some(v);
    }
    cleaned.replace(',', ".").parse::<f64>().ok()
}

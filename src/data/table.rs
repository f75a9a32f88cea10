//! Cleaned Dataset Module
//! Row-ordered table handed to analysis consumers once cleaning is done.

use crate::data::loader::{SensorPair, SENSOR_COUNT};
use chrono::NaiveDateTime;
use polars::prelude::*;

/// One cleaned sample. Displacements are in millimetres with expansion
/// positive; `d_*` carry the raw per-step differences the jump detector
/// consumed, and are deliberately not recomputed after correction.
#[derive(Debug, Clone)]
pub struct Record {
    pub timestamp: NaiveDateTime,
    /// Elapsed minutes since the first retained sample.
    pub minutes: f64,
    /// Elapsed days; day 0 is aligned to a midnight boundary.
    pub days: f64,
    pub vertical: f64,
    pub horizontal: f64,
    pub d_vertical: f64,
    pub d_horizontal: f64,
    /// Time delta to the previous sample in minutes (first sample: 0).
    pub interval_mins: f64,
    pub humidity_avg: f64,
    pub humidity_front: f64,
    pub humidity_back: f64,
    pub temperature_avg: f64,
    pub temperature_front: f64,
    pub temperature_back: f64,
    pub sensors: [SensorPair; SENSOR_COUNT],
}

/// Cleaned, time-ordered sensor table. Immutable once returned by the cleaner.
#[derive(Debug, Clone, Default)]
pub struct SensorTable {
    records: Vec<Record>,
}

impl SensorTable {
    pub(crate) fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Extract one field as a contiguous column.
    pub fn column<F>(&self, pick: F) -> Vec<f64>
    where
        F: Fn(&Record) -> f64,
    {
        self.records.iter().map(pick).collect()
    }

    /// Export the derived columns as a polars `DataFrame`. Column names
    /// follow the original log conventions (RV = relative humidity,
    /// T = temperature).
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let datetimes: Vec<String> = self
            .records
            .iter()
            .map(|r| r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
            .collect();

        DataFrame::new(vec![
            Column::new("datetime".into(), datetimes),
            Column::new("minutes_diff".into(), self.column(|r| r.minutes)),
            Column::new("days_diff".into(), self.column(|r| r.days)),
            Column::new("ver_rel".into(), self.column(|r| r.vertical)),
            Column::new("hor_rel".into(), self.column(|r| r.horizontal)),
            Column::new("dver_raw".into(), self.column(|r| r.d_vertical)),
            Column::new("dhor_raw".into(), self.column(|r| r.d_horizontal)),
            Column::new("interval_mins".into(), self.column(|r| r.interval_mins)),
            Column::new("RV_avg".into(), self.column(|r| r.humidity_avg)),
            Column::new("RV_front".into(), self.column(|r| r.humidity_front)),
            Column::new("RV_back".into(), self.column(|r| r.humidity_back)),
            Column::new("T_avg".into(), self.column(|r| r.temperature_avg)),
            Column::new("T_front".into(), self.column(|r| r.temperature_front)),
            Column::new("T_back".into(), self.column(|r| r.temperature_back)),
        ])
    }
}

//! Data Cleaner Module
//! Turns raw log records into the cleaned, analysis-ready sensor table:
//! summer-time normalization, derived metrics, jump correction, leading-row
//! trimming and humidity-fault filtering.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::CleanConfig;
use crate::data::jumps::{Channel, JumpCorrector};
use crate::data::loader::RawRecord;
use crate::data::table::{Record, SensorTable};

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("no records to clean")]
    Empty,
    #[error("not enough records to trim: {got} rows, need more than {need}")]
    TooShort { got: usize, need: usize },
    #[error("time axis out of range after trimming: {0}")]
    Range(String),
}

/// Single-pass batch cleaner for one experiment's log.
pub struct DataCleaner {
    config: CleanConfig,
}

impl DataCleaner {
    pub fn new(config: CleanConfig) -> Self {
        Self { config }
    }

    /// Run the full cleaning pass. Jump correction and trimming are skipped
    /// when `correct_jumps` is off; the humidity filter always runs.
    pub fn clean(&self, raw: &[RawRecord]) -> Result<SensorTable, CleanError> {
        if raw.is_empty() {
            return Err(CleanError::Empty);
        }

        let timestamps = self.normalize_summer_time(raw);
        let mut records = self.derive(raw, timestamps);

        if self.config.correct_jumps {
            self.correct_channel(
                &mut records,
                Channel::Vertical,
                self.config.vertical_jump_threshold,
                |r| r.vertical,
                |r| r.d_vertical,
                |r, v| r.vertical = v,
            );
            self.correct_channel(
                &mut records,
                Channel::Horizontal,
                self.config.horizontal_jump_threshold,
                |r| r.horizontal,
                |r| r.d_horizontal,
                |r, v| r.horizontal = v,
            );
            self.trim(&mut records)?;
        }

        self.filter_humidity(&mut records);
        Ok(SensorTable::new(records))
    }

    /// Shift all timestamps inside the summer window back one hour, except
    /// the last two in-window samples: the source feed re-emits those already
    /// in winter time. Dataset-specific rule, kept literally.
    fn normalize_summer_time(&self, raw: &[RawRecord]) -> Vec<NaiveDateTime> {
        let mut stamps: Vec<NaiveDateTime> = raw.iter().map(|r| r.timestamp).collect();

        let in_window: Vec<usize> = stamps
            .iter()
            .enumerate()
            .filter(|(_, t)| **t > self.config.summer_start && **t < self.config.summer_end)
            .map(|(i, _)| i)
            .collect();

        let shifted = in_window.len().saturating_sub(2);
        for &i in &in_window[..shifted] {
            stamps[i] -= Duration::hours(1);
        }

        debug!(
            shifted,
            skipped = in_window.len() - shifted,
            "summer-time normalization"
        );
        stamps
    }

    /// Build the derived columns: elapsed time, scaled displacements, channel
    /// means, per-step differences and sampling intervals.
    fn derive(&self, raw: &[RawRecord], stamps: Vec<NaiveDateTime>) -> Vec<Record> {
        let start = stamps[0];
        let scale = self.config.displacement_scale;

        let mut records: Vec<Record> = raw
            .iter()
            .zip(stamps)
            .map(|(r, timestamp)| {
                let minutes = (timestamp - start).num_seconds() as f64 / 60.0;
                Record {
                    timestamp,
                    minutes,
                    days: minutes / MINUTES_PER_DAY,
                    vertical: r.vertical * scale,
                    horizontal: r.horizontal * scale,
                    d_vertical: 0.0,
                    d_horizontal: 0.0,
                    interval_mins: 0.0,
                    humidity_avg: r.humidity_avg(),
                    humidity_front: r.humidity_front(),
                    humidity_back: r.humidity_back(),
                    temperature_avg: r.temperature_avg(),
                    temperature_front: r.temperature_front(),
                    temperature_back: r.temperature_back(),
                    sensors: r.sensors,
                }
            })
            .collect();

        // First differences and sampling interval; the first record keeps 0.
        for i in 1..records.len() {
            let (vertical, horizontal, minutes) = {
                let prev = &records[i - 1];
                (prev.vertical, prev.horizontal, prev.minutes)
            };
            let r = &mut records[i];
            r.d_vertical = r.vertical - vertical;
            r.d_horizontal = r.horizontal - horizontal;
            r.interval_mins = r.minutes - minutes;
        }

        records
    }

    fn correct_channel(
        &self,
        records: &mut [Record],
        channel: Channel,
        threshold: f64,
        value_of: fn(&Record) -> f64,
        diff_of: fn(&Record) -> f64,
        set: fn(&mut Record, f64),
    ) {
        let timestamps: Vec<NaiveDateTime> = records.iter().map(|r| r.timestamp).collect();
        let days: Vec<f64> = records.iter().map(|r| r.days).collect();
        let diffs: Vec<f64> = records.iter().map(diff_of).collect();
        let mut values: Vec<f64> = records.iter().map(value_of).collect();

        let corrector = JumpCorrector::new(channel, threshold);
        let anchors = corrector.detect(&timestamps, &days, &values, &diffs);
        corrector.apply(&days, &mut values, &anchors);

        for (r, v) in records.iter_mut().zip(values) {
            set(r, v);
        }
    }

    /// Drop the irregularly sampled leading rows, re-zero the series to the
    /// new first record, then anchor elapsed-day 0 onto the first midnight.
    fn trim(&self, records: &mut Vec<Record>) -> Result<(), CleanError> {
        let need = self.config.drop_leading + self.config.midnight_row;
        if records.len() <= need {
            return Err(CleanError::TooShort {
                got: records.len(),
                need,
            });
        }

        records.drain(..self.config.drop_leading);

        let (minutes0, days0, vertical0, horizontal0) = {
            let first = &records[0];
            (first.minutes, first.days, first.vertical, first.horizontal)
        };
        for r in records.iter_mut() {
            r.minutes -= minutes0;
            r.days -= days0;
            r.vertical -= vertical0;
            r.horizontal -= horizontal0;
        }

        // Rows before the midnight anchor end up at small negative day
        // values; the minutes axis stays zero-based.
        let midnight_offset = records[self.config.midnight_row].days;
        if !(0.0..1.0).contains(&midnight_offset) {
            return Err(CleanError::Range(format!(
                "midnight anchor offset {midnight_offset:.3} days outside the first day"
            )));
        }
        for r in records.iter_mut() {
            r.days -= midnight_offset;
        }

        let mut prev = f64::NEG_INFINITY;
        for (i, r) in records.iter().enumerate() {
            if r.minutes < 0.0 {
                return Err(CleanError::Range(format!(
                    "row {i}: negative elapsed minutes {:.3}",
                    r.minutes
                )));
            }
            if r.minutes <= prev {
                return Err(CleanError::Range(format!(
                    "row {i}: elapsed minutes not strictly increasing"
                )));
            }
            prev = r.minutes;
        }

        Ok(())
    }

    /// Drop physically implausible rows (averaged humidity at or above the
    /// cutoff), preserving the order of the remainder.
    fn filter_humidity(&self, records: &mut Vec<Record>) {
        let max = self.config.humidity_max;
        let before = records.len();
        records.retain(|r| {
            let keep = r.humidity_avg < max;
            if !keep {
                info!(
                    timestamp = %r.timestamp,
                    humidity = r.humidity_avg,
                    "dropping out-of-range humidity row"
                );
            }
            keep
        });
        if records.len() != before {
            info!(dropped = before - records.len(), "humidity filter");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{SensorPair, SENSOR_COUNT};
    use chrono::NaiveDate;

    fn ts(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 2, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn raw(timestamp: NaiveDateTime, vertical: f64, humidity: f64) -> RawRecord {
        RawRecord {
            timestamp,
            vertical,
            horizontal: -0.02,
            sensors: [SensorPair {
                temperature: 18.0,
                humidity,
            }; SENSOR_COUNT],
        }
    }

    fn series(n: usize) -> Vec<RawRecord> {
        (0..n)
            .map(|i| raw(ts(1, 0, 0) + Duration::minutes(30 * i as i64), -0.01, 55.0))
            .collect()
    }

    fn no_trim_config() -> CleanConfig {
        CleanConfig {
            correct_jumps: false,
            ..CleanConfig::default()
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        let cleaner = DataCleaner::new(CleanConfig::default());
        assert!(matches!(cleaner.clean(&[]), Err(CleanError::Empty)));
    }

    #[test]
    fn summer_window_shifts_all_but_the_last_two() {
        let config = CleanConfig {
            summer_start: ts(1, 2, 30),
            summer_end: ts(1, 6, 0),
            ..no_trim_config()
        };
        let cleaner = DataCleaner::new(config);

        // Samples at 02:00 .. 05:30; in-window ones are 03:00 .. 05:30.
        let raws: Vec<RawRecord> = (0..8)
            .map(|i| raw(ts(1, 2, 0) + Duration::minutes(30 * i), -0.01, 55.0))
            .collect();
        let stamps = cleaner.normalize_summer_time(&raws);

        assert_eq!(stamps[0], ts(1, 2, 0)); // before the window
        assert_eq!(stamps[1], ts(1, 2, 30)); // boundary is exclusive
        assert_eq!(stamps[2], ts(1, 2, 0)); // 03:00 shifted back
        assert_eq!(stamps[3], ts(1, 2, 30));
        assert_eq!(stamps[4], ts(1, 3, 0));
        assert_eq!(stamps[5], ts(1, 3, 30));
        assert_eq!(stamps[6], ts(1, 5, 0)); // last two in-window: untouched
        assert_eq!(stamps[7], ts(1, 5, 30));
    }

    #[test]
    fn derives_elapsed_time_and_differences() {
        let cleaner = DataCleaner::new(no_trim_config());
        let mut raws = series(3);
        raws[1].vertical = -0.03;
        let table = cleaner.clean(&raws).unwrap();

        let r = table.records();
        assert_eq!(r[0].minutes, 0.0);
        assert_eq!(r[1].minutes, 30.0);
        assert_eq!(r[2].days, 60.0 / 1440.0);
        // -0.01 * -10 = 0.1 mm, -0.03 * -10 = 0.3 mm
        assert!((r[1].vertical - 0.3).abs() < 1e-12);
        assert!((r[1].d_vertical - 0.2).abs() < 1e-12);
        assert_eq!(r[0].d_vertical, 0.0);
        assert_eq!(r[0].interval_mins, 0.0);
        assert_eq!(r[1].interval_mins, 30.0);
    }

    #[test]
    fn trim_drops_leading_rows_and_anchors_midnight() {
        // 60 samples every 30 min starting at 09:00: raw row 30 falls at
        // midnight, which is trimmed row 16 with drop_leading = 14.
        let raws: Vec<RawRecord> = (0..60)
            .map(|i| raw(ts(1, 9, 0) + Duration::minutes(30 * i), -0.01, 55.0))
            .collect();
        let cleaner = DataCleaner::new(CleanConfig::default());
        let table = cleaner.clean(&raws).unwrap();

        assert_eq!(table.len(), 60 - 14);
        let r = table.records();
        assert_eq!(r[0].timestamp, ts(1, 16, 0));
        assert_eq!(r[0].minutes, 0.0);
        // Midnight anchor sits at day 0; rows before it are slightly negative.
        assert!(r[16].days.abs() < 1e-12);
        assert!(r[0].days < 0.0);
        assert!(r.windows(2).all(|w| w[1].days > w[0].days));
        // Displacements re-zeroed to the first retained row.
        assert_eq!(r[0].vertical, 0.0);
        assert_eq!(r[0].horizontal, 0.0);
    }

    #[test]
    fn trim_requires_enough_rows() {
        let cleaner = DataCleaner::new(CleanConfig::default());
        let err = cleaner.clean(&series(20)).unwrap_err();
        assert!(matches!(err, CleanError::TooShort { got: 20, need: 30 }));
    }

    #[test]
    fn humidity_filter_drops_implausible_rows() {
        let cleaner = DataCleaner::new(no_trim_config());
        let mut raws = series(5);
        raws[2].sensors = [SensorPair {
            temperature: 18.0,
            humidity: 150.0,
        }; SENSOR_COUNT];
        let table = cleaner.clean(&raws).unwrap();

        assert_eq!(table.len(), 4);
        assert!(table.records().iter().all(|r| r.humidity_avg < 100.0));
        // Order of the remainder preserved.
        assert!(table
            .records()
            .windows(2)
            .all(|w| w[1].timestamp > w[0].timestamp));
    }

    #[test]
    fn boundary_humidity_row_is_dropped() {
        let cleaner = DataCleaner::new(no_trim_config());
        let mut raws = series(3);
        raws[1].sensors = [SensorPair {
            temperature: 18.0,
            humidity: 100.0,
        }; SENSOR_COUNT];
        let table = cleaner.clean(&raws).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn reset_is_corrected_end_to_end() {
        // Scaled values (× -10): 0.10, 0.12, ..., reset at row 40 snaps the
        // reading back near zero.
        let mut raws: Vec<RawRecord> = (0..60)
            .map(|i| {
                let grow = -0.01 - 0.0005 * i as f64; // scaled: 0.1 + 0.005*i
                raw(ts(1, 9, 0) + Duration::minutes(30 * i), grow, 55.0)
            })
            .collect();
        for (i, r) in raws.iter_mut().enumerate().skip(40) {
            r.vertical = -0.0005 * (i - 40) as f64; // scaled: restart near 0
        }

        let cleaner = DataCleaner::new(CleanConfig::default());
        let table = cleaner.clean(&raws).unwrap();

        // No residual step anywhere near the threshold.
        let vertical = table.column(|r| r.vertical);
        assert!(vertical
            .windows(2)
            .all(|w| (w[1] - w[0]).abs() < 0.25));
        // The cumulative trend keeps growing across the reset.
        assert!(vertical.last().unwrap() > &vertical[20]);
    }
}

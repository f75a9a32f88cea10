//! Statistics Calculator Module
//! Percentage displacement series, rolling statistics and the
//! humidity-binned displacement response.

use rayon::prelude::*;
use statrs::statistics::Statistics;

use crate::config::AnalysisConfig;
use crate::data::table::SensorTable;

/// Displacement expressed as a percentage of the artifact's physical extent,
/// re-zeroed to the series minimum, alongside the humidity average driving it.
#[derive(Debug, Clone)]
pub struct PercentSeries {
    pub humidity: Vec<f64>,
    pub vertical: Vec<f64>,
    pub horizontal: Vec<f64>,
}

impl PercentSeries {
    pub fn from_table(table: &SensorTable, config: &AnalysisConfig) -> Self {
        let vertical = to_percent(&table.column(|r| r.vertical), config.vertical_extent_mm);
        let horizontal = to_percent(&table.column(|r| r.horizontal), config.horizontal_extent_mm);
        Self {
            humidity: table.column(|r| r.humidity_avg),
            vertical,
            horizontal,
        }
    }

    pub fn len(&self) -> usize {
        self.humidity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.humidity.is_empty()
    }
}

fn to_percent(values: &[f64], extent_mm: f64) -> Vec<f64> {
    let percent: Vec<f64> = values.iter().map(|v| v / extent_mm * 100.0).collect();
    let min = percent
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::INFINITY, f64::min);
    if !min.is_finite() {
        return percent;
    }
    percent.iter().map(|v| v - min).collect()
}

/// Trailing rolling mean; the first `window - 1` entries are NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = sum / window as f64;
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        out[i] = sum / window as f64;
    }
    out
}

/// Trailing rolling sample standard deviation; NaN until the window fills.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }
    for i in (window - 1)..values.len() {
        out[i] = values[i + 1 - window..=i].iter().std_dev();
    }
    out
}

/// Per-sample deviation from the trailing rolling mean: the color axis of the
/// time-windowed scatter analysis.
pub fn rolling_delta(values: &[f64], window: usize) -> Vec<f64> {
    rolling_mean(values, window)
        .iter()
        .zip(values)
        .map(|(mean, v)| v - mean)
        .collect()
}

/// Aggregates of the percentage displacement inside one humidity bin.
#[derive(Debug, Clone)]
pub struct HumidityBin {
    /// Bin center, % relative humidity.
    pub humidity: f64,
    pub count: usize,
    pub vertical_mean: f64,
    /// `n_sigma` × population standard deviation.
    pub vertical_spread: f64,
    pub horizontal_mean: f64,
    pub horizontal_spread: f64,
}

/// Percentage change of each channel across the binned humidity range.
#[derive(Debug, Clone)]
pub struct DisplacementResponse {
    pub humidity_low: f64,
    pub humidity_high: f64,
    pub vertical_change: f64,
    pub vertical_uncertainty: f64,
    pub horizontal_change: f64,
    pub horizontal_uncertainty: f64,
}

impl DisplacementResponse {
    /// Format as a multi-line report string.
    pub fn report(&self) -> String {
        format!(
            "Displacement response over {:.0}-{:.0}% RH:\n  Horizontal: {:.2} +/- {:.2} %\n  Vertical:   {:.2} +/- {:.2} %\n",
            self.humidity_low,
            self.humidity_high,
            self.horizontal_change,
            self.horizontal_uncertainty,
            self.vertical_change,
            self.vertical_uncertainty,
        )
    }
}

/// Handles the derived statistics with per-bin parallelism.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Bin the percentage series by humidity average. Bin centers run from
    /// `rh_min + width` to `rh_max` inclusive, one per `rh_bin_width`.
    pub fn humidity_bins(series: &PercentSeries, config: &AnalysisConfig) -> Vec<HumidityBin> {
        let n = ((config.rh_max - config.rh_min) / config.rh_bin_width).round() as usize;
        let centers: Vec<f64> = (0..n)
            .map(|k| config.rh_min + config.rh_bin_width * (k as f64 + 1.0))
            .collect();

        centers
            .par_iter()
            .map(|&center| Self::bin_at(series, center, config))
            .collect()
    }

    fn bin_at(series: &PercentSeries, center: f64, config: &AnalysisConfig) -> HumidityBin {
        let half = 0.5 * config.rh_bin_width;
        let indices: Vec<usize> = series
            .humidity
            .iter()
            .enumerate()
            .filter(|(_, rv)| **rv > center - half && **rv < center + half)
            .map(|(i, _)| i)
            .collect();

        let vertical: Vec<f64> = indices.iter().map(|&i| series.vertical[i]).collect();
        let horizontal: Vec<f64> = indices.iter().map(|&i| series.horizontal[i]).collect();

        HumidityBin {
            humidity: center,
            count: indices.len(),
            vertical_mean: vertical.iter().mean(),
            vertical_spread: config.n_sigma * vertical.iter().population_std_dev(),
            horizontal_mean: horizontal.iter().mean(),
            horizontal_spread: config.n_sigma * horizontal.iter().population_std_dev(),
        }
    }

    /// Percentage change between the highest and lowest humidity bin, with
    /// the mean bin spread propagated in quadrature.
    pub fn displacement_response(bins: &[HumidityBin]) -> Option<DisplacementResponse> {
        let first = bins.first()?;
        let last = bins.last()?;

        let mean_spread = |pick: fn(&HumidityBin) -> f64| -> f64 {
            let spreads: Vec<f64> = bins.iter().map(pick).filter(|s| s.is_finite()).collect();
            spreads.iter().mean()
        };
        let vertical_spread = mean_spread(|b| b.vertical_spread);
        let horizontal_spread = mean_spread(|b| b.horizontal_spread);

        Some(DisplacementResponse {
            humidity_low: first.humidity,
            humidity_high: last.humidity,
            vertical_change: last.vertical_mean - first.vertical_mean,
            vertical_uncertainty: (2.0 * vertical_spread.powi(2)).sqrt(),
            horizontal_change: last.horizontal_mean - first.horizontal_mean,
            horizontal_uncertainty: (2.0 * horizontal_spread.powi(2)).sqrt(),
        })
    }
}

/// Descriptive statistics for one series, NaN-filtered.
#[derive(Debug, Clone)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl SeriesStats {
    pub fn compute(values: &[f64]) -> Option<Self> {
        let vals: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if vals.is_empty() {
            return None;
        }
        let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            count: vals.len(),
            min,
            max,
            mean: vals.iter().mean(),
            std_dev: vals.iter().population_std_dev(),
        })
    }

    pub fn report(&self, label: &str) -> String {
        format!(
            "{}:\n  Count: {}\n  Min: {:.3}\n  Max: {:.3}\n  Mean: {:.3}\n  Std Dev: {:.3}\n",
            label, self.count, self.min, self.max, self.mean, self.std_dev
        )
    }
}

//! Stats module - derived analysis series

mod calculator;

pub use calculator::{
    rolling_delta, rolling_mean, rolling_std, DisplacementResponse, HumidityBin, PercentSeries,
    SeriesStats, StatsCalculator,
};

//! hygrotrace - sensor log cleaning & displacement analysis pipeline
//!
//! Batch runner: load the log, clean it, print the derived analysis.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::Level;

use hygrotrace::stats::{PercentSeries, SeriesStats, StatsCalculator};
use hygrotrace::Config;

const DEFAULT_LOG: &str = "data/log_20220315.csv";

fn main() -> Result<()> {
    let mut log_path = PathBuf::from(DEFAULT_LOG);
    let mut config_path: Option<PathBuf> = None;
    let mut correct = true;
    let mut verbose = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--raw" => correct = false,
            "--verbose" | "-v" => verbose = true,
            "--config" => {
                let path = args.next().context("--config needs a file path")?;
                config_path = Some(PathBuf::from(path));
            }
            flag if flag.starts_with('-') => bail!("unknown flag {flag}"),
            path => log_path = PathBuf::from(path),
        }
    }

    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let mut config = match &config_path {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    config.clean.correct_jumps = correct;

    let table = hygrotrace::load(&log_path, &config.clean)
        .with_context(|| format!("processing {}", log_path.display()))?;

    let df = table.to_dataframe().context("building dataframe")?;
    println!("{}", df.head(Some(10)));
    println!("{} cleaned records\n", table.len());

    let series = PercentSeries::from_table(&table, &config.analysis);
    if let Some(stats) = SeriesStats::compute(&series.vertical) {
        print!("{}", stats.report("Vertical displacement (%)"));
    }
    if let Some(stats) = SeriesStats::compute(&series.horizontal) {
        print!("{}", stats.report("Horizontal displacement (%)"));
    }

    let bins = StatsCalculator::humidity_bins(&series, &config.analysis);
    if let Some(response) = StatsCalculator::displacement_response(&bins) {
        print!("{}", response.report());
    }

    Ok(())
}

//! Data module - log loading and cleaning

pub mod cleaner;
pub mod jumps;
pub mod loader;
pub mod table;

pub use cleaner::{CleanError, DataCleaner};
pub use loader::{load_log, LoaderError, RawRecord};
pub use table::{Record, SensorTable};

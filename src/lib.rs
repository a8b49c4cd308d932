// corona-tracker data core.
// Fetches, normalizes, and caches daily-cumulative time-series tables and
// resolves location selections into named series for the rendering layer.

pub mod app;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod select;
pub mod series;
pub mod table;

pub use app::{ChartView, Tracker};
pub use cache::{CacheHit, DatasetCache, DatasetSnapshot};
pub use catalog::{LocationCatalog, LocationEntry};
pub use config::Config;
pub use error::{Result, TrackerError};
pub use fetch::{Fetch, HttpFetcher, RawResource};
pub use select::{Selection, resolve};
pub use series::{AxisMode, Series, extract, extract_paired};
pub use table::{LocationRow, NormalizedTable, normalize};

// Runtime configuration: cache TTL and the dataset-to-URL mapping.
// Loaded from a JSON file, or built from defaults pointing at the JHU feed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default cache validity window in seconds.
pub const DEFAULT_TTL_SECS: u64 = 600;

const JHU_BASE: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series";

/// Configuration surface recognized by the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds a cached dataset stays valid.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Dataset key mapped to one or more CSV resource URLs.
    pub datasets: BTreeMap<String, Vec<String>>,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

impl Default for Config {
    fn default() -> Self {
        let mut datasets = BTreeMap::new();
        datasets.insert(
            "cases".to_string(),
            vec![format!("{JHU_BASE}/time_series_covid19_confirmed_global.csv")],
        );
        datasets.insert(
            "deaths".to_string(),
            vec![format!("{JHU_BASE}/time_series_covid19_deaths_global.csv")],
        );
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            datasets,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Cache TTL as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Default config file path (~/.config/corona-tracker/config.json on Linux).
pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "corona-tracker").map(|dirs| dirs.config_dir().join("config.json"))
}

// High-level facade tying cache, catalog, and extraction together.
// One Tracker per process; the web layer calls it on each UI event instead
// of sharing module-level mutable state.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::cache::{CacheHit, DatasetCache};
use crate::catalog::LocationCatalog;
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{DEFAULT_TIMEOUT, Fetch, HttpFetcher};
use crate::select::{Selection, resolve};
use crate::series::{AxisMode, Series, extract};

/// Chart-ready payload for the rendering layer.
#[derive(Debug)]
pub struct ChartView {
    pub series: Vec<Series>,
    /// Axis scale flag, passed through unmodified.
    pub axis: AxisMode,
    /// Set when the data came from a stale cache entry after a failed refresh.
    pub refresh_error: Option<crate::error::TrackerError>,
}

/// Process-wide entry point for the dashboard's data needs.
pub struct Tracker<F: Fetch = HttpFetcher> {
    cache: DatasetCache<F>,
    // One catalog per dataset, rebuilt whenever the snapshot generation
    // moves on.
    catalogs: Mutex<HashMap<String, LocationCatalog>>,
}

impl Tracker<HttpFetcher> {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_fetcher(HttpFetcher::new(DEFAULT_TIMEOUT)?, config))
    }
}

impl<F: Fetch> Tracker<F> {
    pub fn with_fetcher(fetcher: F, config: &Config) -> Self {
        Self {
            cache: DatasetCache::new(fetcher, config),
            catalogs: Mutex::new(HashMap::new()),
        }
    }

    /// Current location catalog for a dataset, for populating the selection
    /// control.
    pub async fn locations(&self, key: &str) -> Result<LocationCatalog> {
        let hit = self.cache.get(key).await?;
        Ok(self.catalog_for(key, &hit))
    }

    /// Series for the given selection, ready for the rendering layer. An
    /// empty selection yields an empty series list, the benign "no chart"
    /// state.
    ///
    /// `catalog` must be the catalog the selection's indices were computed
    /// against (the one `locations` handed the UI). If a refresh has changed
    /// the row set since, the call fails with `StaleCatalog` rather than
    /// letting the indices silently point at different rows.
    pub async fn chart(
        &self,
        key: &str,
        selection: &Selection,
        catalog: &LocationCatalog,
        axis: AxisMode,
    ) -> Result<ChartView> {
        let hit = self.cache.get(key).await?;
        let resolved = resolve(selection, catalog, hit.snapshot.generation())?;
        let series = extract(&resolved, hit.snapshot.primary())?;
        Ok(ChartView {
            series,
            axis,
            refresh_error: hit.refresh_error,
        })
    }

    /// Catalog matching the snapshot's generation, reusing the stored one
    /// when the generation is unchanged.
    fn catalog_for(&self, key: &str, hit: &CacheHit) -> LocationCatalog {
        let mut catalogs = self.catalogs.lock().expect("catalog map lock poisoned");
        if let Some(catalog) = catalogs.get(key) {
            if catalog.generation() == hit.snapshot.generation() {
                return catalog.clone();
            }
        }
        let catalog =
            LocationCatalog::build(hit.snapshot.primary(), hit.snapshot.generation());
        catalogs.insert(key.to_string(), catalog.clone());
        catalog
    }
}

// Memoized dataset cache over fetch + normalize.
// Handles TTL checking, per-key refresh serialization, and stale fallback.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::fetch::Fetch;
use crate::table::{NormalizedTable, normalize};

/// All tables of one dataset, produced by a single refresh.
///
/// Multi-resource datasets (e.g. cases plus deaths) are refreshed as one
/// unit, so a consumer never sees tables from different refreshes paired
/// together. The generation changes only when a refresh changes the location
/// row set, which lets stale selection state be detected downstream.
#[derive(Debug)]
pub struct DatasetSnapshot {
    tables: Vec<NormalizedTable>,
    generation: u64,
}

impl DatasetSnapshot {
    pub(crate) fn new(tables: Vec<NormalizedTable>, generation: u64) -> Self {
        debug_assert!(!tables.is_empty());
        Self { tables, generation }
    }

    /// All tables of the dataset, in configured URL order.
    pub fn tables(&self) -> &[NormalizedTable] {
        &self.tables
    }

    /// The first table; the one the location catalog is derived from.
    pub fn primary(&self) -> &NormalizedTable {
        &self.tables[0]
    }

    /// Refresh generation this snapshot belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of a cache lookup: the snapshot plus, when a refresh failed and a
/// stale entry was served instead, the error that refresh produced.
#[derive(Debug)]
pub struct CacheHit {
    pub snapshot: Arc<DatasetSnapshot>,
    pub refresh_error: Option<TrackerError>,
}

struct CacheEntry {
    snapshot: Arc<DatasetSnapshot>,
    cached_at: Instant,
}

impl CacheEntry {
    /// Valid while age < TTL; an entry exactly at the TTL is stale.
    fn is_valid(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() < ttl
    }
}

type Slot = Arc<AsyncMutex<Option<CacheEntry>>>;

/// TTL cache wrapping fetch + normalize, one slot per dataset key.
pub struct DatasetCache<F: Fetch> {
    fetcher: F,
    ttl: Duration,
    datasets: BTreeMap<String, Vec<String>>,
    // The outer lock is held only to look up or insert a slot, never across
    // a fetch, so unrelated keys refresh independently.
    slots: Mutex<HashMap<String, Slot>>,
}

impl<F: Fetch> DatasetCache<F> {
    pub fn new(fetcher: F, config: &Config) -> Self {
        Self {
            fetcher,
            ttl: config.ttl(),
            datasets: config.datasets.clone(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Get the dataset for `key`, refreshing when missing or expired.
    ///
    /// The per-key mutex is held across the refresh, so concurrent callers
    /// for the same key wait for the in-flight result instead of fetching
    /// again. A failed refresh never poisons the cache: a prior entry keeps
    /// being served with the failure reported alongside it.
    pub async fn get(&self, key: &str) -> Result<CacheHit> {
        let urls = self
            .datasets
            .get(key)
            .filter(|urls| !urls.is_empty())
            .ok_or_else(|| TrackerError::UnknownDataset(key.to_string()))?
            .clone();

        let slot = self.slot(key);
        let mut entry = slot.lock().await;

        if let Some(existing) = entry.as_ref() {
            if existing.is_valid(self.ttl) {
                debug!("cache hit for {key}");
                return Ok(CacheHit {
                    snapshot: Arc::clone(&existing.snapshot),
                    refresh_error: None,
                });
            }
        }

        debug!("refreshing dataset {key} ({} resources)", urls.len());
        let refreshed = self.refresh(&urls, entry.as_ref()).await;
        match refreshed {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *entry = Some(CacheEntry {
                    snapshot: Arc::clone(&snapshot),
                    cached_at: Instant::now(),
                });
                Ok(CacheHit {
                    snapshot,
                    refresh_error: None,
                })
            }
            Err(err) => match entry.as_ref() {
                Some(stale) => {
                    warn!("refresh of {key} failed, serving stale entry: {err}");
                    Ok(CacheHit {
                        snapshot: Arc::clone(&stale.snapshot),
                        refresh_error: Some(err),
                    })
                }
                None => Err(err),
            },
        }
    }

    /// Fetch and normalize every resource of a dataset as one unit.
    async fn refresh(&self, urls: &[String], prior: Option<&CacheEntry>) -> Result<DatasetSnapshot> {
        let mut tables = Vec::with_capacity(urls.len());
        for url in urls {
            let raw = self.fetcher.fetch(url).await?;
            tables.push(normalize(&raw.body)?);
        }

        // Row indices are external selection state: keep the generation when
        // the row set is unchanged so live selections stay valid.
        let generation = match prior {
            Some(entry) if entry.snapshot.primary().same_locations(&tables[0]) => {
                entry.snapshot.generation
            }
            Some(entry) => entry.snapshot.generation + 1,
            None => 0,
        };

        Ok(DatasetSnapshot::new(tables, generation))
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().expect("slot map lock poisoned");
        Arc::clone(slots.entry(key.to_string()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RawResource;
    use chrono::Utc;
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const CSV_TWO_ROWS: &str = "\
Province/State,Country/Region,1/22/20,1/23/20,1/24/20
,Italy,1,2,3
Hubei,China,5,6,7
";

    const CSV_THREE_ROWS: &str = "\
Province/State,Country/Region,1/22/20,1/23/20,1/24/20
,Italy,1,2,3
Hubei,China,5,6,7
,Spain,0,1,4
";

    /// In-memory fetcher that counts calls and can be told to fail.
    #[derive(Clone)]
    struct FakeFetcher {
        calls: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
        body: Arc<Mutex<String>>,
        delay: Duration,
        // When set, only URLs containing this substring are delayed.
        delay_filter: Option<String>,
    }

    impl FakeFetcher {
        fn new(body: &str) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                fail: Arc::new(AtomicBool::new(false)),
                body: Arc::new(Mutex::new(body.to_string())),
                delay: Duration::ZERO,
                delay_filter: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn with_delay_for(mut self, url_part: &str, delay: Duration) -> Self {
            self.delay = delay;
            self.delay_filter = Some(url_part.to_string());
            self
        }

        fn set_body(&self, body: &str) {
            *self.body.lock().unwrap() = body.to_string();
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetch for FakeFetcher {
        fn fetch(&self, url: &str) -> impl Future<Output = Result<RawResource>> + Send {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let delayed = self
                    .delay_filter
                    .as_ref()
                    .is_none_or(|part| url.contains(part.as_str()));
                if delayed && self.delay > Duration::ZERO {
                    tokio::time::sleep(self.delay).await;
                }
                if self.fail.load(Ordering::SeqCst) {
                    return Err(TrackerError::BadStatus {
                        status: 503,
                        url: url.to_string(),
                    });
                }
                Ok(RawResource {
                    url: url.to_string(),
                    body: self.body.lock().unwrap().clone(),
                    fetched_at: Utc::now(),
                })
            }
        }
    }

    fn config(ttl_secs: u64, urls_per_key: &[(&str, usize)]) -> Config {
        let mut datasets = BTreeMap::new();
        for (key, count) in urls_per_key {
            let urls = (0..*count)
                .map(|i| format!("http://localhost/{key}/{i}.csv"))
                .collect();
            datasets.insert(key.to_string(), urls);
        }
        Config { ttl_secs, datasets }
    }

    #[tokio::test]
    async fn test_second_get_within_ttl_does_no_io() {
        let fetcher = FakeFetcher::new(CSV_TWO_ROWS);
        let cache = DatasetCache::new(fetcher.clone(), &config(600, &[("cases", 1)]));

        let first = cache.get("cases").await.unwrap();
        let second = cache.get("cases").await.unwrap();

        assert_eq!(fetcher.call_count(), 1);
        assert!(Arc::ptr_eq(&first.snapshot, &second.snapshot));
        assert_eq!(first.snapshot.generation(), 0);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_one_refetch() {
        let fetcher = FakeFetcher::new(CSV_TWO_ROWS);
        // TTL of zero means every get sees an expired entry.
        let cache = DatasetCache::new(fetcher.clone(), &config(0, &[("cases", 1)]));

        cache.get("cases").await.unwrap();
        cache.get("cases").await.unwrap();

        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_cold_gets_fetch_once() {
        let fetcher = FakeFetcher::new(CSV_TWO_ROWS).with_delay(Duration::from_millis(50));
        let cache = Arc::new(DatasetCache::new(
            fetcher.clone(),
            &config(600, &[("cases", 1)]),
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.get("cases").await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_serves_stale_entry() {
        let fetcher = FakeFetcher::new(CSV_TWO_ROWS);
        let cache = DatasetCache::new(fetcher.clone(), &config(0, &[("cases", 1)]));

        let first = cache.get("cases").await.unwrap();
        assert!(first.refresh_error.is_none());

        fetcher.fail.store(true, Ordering::SeqCst);
        let second = cache.get("cases").await.unwrap();

        assert!(Arc::ptr_eq(&first.snapshot, &second.snapshot));
        assert!(matches!(
            second.refresh_error,
            Some(TrackerError::BadStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_refresh_without_prior_entry_propagates() {
        let fetcher = FakeFetcher::new(CSV_TWO_ROWS);
        fetcher.fail.store(true, Ordering::SeqCst);
        let cache = DatasetCache::new(fetcher.clone(), &config(600, &[("cases", 1)]));

        assert!(cache.get("cases").await.is_err());

        // Nothing was stored, so recovery works once the source is back.
        fetcher.fail.store(false, Ordering::SeqCst);
        let hit = cache.get("cases").await.unwrap();
        assert!(hit.refresh_error.is_none());
        assert_eq!(hit.snapshot.primary().len(), 2);
    }

    #[tokio::test]
    async fn test_generation_bumps_only_when_rows_change() {
        let fetcher = FakeFetcher::new(CSV_TWO_ROWS);
        let cache = DatasetCache::new(fetcher.clone(), &config(0, &[("cases", 1)]));

        let first = cache.get("cases").await.unwrap();
        assert_eq!(first.snapshot.generation(), 0);

        // Same rows on refresh: generation holds, selections stay valid.
        let second = cache.get("cases").await.unwrap();
        assert_eq!(second.snapshot.generation(), 0);

        fetcher.set_body(CSV_THREE_ROWS);
        let third = cache.get("cases").await.unwrap();
        assert_eq!(third.snapshot.generation(), 1);
        assert_eq!(third.snapshot.primary().len(), 3);

        let fourth = cache.get("cases").await.unwrap();
        assert_eq!(fourth.snapshot.generation(), 1);
    }

    #[tokio::test]
    async fn test_multi_resource_dataset_refreshes_as_one_unit() {
        let fetcher = FakeFetcher::new(CSV_TWO_ROWS);
        let cache = DatasetCache::new(fetcher.clone(), &config(600, &[("combined", 2)]));

        let hit = cache.get("combined").await.unwrap();
        assert_eq!(hit.snapshot.tables().len(), 2);
        assert_eq!(fetcher.call_count(), 2);

        // Both tables come from the same snapshot; a hit does no further I/O.
        cache.get("combined").await.unwrap();
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_key_fails() {
        let fetcher = FakeFetcher::new(CSV_TWO_ROWS);
        let cache = DatasetCache::new(fetcher, &config(600, &[("cases", 1)]));

        let err = cache.get("recovered").await.unwrap_err();
        assert!(matches!(err, TrackerError::UnknownDataset(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_in_flight_refresh_does_not_block_other_keys() {
        let fetcher =
            FakeFetcher::new(CSV_TWO_ROWS).with_delay_for("cases", Duration::from_millis(300));
        let cache = Arc::new(DatasetCache::new(
            fetcher.clone(),
            &config(600, &[("cases", 1), ("deaths", 1)]),
        ));

        let slow = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get("cases").await })
        };
        // Give the cases fetch time to start sleeping under its slot lock.
        tokio::time::sleep(Duration::from_millis(30)).await;

        let started = Instant::now();
        cache.get("deaths").await.unwrap();
        assert!(
            started.elapsed() < Duration::from_millis(150),
            "get for an unrelated key waited on the in-flight refresh"
        );
        assert_eq!(fetcher.call_count(), 2);

        slow.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_independent_keys_have_independent_entries() {
        let fetcher = FakeFetcher::new(CSV_TWO_ROWS);
        let cache = DatasetCache::new(
            fetcher.clone(),
            &config(600, &[("cases", 1), ("deaths", 1)]),
        );

        cache.get("cases").await.unwrap();
        cache.get("deaths").await.unwrap();
        cache.get("cases").await.unwrap();

        assert_eq!(fetcher.call_count(), 2);
    }
}

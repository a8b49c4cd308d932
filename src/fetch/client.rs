// HTTP fetcher for remote CSV resources.
// Maps network failures and non-2xx statuses to transport errors.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;

use crate::error::{Result, TrackerError};

/// Default request timeout, bounding worst-case blocking during a refresh.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "corona-tracker";

/// A fetched resource: raw text plus its origin and fetch time.
/// Ephemeral; discarded once parsed into a table.
#[derive(Debug, Clone)]
pub struct RawResource {
    pub url: String,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

/// Source of raw delimited-text resources. The cache is generic over this
/// so tests can substitute an in-memory fetcher.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<RawResource>> + Send;
}

/// Fetcher backed by a reqwest client with a fixed timeout. No retries.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(TrackerError::Transport)?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<RawResource>> + Send {
        async move {
            debug!("fetching {url}");
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TrackerError::BadStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
            let body = response.text().await?;
            Ok(RawResource {
                url: url.to_string(),
                body,
                fetched_at: Utc::now(),
            })
        }
    }
}

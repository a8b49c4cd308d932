// Resource fetching over HTTP.
// A thin, retry-free I/O primitive; refresh policy lives in the cache layer.

pub mod client;

pub use client::{DEFAULT_TIMEOUT, Fetch, HttpFetcher, RawResource};

// Memoized dataset cache.
// One shared snapshot per dataset per TTL window; refreshes serialized per key.

pub mod store;

pub use store::{CacheHit, DatasetCache, DatasetSnapshot};

//! In-process content caching.
//!
//! This module is the per-session cache tier:
//! - `QueryStore` holds one entry per page key with TTL freshness and gc
//! - `ContentCache` decides serve/revalidate/fetch and coalesces misses
//! - `Prefetcher` warms entries ahead of navigation on user intent

mod controller;
mod prefetch;
mod store;

pub use controller::ContentCache;
pub use prefetch::{PrefetchOutcome, Prefetcher};
pub use store::{CacheEntry, CacheHit, QueryStore};

//! Intent-driven cache warmup.
//!
//! Navigation affordances report hover intent; the scheduler warms the
//! query cache ahead of the actual navigation so the page-load fetch is a
//! hit. Prefetching is advisory: spawned fetch failures are logged, never
//! surfaced, and an in-flight prefetch is never cancelled - it may still
//! populate the cache for a later visit.

use color_eyre::Result;
use tracing::{debug, warn};

use crate::content::PageKey;

use super::controller::ContentCache;

/// What a prefetch request decided to do.
///
/// Returned so failure visibility is the caller's choice rather than a
/// logging side effect; most callers ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchOutcome {
  /// A fresh entry already covers this key; no fetch was issued.
  AlreadyFresh,
  /// A background fetch was scheduled.
  Scheduled,
}

/// Warms the query cache on user intent signals.
pub struct Prefetcher {
  cache: ContentCache,
}

impl Prefetcher {
  pub fn new(cache: ContentCache) -> Self {
    Self { cache }
  }

  /// Handle a navigation-intent signal for a path segment.
  ///
  /// An unmapped segment is a registry/caller mismatch and fails loudly.
  pub fn on_intent(&self, segment: &str) -> Result<PrefetchOutcome> {
    let key = PageKey::from_intent(segment)?;
    self.prefetch(key)
  }

  /// Warm the cache for `key` unless a fresh entry already exists.
  pub fn prefetch(&self, key: PageKey) -> Result<PrefetchOutcome> {
    if self.cache.has_fresh(key)? {
      debug!(key = %key, "Prefetch skipped, cache is fresh");
      return Ok(PrefetchOutcome::AlreadyFresh);
    }

    debug!(key = %key, "Prefetch scheduled");
    let cache = self.cache.clone();
    tokio::spawn(async move {
      if let Err(e) = cache.ensure(key).await {
        // Advisory only - the eventual navigation will retry and report
        warn!(key = %key, error = %e, "Prefetch failed");
      }
    });

    Ok(PrefetchOutcome::Scheduled)
  }
}

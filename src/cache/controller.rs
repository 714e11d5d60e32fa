//! Content cache controller: lookup-or-fetch with request coalescing.
//!
//! Sits between page rendering and the content store. A fresh hit returns
//! immediately with no network activity; a stale hit returns immediately
//! and revalidates in the background; a miss fetches through the store
//! boundary. Concurrent misses for the same key share a single in-flight
//! fetch, so at most one fetch per key is running at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use crate::content::{ContentFetcher, ContentPayload, PageKey};

use super::store::{CacheHit, QueryStore};

/// In-flight fetches carry their error as a String so the result can be
/// cloned to every waiter; callers rehydrate it into a report.
type SharedFetch = Shared<BoxFuture<'static, Result<ContentPayload, String>>>;

/// Facade over the query store and the content fetcher.
///
/// Explicitly constructed and owned - there is no ambient global cache.
/// Cloning is cheap and shares the same store and in-flight state.
pub struct ContentCache {
  store: Arc<QueryStore>,
  fetcher: Arc<dyn ContentFetcher>,
  in_flight: Arc<Mutex<HashMap<PageKey, SharedFetch>>>,
}

impl ContentCache {
  pub fn new(store: Arc<QueryStore>, fetcher: Arc<dyn ContentFetcher>) -> Self {
    Self {
      store,
      fetcher,
      in_flight: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Return the content for `key`, fetching it if the cache cannot serve.
  ///
  /// Fetch failures propagate to the caller and are not cached; the next
  /// call for the same key retries.
  pub async fn ensure(&self, key: PageKey) -> Result<ContentPayload> {
    if let Some(hit) = self.store.get(key)? {
      if hit.is_stale {
        debug!(key = %key, "Stale cache hit, revalidating in background");
        self.spawn_revalidate(key);
      } else {
        debug!(key = %key, "Fresh cache hit");
      }
      return Ok(hit.payload);
    }

    debug!(key = %key, "Cache miss, fetching");
    let fetch = self.join_or_start_fetch(key)?;
    let result = fetch.await;
    self.finish_fetch(key);

    result.map_err(|e| eyre!("Failed to fetch content for {}: {}", key, e))
  }

  /// Look at the cache without triggering any fetch.
  pub fn peek(&self, key: PageKey) -> Result<Option<CacheHit>> {
    self.store.get(key)
  }

  /// Whether the cache would serve `key` without fetching.
  pub fn has(&self, key: PageKey) -> Result<bool> {
    self.store.has(key)
  }

  /// Whether the cache holds a fresh (not yet stale) entry for `key`.
  pub fn has_fresh(&self, key: PageKey) -> Result<bool> {
    Ok(matches!(self.store.get(key)?, Some(hit) if !hit.is_stale))
  }

  /// Keys currently resident in the query store.
  pub fn cached_keys(&self) -> Result<Vec<PageKey>> {
    self.store.keys()
  }

  pub fn invalidate(&self, key: PageKey) -> Result<()> {
    self.store.remove(key)
  }

  pub fn invalidate_all(&self) -> Result<()> {
    self.store.remove_all()
  }

  /// Join the in-flight fetch for `key`, starting one if none is running.
  fn join_or_start_fetch(&self, key: PageKey) -> Result<SharedFetch> {
    let mut in_flight = self
      .in_flight
      .lock()
      .map_err(|e| eyre!("In-flight map lock poisoned: {}", e))?;

    if let Some(fetch) = in_flight.get(&key) {
      debug!(key = %key, "Joining in-flight fetch");
      return Ok(fetch.clone());
    }

    let store = Arc::clone(&self.store);
    let fetcher = Arc::clone(&self.fetcher);
    let fetch = async move {
      let payload = fetcher.fetch(key).await.map_err(|e| e.to_string())?;
      // Boundary check: the store must answer with the surface we asked for
      if payload.key() != key {
        return Err(format!(
          "content store returned a {} payload for key {}",
          payload.key(),
          key
        ));
      }
      store.set(key, payload.clone()).map_err(|e| e.to_string())?;
      Ok(payload)
    }
    .boxed()
    .shared();

    in_flight.insert(key, fetch.clone());
    Ok(fetch)
  }

  /// Drop the in-flight entry once its fetch has settled.
  fn finish_fetch(&self, key: PageKey) {
    if let Ok(mut in_flight) = self.in_flight.lock() {
      in_flight.remove(&key);
    }
  }

  /// Detached refresh of a stale entry. Completion is observed only through
  /// the store; failures keep the stale entry and are logged.
  fn spawn_revalidate(&self, key: PageKey) {
    let cache = self.clone();
    tokio::spawn(async move {
      let fetch = match cache.join_or_start_fetch(key) {
        Ok(fetch) => fetch,
        Err(e) => {
          warn!(key = %key, error = %e, "Could not start revalidation");
          return;
        }
      };
      let result = fetch.await;
      cache.finish_fetch(key);
      if let Err(e) = result {
        warn!(key = %key, error = %e, "Background revalidation failed");
      }
    });
  }
}

impl Clone for ContentCache {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      fetcher: Arc::clone(&self.fetcher),
      in_flight: Arc::clone(&self.in_flight),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration as StdDuration;

  use chrono::Duration;

  use super::*;
  use crate::cache::store::QueryStore;
  use crate::content::{ContactContent, SiteSettings};

  /// Fetcher double: counts calls, optionally delays, fails the first N
  /// calls, and can answer with a payload that does not match the key.
  struct FakeFetcher {
    calls: AtomicUsize,
    delay_ms: u64,
    fail_first: usize,
    wrong_variant: bool,
  }

  impl FakeFetcher {
    fn new() -> Self {
      Self {
        calls: AtomicUsize::new(0),
        delay_ms: 0,
        fail_first: 0,
        wrong_variant: false,
      }
    }

    fn call_count(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  fn settings(title: &str) -> ContentPayload {
    ContentPayload::Settings(SiteSettings {
      title: title.to_string(),
      nav: Vec::new(),
      footer_text: None,
    })
  }

  impl ContentFetcher for FakeFetcher {
    fn fetch(&self, _key: PageKey) -> BoxFuture<'_, Result<ContentPayload>> {
      Box::pin(async move {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.delay_ms > 0 {
          tokio::time::sleep(StdDuration::from_millis(self.delay_ms)).await;
        }
        if n <= self.fail_first {
          return Err(eyre!("store unreachable"));
        }
        if self.wrong_variant {
          return Ok(ContentPayload::Contact(ContactContent {
            heading: "oops".to_string(),
            email: "oops@example.org".to_string(),
            phone: None,
            address: None,
          }));
        }
        Ok(settings(&format!("v{}", n)))
      })
    }
  }

  fn cache_with(fetcher: FakeFetcher, stale: Duration, collect: Duration) -> (ContentCache, Arc<FakeFetcher>) {
    let store = Arc::new(QueryStore::with_windows(stale, collect).unwrap());
    let fetcher = Arc::new(fetcher);
    let handle = Arc::clone(&fetcher);
    let cache = ContentCache::new(store, fetcher);
    (cache, handle)
  }

  #[tokio::test]
  async fn test_ensure_fetches_once_across_calls() {
    let (cache, fetcher) = cache_with(FakeFetcher::new(), Duration::hours(1), Duration::hours(2));

    let first = cache.ensure(PageKey::SiteSettings).await.unwrap();
    let second = cache.ensure(PageKey::SiteSettings).await.unwrap();

    assert_eq!(first, settings("v1"));
    assert_eq!(second, settings("v1"));
    assert_eq!(fetcher.call_count(), 1);
  }

  #[tokio::test]
  async fn test_concurrent_ensures_share_one_fetch() {
    let fetcher = FakeFetcher {
      delay_ms: 50,
      ..FakeFetcher::new()
    };
    let (cache, fetcher) = cache_with(fetcher, Duration::hours(1), Duration::hours(2));

    let (a, b) = tokio::join!(
      cache.ensure(PageKey::SiteSettings),
      cache.ensure(PageKey::SiteSettings)
    );

    assert_eq!(a.unwrap(), settings("v1"));
    assert_eq!(b.unwrap(), settings("v1"));
    assert_eq!(fetcher.call_count(), 1);
  }

  #[tokio::test]
  async fn test_fetch_failure_is_not_memoized() {
    let fetcher = FakeFetcher {
      fail_first: 1,
      ..FakeFetcher::new()
    };
    let (cache, fetcher) = cache_with(fetcher, Duration::hours(1), Duration::hours(2));

    assert!(cache.ensure(PageKey::SiteSettings).await.is_err());
    // Nothing was cached, so the next call retries and succeeds
    let payload = cache.ensure(PageKey::SiteSettings).await.unwrap();
    assert_eq!(payload, settings("v2"));
    assert_eq!(fetcher.call_count(), 2);
  }

  #[tokio::test]
  async fn test_stale_hit_serves_old_then_revalidates() {
    let (cache, fetcher) = cache_with(FakeFetcher::new(), Duration::zero(), Duration::hours(1));

    let first = cache.ensure(PageKey::SiteSettings).await.unwrap();
    assert_eq!(first, settings("v1"));

    // Immediately stale: the hit serves the old payload right away
    let second = cache.ensure(PageKey::SiteSettings).await.unwrap();
    assert_eq!(second, settings("v1"));

    // ... while the detached revalidation overwrites the entry
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    let hit = cache.peek(PageKey::SiteSettings).unwrap().expect("entry");
    assert_eq!(hit.payload, settings("v2"));
    assert_eq!(fetcher.call_count(), 2);
  }

  #[tokio::test]
  async fn test_mismatched_payload_is_rejected() {
    let fetcher = FakeFetcher {
      wrong_variant: true,
      ..FakeFetcher::new()
    };
    let (cache, _fetcher) = cache_with(fetcher, Duration::hours(1), Duration::hours(2));

    let err = cache.ensure(PageKey::HomePage).await.unwrap_err();
    assert!(err.to_string().contains("contactPage"));
    assert!(!cache.has(PageKey::HomePage).unwrap());
  }

  #[tokio::test]
  async fn test_invalidation_and_listing() {
    let (cache, _fetcher) = cache_with(FakeFetcher::new(), Duration::hours(1), Duration::hours(2));

    cache.ensure(PageKey::SiteSettings).await.unwrap();
    assert_eq!(cache.cached_keys().unwrap(), vec![PageKey::SiteSettings]);

    cache.invalidate(PageKey::SiteSettings).unwrap();
    assert!(!cache.has(PageKey::SiteSettings).unwrap());

    cache.ensure(PageKey::SiteSettings).await.unwrap();
    cache.invalidate_all().unwrap();
    assert!(cache.cached_keys().unwrap().is_empty());
  }
}

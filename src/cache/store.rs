//! In-process query cache storage.
//!
//! One entry per page key, freshness decided by two windows measured from
//! `stored_at`: past `stale_after` a hit still serves but is flagged stale;
//! past `collect_after` the entry is a miss and is discarded.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};

use crate::config::FreshnessConfig;
use crate::content::{ContentPayload, PageKey};

/// A single cached content object.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub payload: ContentPayload,
  pub stored_at: DateTime<Utc>,
}

/// Result of a successful cache lookup.
#[derive(Debug, Clone)]
pub struct CacheHit {
  pub payload: ContentPayload,
  pub stored_at: DateTime<Utc>,
  /// Past the stale window: still serveable, but should be revalidated
  pub is_stale: bool,
}

/// In-memory store for fetched page content, keyed by page identity.
///
/// Lives for one client session; writes are unconditional last-write-wins.
pub struct QueryStore {
  entries: Mutex<HashMap<PageKey, CacheEntry>>,
  stale_after: Duration,
  collect_after: Duration,
}

impl QueryStore {
  /// Create a store with the configured freshness windows.
  pub fn new(freshness: &FreshnessConfig) -> Result<Self> {
    Self::with_windows(
      Duration::seconds(freshness.stale_after_secs as i64),
      Duration::seconds(freshness.collect_after_secs as i64),
    )
  }

  /// Create a store with explicit windows. `collect_after` must not be
  /// shorter than `stale_after`.
  pub fn with_windows(stale_after: Duration, collect_after: Duration) -> Result<Self> {
    if collect_after < stale_after {
      return Err(eyre!(
        "collect_after ({}) must be >= stale_after ({})",
        collect_after,
        stale_after
      ));
    }
    Ok(Self {
      entries: Mutex::new(HashMap::new()),
      stale_after,
      collect_after,
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, HashMap<PageKey, CacheEntry>>> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Cache lock poisoned: {}", e))
  }

  /// Look up a key. Entries past the collect window are discarded on
  /// observation and reported as a miss.
  pub fn get(&self, key: PageKey) -> Result<Option<CacheHit>> {
    let mut entries = self.lock()?;

    let hit = match entries.get(&key) {
      None => return Ok(None),
      Some(entry) => {
        let age = Utc::now() - entry.stored_at;
        if age >= self.collect_after {
          None
        } else {
          Some(CacheHit {
            payload: entry.payload.clone(),
            stored_at: entry.stored_at,
            is_stale: age >= self.stale_after,
          })
        }
      }
    };

    if hit.is_none() {
      entries.remove(&key);
    }
    Ok(hit)
  }

  /// Store a payload, unconditionally overwriting any previous entry.
  pub fn set(&self, key: PageKey, payload: ContentPayload) -> Result<()> {
    let mut entries = self.lock()?;
    entries.insert(
      key,
      CacheEntry {
        payload,
        stored_at: Utc::now(),
      },
    );
    Ok(())
  }

  /// Whether a lookup for `key` would hit.
  pub fn has(&self, key: PageKey) -> Result<bool> {
    Ok(self.get(key)?.is_some())
  }

  pub fn remove(&self, key: PageKey) -> Result<()> {
    self.lock()?.remove(&key);
    Ok(())
  }

  pub fn remove_all(&self) -> Result<()> {
    self.lock()?.clear();
    Ok(())
  }

  /// Keys with live (non-collected) entries.
  pub fn keys(&self) -> Result<Vec<PageKey>> {
    let now = Utc::now();
    let entries = self.lock()?;
    Ok(
      entries
        .iter()
        .filter(|(_, entry)| now - entry.stored_at < self.collect_after)
        .map(|(key, _)| *key)
        .collect(),
    )
  }

  /// Sweep every entry past the collect window. Returns how many were
  /// dropped.
  pub fn gc(&self) -> Result<usize> {
    let now = Utc::now();
    let mut entries = self.lock()?;
    let before = entries.len();
    entries.retain(|_, entry| now - entry.stored_at < self.collect_after);
    Ok(before - entries.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::content::{ContactContent, SiteSettings};

  fn sample_payload() -> ContentPayload {
    ContentPayload::Contact(ContactContent {
      heading: "Contact".to_string(),
      email: "hello@example.org".to_string(),
      phone: None,
      address: None,
    })
  }

  fn settings_payload(title: &str) -> ContentPayload {
    ContentPayload::Settings(SiteSettings {
      title: title.to_string(),
      nav: Vec::new(),
      footer_text: None,
    })
  }

  #[test]
  fn hit_within_collect_window() {
    let store = QueryStore::with_windows(Duration::hours(1), Duration::hours(2)).unwrap();

    assert!(store.get(PageKey::ContactPage).unwrap().is_none());

    store.set(PageKey::ContactPage, sample_payload()).unwrap();

    let hit = store.get(PageKey::ContactPage).unwrap().expect("cached entry");
    assert_eq!(hit.payload, sample_payload());
    assert!(!hit.is_stale);
    assert!(store.has(PageKey::ContactPage).unwrap());
  }

  #[test]
  fn stale_entry_still_serves_but_is_flagged() {
    let store = QueryStore::with_windows(Duration::zero(), Duration::hours(1)).unwrap();

    store.set(PageKey::ContactPage, sample_payload()).unwrap();

    let hit = store.get(PageKey::ContactPage).unwrap().expect("cached entry");
    assert!(hit.is_stale);
  }

  #[test]
  fn collected_entry_is_a_miss() {
    let store = QueryStore::with_windows(Duration::zero(), Duration::zero()).unwrap();

    store.set(PageKey::ContactPage, sample_payload()).unwrap();

    assert!(store.get(PageKey::ContactPage).unwrap().is_none());
    assert!(!store.has(PageKey::ContactPage).unwrap());
  }

  #[test]
  fn set_overwrites_unconditionally() {
    let store = QueryStore::with_windows(Duration::hours(1), Duration::hours(2)).unwrap();

    store
      .set(PageKey::SiteSettings, settings_payload("first"))
      .unwrap();
    store
      .set(PageKey::SiteSettings, settings_payload("second"))
      .unwrap();

    let hit = store.get(PageKey::SiteSettings).unwrap().expect("cached entry");
    assert_eq!(hit.payload, settings_payload("second"));
  }

  #[test]
  fn remove_and_remove_all() {
    let store = QueryStore::with_windows(Duration::hours(1), Duration::hours(2)).unwrap();

    store.set(PageKey::ContactPage, sample_payload()).unwrap();
    store
      .set(PageKey::SiteSettings, settings_payload("site"))
      .unwrap();

    store.remove(PageKey::ContactPage).unwrap();
    assert!(!store.has(PageKey::ContactPage).unwrap());
    assert!(store.has(PageKey::SiteSettings).unwrap());

    store.remove_all().unwrap();
    assert!(store.keys().unwrap().is_empty());
  }

  #[test]
  fn gc_sweeps_expired_entries() {
    let store = QueryStore::with_windows(Duration::zero(), Duration::zero()).unwrap();

    store.set(PageKey::ContactPage, sample_payload()).unwrap();
    store
      .set(PageKey::SiteSettings, settings_payload("site"))
      .unwrap();

    assert_eq!(store.gc().unwrap(), 2);
    assert_eq!(store.gc().unwrap(), 0);
  }

  #[test]
  fn collect_window_shorter_than_stale_is_rejected() {
    assert!(QueryStore::with_windows(Duration::hours(2), Duration::hours(1)).is_err());
  }
}

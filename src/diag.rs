//! Development-only view into the query cache.
//!
//! Cross-references the full page key registry against cache membership and
//! offers manual invalidation. When disabled (production builds), every
//! operation renders nothing and touches nothing.

use chrono::{DateTime, Utc};

use color_eyre::Result;

use crate::cache::ContentCache;
use crate::content::PageKey;

/// Cache membership for one registry key.
#[derive(Debug, Clone)]
pub struct KeyStatus {
  pub key: PageKey,
  pub cached: bool,
  pub stored_at: Option<DateTime<Utc>>,
  pub is_stale: bool,
}

/// Read/write diagnostics over the query cache.
pub struct CacheDiagnostics {
  cache: ContentCache,
  enabled: bool,
}

impl CacheDiagnostics {
  /// `enabled` should come from build configuration; callers typically pass
  /// `cfg!(debug_assertions)` or the config flag.
  pub fn new(cache: ContentCache, enabled: bool) -> Self {
    Self { cache, enabled }
  }

  pub fn enabled(&self) -> bool {
    self.enabled
  }

  /// The whole registry with per-key cache membership. Empty when disabled.
  pub fn snapshot(&self) -> Result<Vec<KeyStatus>> {
    if !self.enabled {
      return Ok(Vec::new());
    }

    PageKey::ALL
      .into_iter()
      .map(|key| {
        let hit = self.cache.peek(key)?;
        Ok(KeyStatus {
          key,
          cached: hit.is_some(),
          stored_at: hit.as_ref().map(|h| h.stored_at),
          is_stale: hit.as_ref().is_some_and(|h| h.is_stale),
        })
      })
      .collect()
  }

  /// Invalidate one key. Returns whether anything happened.
  pub fn invalidate(&self, key: PageKey) -> Result<bool> {
    if !self.enabled {
      return Ok(false);
    }
    self.cache.invalidate(key)?;
    Ok(true)
  }

  /// Invalidate every key. Returns whether anything happened.
  pub fn invalidate_all(&self) -> Result<bool> {
    if !self.enabled {
      return Ok(false);
    }
    self.cache.invalidate_all()?;
    Ok(true)
  }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub content: ContentConfig,
  #[serde(default)]
  pub freshness: FreshnessConfig,
  #[serde(default)]
  pub proxy: ProxyConfig,
  /// Enable the diagnostics surface (development builds only)
  #[serde(default)]
  pub diagnostics: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
  /// Base URL of the structured-content store's query API
  pub base_url: String,
}

impl Default for ContentConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:3333/api/".to_string(),
    }
  }
}

/// Freshness thresholds for the in-process query cache.
///
/// `stale_after` marks when a hit still serves but triggers a background
/// refresh; `collect_after` marks when an entry becomes a hard miss.
#[derive(Debug, Clone, Deserialize)]
pub struct FreshnessConfig {
  #[serde(default = "default_stale_after_secs")]
  pub stale_after_secs: u64,
  #[serde(default = "default_collect_after_secs")]
  pub collect_after_secs: u64,
}

fn default_stale_after_secs() -> u64 {
  300
}

fn default_collect_after_secs() -> u64 {
  600
}

impl Default for FreshnessConfig {
  fn default() -> Self {
    Self {
      stale_after_secs: default_stale_after_secs(),
      collect_after_secs: default_collect_after_secs(),
    }
  }
}

impl FreshnessConfig {
  pub fn stale_after(&self) -> Duration {
    Duration::from_secs(self.stale_after_secs)
  }

  pub fn collect_after(&self) -> Duration {
    Duration::from_secs(self.collect_after_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
  /// Version tag for the persistent cache partitions. Bumping it makes the
  /// next activation delete every partition from older versions.
  #[serde(default = "default_cache_version")]
  pub cache_version: String,
  /// Origin the proxy resolves site-relative paths against
  #[serde(default = "default_origin")]
  pub origin: String,
  /// Paths pre-cached at install. Install fails if any entry fails.
  #[serde(default = "default_precache")]
  pub precache: Vec<String>,
  /// Location of the persistent cache database (platform data dir if unset)
  #[serde(default)]
  pub db_path: Option<PathBuf>,
}

fn default_cache_version() -> String {
  "v1".to_string()
}

fn default_origin() -> String {
  "http://localhost:8080".to_string()
}

fn default_precache() -> Vec<String> {
  vec![
    "/".to_string(),
    "/offline.html".to_string(),
    "/site.webmanifest".to_string(),
    "/favicon.ico".to_string(),
  ]
}

impl Default for ProxyConfig {
  fn default() -> Self {
    Self {
      cache_version: default_cache_version(),
      origin: default_origin(),
      precache: default_precache(),
      db_path: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sitecache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sitecache/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      // No file anywhere: defaults are a working configuration
      None => Config::default(),
    };

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("sitecache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sitecache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Check cross-field invariants.
  pub fn validate(&self) -> Result<()> {
    if self.freshness.collect_after_secs < self.freshness.stale_after_secs {
      return Err(eyre!(
        "collect_after_secs ({}) must be >= stale_after_secs ({})",
        self.freshness.collect_after_secs,
        self.freshness.stale_after_secs
      ));
    }
    Ok(())
  }

  /// Get the content store API token from environment variables.
  ///
  /// Checks SITECACHE_STORE_TOKEN first, then CONTENT_STORE_TOKEN as
  /// fallback. Public datasets need no token, so absence is not an error.
  pub fn get_store_token() -> Option<String> {
    std::env::var("SITECACHE_STORE_TOKEN")
      .or_else(|_| std::env::var("CONTENT_STORE_TOKEN"))
      .ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.freshness.stale_after(), Duration::from_secs(300));
    assert_eq!(config.freshness.collect_after(), Duration::from_secs(600));
  }

  #[test]
  fn collect_before_stale_is_rejected() {
    let config = Config {
      freshness: FreshnessConfig {
        stale_after_secs: 600,
        collect_after_secs: 300,
      },
      ..Config::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn parses_partial_yaml() {
    let config: Config = serde_yaml::from_str(
      "content:\n  base_url: https://cms.example.org/api/\nfreshness:\n  stale_after_secs: 60\n",
    )
    .unwrap();
    assert_eq!(config.content.base_url, "https://cms.example.org/api/");
    assert_eq!(config.freshness.stale_after_secs, 60);
    // Unspecified fields keep their defaults
    assert_eq!(config.freshness.collect_after_secs, 600);
    assert_eq!(config.proxy.cache_version, "v1");
  }
}

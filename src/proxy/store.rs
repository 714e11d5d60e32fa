//! Persistent cache partitions for the interception proxy.
//!
//! Stored responses survive restarts; the host may still evict the backing
//! file at any time, which surfaces as ordinary misses. One stored response
//! per request identity (URL) per partition, last write wins.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::ProxyConfig;

/// A response held in (or destined for) a cache partition.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl StoredResponse {
  /// HTTP success class (2xx). Only these are worth storing.
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Schema for partitioned response storage.
const PROXY_SCHEMA: &str = r#"
-- Named partitions, created on open and enumerated at activation
CREATE TABLE IF NOT EXISTS partitions (
    name TEXT PRIMARY KEY,
    opened_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One stored response per request identity per partition
CREATE TABLE IF NOT EXISTS responses (
    partition TEXT NOT NULL,
    request_hash TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (partition, request_hash)
);

CREATE INDEX IF NOT EXISTS idx_responses_partition ON responses(partition);
"#;

/// SQLite-backed store of named, versioned response partitions.
pub struct PartitionStore {
  conn: Mutex<Connection>,
}

impl PartitionStore {
  /// Open or create the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open the configured store: its explicit path, or the platform default.
  pub fn open_from(config: &ProxyConfig) -> Result<Self> {
    match &config.db_path {
      Some(path) => Self::open_at(path),
      None => Self::open(),
    }
  }

  /// Open or create the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// In-memory store, used by tests.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;
    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("sitecache").join("proxy-cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute_batch(PROXY_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;
    Ok(())
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Stable, fixed-length identity for one request.
  fn request_hash(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Record a partition name. Idempotent.
  pub fn open_partition(&self, name: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR IGNORE INTO partitions (name) VALUES (?)",
        params![name],
      )
      .map_err(|e| eyre!("Failed to open partition {}: {}", name, e))?;
    Ok(())
  }

  /// All partition names this store owns.
  pub fn list_partitions(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare("SELECT name FROM partitions ORDER BY name")
      .map_err(|e| eyre!("Failed to prepare partition query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list partitions: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(names)
  }

  /// Drop a partition and every response stored in it.
  pub fn delete_partition(&self, name: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute("DELETE FROM responses WHERE partition = ?", params![name])
      .map_err(|e| eyre!("Failed to clear partition {}: {}", name, e))?;
    conn
      .execute("DELETE FROM partitions WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete partition {}: {}", name, e))?;
    Ok(())
  }

  /// Look up the stored response for a request in one partition.
  pub fn get(&self, partition: &str, url: &Url) -> Result<Option<StoredResponse>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare(
        "SELECT status, headers, body FROM responses
         WHERE partition = ? AND request_hash = ?",
      )
      .map_err(|e| eyre!("Failed to prepare response query: {}", e))?;

    let row: Option<(u16, String, Vec<u8>)> = stmt
      .query_row(params![partition, Self::request_hash(url)], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
      })
      .optional()
      .map_err(|e| eyre!("Failed to query response: {}", e))?;

    match row {
      Some((status, headers_json, body)) => {
        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
          .map_err(|e| eyre!("Failed to parse stored headers: {}", e))?;
        Ok(Some(StoredResponse {
          status,
          headers,
          body,
        }))
      }
      None => Ok(None),
    }
  }

  /// Store a response, overwriting any previous copy for the same request.
  pub fn put(&self, partition: &str, url: &Url, response: &StoredResponse) -> Result<()> {
    let headers_json = serde_json::to_string(&response.headers)
      .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR IGNORE INTO partitions (name) VALUES (?)",
        params![partition],
      )
      .map_err(|e| eyre!("Failed to open partition {}: {}", partition, e))?;
    conn
      .execute(
        "INSERT OR REPLACE INTO responses (partition, request_hash, url, status, headers, body, stored_at)
         VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          partition,
          Self::request_hash(url),
          url.as_str(),
          response.status,
          headers_json,
          response.body,
        ],
      )
      .map_err(|e| eyre!("Failed to store response: {}", e))?;

    Ok(())
  }
}

//! Content-store fetch boundary.
//!
//! The cache layer only needs a function from page key to payload; the
//! `ContentFetcher` trait is that seam, with an HTTP implementation that
//! talks to the structured-content store's query endpoint.

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;

use crate::config::{Config, ContentConfig};

use super::api_types::{payload_from_result, ApiQueryResponse};
use super::keys::PageKey;
use super::types::ContentPayload;

/// Fetches the content object behind a page key.
///
/// Opaque to the cache layer beyond success/failure.
pub trait ContentFetcher: Send + Sync {
  fn fetch(&self, key: PageKey) -> BoxFuture<'_, Result<ContentPayload>>;
}

/// Content fetcher backed by the store's HTTP query endpoint.
#[derive(Clone)]
pub struct HttpContentFetcher {
  http: reqwest::Client,
  base_url: url::Url,
  token: Option<String>,
}

impl HttpContentFetcher {
  pub fn new(config: &ContentConfig) -> Result<Self> {
    let base_url = url::Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid content store URL {}: {}", config.base_url, e))?;

    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      token: Config::get_store_token(),
    })
  }

  async fn query(&self, key: PageKey) -> Result<ContentPayload> {
    let url = self
      .base_url
      .join("query")
      .map_err(|e| eyre!("Failed to build query URL: {}", e))?;

    let mut request = self
      .http
      .get(url)
      .query(&[("query", key.content_query())]);

    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Content store request for {} failed: {}", key, e))?
      .error_for_status()
      .map_err(|e| eyre!("Content store rejected query for {}: {}", key, e))?;

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read content store response for {}: {}", key, e))?;

    let envelope: ApiQueryResponse = serde_json::from_slice(&body)
      .map_err(|e| eyre!("Failed to parse content store response for {}: {}", key, e))?;

    let result = envelope
      .result
      .ok_or_else(|| eyre!("Content store has no document for {}", key))?;

    payload_from_result(key, result)
      .map_err(|e| eyre!("Document for {} does not match its schema: {}", key, e))
  }
}

impl ContentFetcher for HttpContentFetcher {
  fn fetch(&self, key: PageKey) -> BoxFuture<'_, Result<ContentPayload>> {
    Box::pin(self.query(key))
  }
}

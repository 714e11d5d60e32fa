//! Local caching reverse proxy.
//!
//! Generalizes the browser-resident interception worker: an interceptor
//! registered at the HTTP client boundary, classifying each request and
//! dispatching it to one of three strategies backed by the persistent
//! partition store. Runs isolated from the in-process query cache; the two
//! tiers meet only through the request/response contract.
//!
//! Lifecycle: `install` (pre-cache the manifest, all-or-nothing) →
//! `activate` (delete superseded partitions, start serving) → per-request
//! `handle`.

use std::sync::Arc;

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ProxyConfig;

use super::classify::{classify, intercepts, RequestClass};
use super::store::{PartitionStore, StoredResponse};

/// One outgoing request as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
  pub method: String,
  pub url: Url,
}

impl InterceptedRequest {
  pub fn get(url: Url) -> Self {
    Self {
      method: "GET".to_string(),
      url,
    }
  }
}

/// The network behind the proxy.
///
/// `fetch` errors mean transport failure (unreachable, reset); HTTP error
/// statuses come back as ordinary responses. The strategies depend on that
/// distinction.
pub trait Upstream: Send + Sync {
  fn fetch<'a>(&'a self, req: &'a InterceptedRequest) -> BoxFuture<'a, Result<StoredResponse>>;
}

/// Upstream over a real HTTP client.
pub struct HttpUpstream {
  http: reqwest::Client,
}

impl HttpUpstream {
  pub fn new() -> Result<Self> {
    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
    Ok(Self { http })
  }

  async fn send(&self, req: &InterceptedRequest) -> Result<StoredResponse> {
    let method = reqwest::Method::from_bytes(req.method.as_bytes())
      .map_err(|e| eyre!("Invalid HTTP method {}: {}", req.method, e))?;

    let response = self
      .http
      .request(method, req.url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", req.url, e))?;

    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .map(|(name, value)| {
        (
          name.as_str().to_string(),
          String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read response body from {}: {}", req.url, e))?
      .to_vec();

    Ok(StoredResponse {
      status,
      headers,
      body,
    })
  }
}

impl Upstream for HttpUpstream {
  fn fetch<'a>(&'a self, req: &'a InterceptedRequest) -> BoxFuture<'a, Result<StoredResponse>> {
    Box::pin(self.send(req))
  }
}

/// The two versioned partition names one proxy version owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
  /// Long-lived partition for build output (cache-first)
  pub assets: String,
  /// Short-lived partition for documents (network-preferred)
  pub documents: String,
}

impl PartitionNames {
  pub fn for_version(version: &str) -> Self {
    Self {
      assets: format!("assets-{}", version),
      documents: format!("documents-{}", version),
    }
  }

  fn owns(&self, name: &str) -> bool {
    name == self.assets || name == self.documents
  }
}

/// Caching reverse proxy guarding all site HTTP traffic.
pub struct InterceptProxy {
  store: Arc<PartitionStore>,
  upstream: Arc<dyn Upstream>,
  names: PartitionNames,
  origin: Url,
  manifest: Vec<String>,
}

impl InterceptProxy {
  pub fn new(
    store: Arc<PartitionStore>,
    upstream: Arc<dyn Upstream>,
    config: &ProxyConfig,
  ) -> Result<Self> {
    let origin = Url::parse(&config.origin)
      .map_err(|e| eyre!("Invalid proxy origin {}: {}", config.origin, e))?;

    Ok(Self {
      store,
      upstream,
      names: PartitionNames::for_version(&config.cache_version),
      origin,
      manifest: config.precache.clone(),
    })
  }

  pub fn partition_names(&self) -> &PartitionNames {
    &self.names
  }

  /// Pre-cache the manifest into the asset partition.
  ///
  /// All-or-nothing: every entry is fetched and checked before anything is
  /// stored, so a failed install leaves no partial pre-cache behind.
  pub async fn install(&self) -> Result<()> {
    self.store.open_partition(&self.names.assets)?;

    let mut staged = Vec::with_capacity(self.manifest.len());
    for path in &self.manifest {
      let url = self
        .origin
        .join(path)
        .map_err(|e| eyre!("Invalid manifest path {}: {}", path, e))?;
      let req = InterceptedRequest::get(url);

      let response = self
        .upstream
        .fetch(&req)
        .await
        .map_err(|e| eyre!("Install failed pre-caching {}: {}", path, e))?;
      if !response.is_success() {
        return Err(eyre!(
          "Install failed pre-caching {}: status {}",
          path,
          response.status
        ));
      }

      staged.push((req.url, response));
    }

    for (url, response) in &staged {
      self.store.put(&self.names.assets, url, response)?;
    }

    info!(entries = staged.len(), partition = %self.names.assets, "Install complete");
    Ok(())
  }

  /// Delete every partition not owned by the current version, then open the
  /// current ones. Returns how many partitions were removed.
  ///
  /// Cleanup never blocks serving: a failure to delete one stale partition
  /// is logged and skipped.
  pub fn activate(&self) -> Result<usize> {
    let mut removed = 0;
    for name in self.store.list_partitions()? {
      if self.names.owns(&name) {
        continue;
      }
      match self.store.delete_partition(&name) {
        Ok(()) => {
          info!(partition = %name, "Removed superseded cache partition");
          removed += 1;
        }
        Err(e) => warn!(partition = %name, error = %e, "Failed to remove stale partition"),
      }
    }

    self.store.open_partition(&self.names.assets)?;
    self.store.open_partition(&self.names.documents)?;

    Ok(removed)
  }

  /// Serve one request through the strategy for its class.
  pub async fn handle(&self, req: &InterceptedRequest) -> Result<StoredResponse> {
    if !intercepts(&req.method, &req.url) {
      // Pass through unmodified, no caching on either side
      return self.upstream.fetch(req).await;
    }

    match classify(&req.url) {
      RequestClass::RootDocument => self.stale_while_revalidate(req).await,
      RequestClass::StaticAsset => self.cache_first(req).await,
      RequestClass::OtherDocument => self.network_first(req).await,
    }
  }

  /// Root document: serve the stored copy immediately and refresh it in the
  /// background; only a cold miss waits on the network.
  async fn stale_while_revalidate(&self, req: &InterceptedRequest) -> Result<StoredResponse> {
    if let Some(cached) = self.store.get(&self.names.documents, &req.url)? {
      debug!(url = %req.url, "Serving cached root document, revalidating");
      self.spawn_refresh(req.clone());
      return Ok(cached);
    }

    let response = self.upstream.fetch(req).await?;
    if response.is_success() {
      self.store.put(&self.names.documents, &req.url, &response)?;
    }
    Ok(response)
  }

  /// Static assets: the stored copy wins; fetch-then-store only on miss.
  async fn cache_first(&self, req: &InterceptedRequest) -> Result<StoredResponse> {
    if let Some(cached) = self.store.get(&self.names.assets, &req.url)? {
      return Ok(cached);
    }

    let response = self.upstream.fetch(req).await?;
    if response.is_success() {
      self.store.put(&self.names.assets, &req.url, &response)?;
    }
    Ok(response)
  }

  /// Other documents: live data preferred; the stored copy is only for
  /// transport failure. HTTP error statuses are returned as-is.
  async fn network_first(&self, req: &InterceptedRequest) -> Result<StoredResponse> {
    match self.upstream.fetch(req).await {
      Ok(response) => {
        if response.is_success() {
          self.store.put(&self.names.documents, &req.url, &response)?;
        }
        Ok(response)
      }
      Err(err) => {
        if let Some(cached) = self.store.get(&self.names.documents, &req.url)? {
          info!(url = %req.url, "Network unreachable, serving cached document");
          return Ok(cached);
        }
        // No fallback: the page layer shows its offline affordance
        Err(err)
      }
    }
  }

  /// Detached revalidation; only the stored side effect is observable.
  fn spawn_refresh(&self, req: InterceptedRequest) {
    let proxy = self.clone();
    tokio::spawn(async move {
      match proxy.upstream.fetch(&req).await {
        Ok(response) if response.is_success() => {
          if let Err(e) = proxy.store.put(&proxy.names.documents, &req.url, &response) {
            warn!(url = %req.url, error = %e, "Failed to store refreshed document");
          }
        }
        Ok(response) => {
          debug!(url = %req.url, status = response.status, "Skipping refresh of non-success response");
        }
        Err(e) => warn!(url = %req.url, error = %e, "Background refresh failed"),
      }
    });
  }
}

impl Clone for InterceptProxy {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      upstream: Arc::clone(&self.upstream),
      names: self.names.clone(),
      origin: self.origin.clone(),
      manifest: self.manifest.clone(),
    }
  }
}

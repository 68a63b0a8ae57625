//! HTTP client that routes every request through the cache layer.

use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use std::time::Duration;
use url::Url;

use crate::cache::{CacheLayer, CacheManager, CacheResult, CacheRule, RequestDescriptor};
use crate::config::Config;

/// HTTP client with transparent caching support.
///
/// The client performs the network I/O; the cache layer decides whether that
/// I/O happens and which bytes the caller gets back.
#[derive(Clone)]
pub struct CachedClient {
  http: reqwest::Client,
  cache: CacheLayer,
}

impl CachedClient {
  /// Create a client backed by the store named in `config`.
  pub fn new(config: &Config) -> Result<Self> {
    let manager = CacheManager::open(config.store, config.database_path.as_deref())?;
    Self::with_manager(manager, Duration::from_secs(config.timeout_secs))
  }

  pub fn with_manager(manager: CacheManager, timeout: Duration) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      cache: CacheLayer::new(manager),
    })
  }

  pub fn cache(&self) -> &CacheLayer {
    &self.cache
  }

  /// Send a request under `rule`.
  ///
  /// The method defaults to GET. Non-success statuses are errors and are
  /// never cached. The URL and method are only validated when a fetch runs,
  /// so a request answered from the store never fails on them.
  pub async fn send(&self, request: &RequestDescriptor, rule: CacheRule) -> Result<CacheResult> {
    let http = self.http.clone();
    let raw_url = request.url.clone();
    let raw_method = request.method.clone();
    let body = request.body.clone();

    self
      .cache
      .fetch(request, rule, move || async move {
        let url = Url::parse(&raw_url).map_err(|e| eyre!("Invalid URL {}: {}", raw_url, e))?;
        let method = match raw_method.as_deref() {
          Some(m) => Method::from_bytes(m.to_uppercase().as_bytes())
            .map_err(|e| eyre!("Invalid HTTP method {}: {}", m, e))?,
          None => Method::GET,
        };

        let mut builder = http.request(method.clone(), url.clone());
        if let Some(body) = body {
          builder = builder.body(body);
        }

        let response = builder
          .send()
          .await
          .map_err(|e| eyre!("Request to {} failed: {}", url, e))?
          .error_for_status()
          .map_err(|e| eyre!("{} {} returned an error: {}", method, url, e))?;

        let bytes = response
          .bytes()
          .await
          .map_err(|e| eyre!("Failed to read response from {}: {}", url, e))?;

        Ok::<_, color_eyre::Report>(Some(bytes.to_vec()))
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, CacheStoreKind};

  fn client() -> CachedClient {
    let manager = CacheManager::open(CacheStoreKind::UrlCache, None).unwrap();
    CachedClient::with_manager(manager, Duration::from_secs(1)).unwrap()
  }

  #[tokio::test]
  async fn test_invalid_url_is_rejected() {
    let result = client()
      .send(&RequestDescriptor::new("not a url"), CacheRule::UrlOnly)
      .await;
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_invalid_method_is_rejected() {
    let request = RequestDescriptor::new("http://127.0.0.1:9/").with_method("BAD METHOD");
    assert!(client().send(&request, CacheRule::UrlOnly).await.is_err());
  }

  #[tokio::test]
  async fn test_invalid_url_is_fine_when_no_fetch_runs() {
    let client = client();
    let request = RequestDescriptor::new("not a url").with_method("NOT A METHOD");

    let miss = client.send(&request, CacheRule::CacheOnly).await.unwrap();
    assert_eq!(miss, CacheResult::from_cache(None));

    client
      .cache()
      .manager()
      .save_request(&request, Some(b"cached"));
    let hit = client.send(&request, CacheRule::CacheOrUrl).await.unwrap();
    assert_eq!(hit, CacheResult::from_cache(Some(b"cached".to_vec())));
  }

  #[tokio::test]
  async fn test_cache_hit_skips_network() {
    let client = client();
    // Nothing listens on the discard port; a hit must not try to connect
    let request = RequestDescriptor::new("http://127.0.0.1:9/a").with_method("GET");
    client
      .cache()
      .manager()
      .save_request(&request, Some(b"cached"));

    let result = client.send(&request, CacheRule::CacheOrUrl).await.unwrap();
    assert_eq!(result.data, Some(b"cached".to_vec()));
    assert_eq!(result.source, CacheSource::Cache);
  }

  #[tokio::test]
  async fn test_cache_only_miss_returns_nothing() {
    let request = RequestDescriptor::new("http://127.0.0.1:9/a");
    let result = client().send(&request, CacheRule::CacheOnly).await.unwrap();
    assert_eq!(result, CacheResult::from_cache(None));
  }
}

//! Cache manager: key derivation plus store access for the request pipeline.

use color_eyre::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::key::{build_key, RequestDescriptor};
use super::storage::{CacheStore, CacheStoreKind, SqliteStorage, UrlCacheStorage};

/// Answers "is this request cached?" and "store this response".
///
/// Store faults never reach the caller: a failed read is a miss and a failed
/// write is dropped, both logged.
#[derive(Clone)]
pub struct CacheManager {
  store: Arc<dyn CacheStore>,
}

impl CacheManager {
  /// Bind a manager to the store selected by `kind`.
  ///
  /// `database_path` only applies to [`CacheStoreKind::Database`]; when absent
  /// the platform data directory is used.
  pub fn open(kind: CacheStoreKind, database_path: Option<&Path>) -> Result<Self> {
    let store: Arc<dyn CacheStore> = match kind {
      CacheStoreKind::UrlCache => Arc::new(UrlCacheStorage::new()),
      CacheStoreKind::Database => match database_path {
        Some(path) => Arc::new(SqliteStorage::open(path)?),
        None => Arc::new(SqliteStorage::open_default()?),
      },
    };

    Self::with_store(store)
  }

  /// Bind a manager to an existing store, configuring it first.
  pub fn with_store(store: Arc<dyn CacheStore>) -> Result<Self> {
    store.configure()?;
    Ok(Self { store })
  }

  /// Look up the cached response for a request.
  pub fn verify_for_cache(
    &self,
    url: &str,
    method: Option<&str>,
    body: Option<&[u8]>,
  ) -> Option<Vec<u8>> {
    let key = build_key(Some(url), method, body);
    match self.store.get(&key) {
      Ok(data) => {
        debug!(key = %key, hit = data.is_some(), "cache lookup");
        data
      }
      Err(e) => {
        warn!(key = %key, error = %e, "cache read failed, treating as miss");
        None
      }
    }
  }

  /// Store a response for a request. `None` data is ignored.
  pub fn save_cache(
    &self,
    url: &str,
    method: Option<&str>,
    body: Option<&[u8]>,
    data: Option<&[u8]>,
  ) {
    let Some(data) = data else {
      return;
    };

    let key = build_key(Some(url), method, body);
    if let Err(e) = self.store.put(&key, data) {
      warn!(key = %key, error = %e, "cache write failed");
    } else {
      debug!(key = %key, bytes = data.len(), "cache saved");
    }
  }

  /// Remove every cached response.
  pub fn clear_cache(&self) {
    if let Err(e) = self.store.clear_all() {
      warn!(error = %e, "cache clear failed");
    }
  }

  /// [`Self::verify_for_cache`] for a [`RequestDescriptor`].
  pub fn verify_request(&self, request: &RequestDescriptor) -> Option<Vec<u8>> {
    self.verify_for_cache(
      &request.url,
      request.method.as_deref(),
      request.body.as_deref(),
    )
  }

  /// [`Self::save_cache`] for a [`RequestDescriptor`].
  pub fn save_request(&self, request: &RequestDescriptor, data: Option<&[u8]>) {
    self.save_cache(
      &request.url,
      request.method.as_deref(),
      request.body.as_deref(),
      data,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use color_eyre::eyre::eyre;

  const URL: &str = "http://x.com/a";

  fn managers() -> Vec<CacheManager> {
    let sqlite = SqliteStorage::open_in_memory().unwrap();
    vec![
      CacheManager::open(CacheStoreKind::UrlCache, None).unwrap(),
      CacheManager::with_store(Arc::new(sqlite)).unwrap(),
    ]
  }

  #[test]
  fn test_round_trip() {
    for manager in managers() {
      let data = vec![0u8, 1, 2, 255];
      manager.save_cache(URL, Some("POST"), Some(b"q=1"), Some(&data));
      assert_eq!(
        manager.verify_for_cache(URL, Some("POST"), Some(b"q=1")),
        Some(data)
      );
    }
  }

  #[test]
  fn test_miss() {
    for manager in managers() {
      assert_eq!(manager.verify_for_cache(URL, Some("GET"), None), None);
    }
  }

  #[test]
  fn test_distinct_requests_do_not_collide() {
    for manager in managers() {
      manager.save_cache(URL, Some("GET"), None, Some(b"get"));
      manager.save_cache(URL, Some("POST"), None, Some(b"post"));
      assert_eq!(
        manager.verify_for_cache(URL, Some("GET"), None),
        Some(b"get".to_vec())
      );
      assert_eq!(
        manager.verify_for_cache(URL, Some("POST"), None),
        Some(b"post".to_vec())
      );
    }
  }

  #[test]
  fn test_save_none_is_noop() {
    for manager in managers() {
      manager.save_cache(URL, Some("GET"), None, None);
      assert_eq!(manager.verify_for_cache(URL, Some("GET"), None), None);

      manager.save_cache(URL, Some("GET"), None, Some(b"prior"));
      manager.save_cache(URL, Some("GET"), None, None);
      assert_eq!(
        manager.verify_for_cache(URL, Some("GET"), None),
        Some(b"prior".to_vec())
      );
    }
  }

  #[test]
  fn test_clear_cache() {
    for manager in managers() {
      manager.save_cache(URL, Some("GET"), None, Some(b"a"));
      manager.save_cache("http://x.com/b", None, None, Some(b"b"));
      manager.clear_cache();
      assert_eq!(manager.verify_for_cache(URL, Some("GET"), None), None);
      assert_eq!(manager.verify_for_cache("http://x.com/b", None, None), None);
    }
  }

  #[test]
  fn test_request_helpers_share_keys() {
    let manager = CacheManager::open(CacheStoreKind::UrlCache, None).unwrap();
    let request = RequestDescriptor::new(URL).with_method("POST").with_body("q=1");
    manager.save_request(&request, Some(b"data"));
    assert_eq!(
      manager.verify_for_cache(URL, Some("POST"), Some(b"q=1")),
      Some(b"data".to_vec())
    );
    assert_eq!(manager.verify_request(&request), Some(b"data".to_vec()));
  }

  #[test]
  fn test_open_database_at_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    let manager = CacheManager::open(CacheStoreKind::Database, Some(&path)).unwrap();
    manager.save_cache(URL, Some("GET"), None, Some(b"kept"));
    drop(manager);

    let manager = CacheManager::open(CacheStoreKind::Database, Some(&path)).unwrap();
    assert_eq!(
      manager.verify_for_cache(URL, Some("GET"), None),
      Some(b"kept".to_vec())
    );
  }

  struct BrokenStore;

  impl CacheStore for BrokenStore {
    fn configure(&self) -> Result<()> {
      Ok(())
    }

    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
      Err(eyre!("disk on fire"))
    }

    fn put(&self, _key: &str, _value: &[u8]) -> Result<()> {
      Err(eyre!("disk on fire"))
    }

    fn clear_all(&self) -> Result<()> {
      Err(eyre!("disk on fire"))
    }
  }

  #[test]
  fn test_store_errors_degrade_to_miss() {
    let manager = CacheManager::with_store(Arc::new(BrokenStore)).unwrap();
    manager.save_cache(URL, Some("GET"), None, Some(b"lost"));
    assert_eq!(manager.verify_for_cache(URL, Some("GET"), None), None);
    manager.clear_cache();
  }
}

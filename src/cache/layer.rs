//! Cache layer that orchestrates caching logic with network fetching.

use color_eyre::Result;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::key::RequestDescriptor;
use super::manager::CacheManager;
use super::result::CacheResult;
use super::rule::CacheRule;

/// Cache layer that applies a [`CacheRule`] to each request.
///
/// This layer sits between the requester and the network client. The
/// requester supplies the fetch; the layer decides whether it runs, whether
/// it runs in the background, and which result the caller sees.
#[derive(Clone)]
pub struct CacheLayer {
  manager: CacheManager,
  refreshes: Arc<Refreshes>,
}

/// Background refreshes in flight, by cache key.
#[derive(Default)]
struct Refreshes {
  keys: Mutex<HashSet<String>>,
  /// Signalled whenever the set drains to empty
  idle: Notify,
}

impl Refreshes {
  fn keys(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
    self.keys.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Releases a key from [`Refreshes`] when the refresh task ends, even if the
/// fetcher panicked.
struct RefreshGuard {
  key: String,
  refreshes: Arc<Refreshes>,
}

impl Drop for RefreshGuard {
  fn drop(&mut self) {
    let mut keys = self.refreshes.keys();
    keys.remove(&self.key);
    if keys.is_empty() {
      self.refreshes.idle.notify_waiters();
    }
  }
}

impl CacheLayer {
  /// Create a layer over `manager` with no refreshes in flight.
  pub fn new(manager: CacheManager) -> Self {
    Self {
      manager,
      refreshes: Arc::new(Refreshes::default()),
    }
  }

  /// The manager this layer reads and writes through.
  pub fn manager(&self) -> &CacheManager {
    &self.manager
  }

  /// Resolve a request under `rule`.
  ///
  /// 1. Read the store if the rule allows it
  /// 2. If no fetch is needed, return the stored value (possibly a miss)
  /// 3. If the fetch result is not for the caller, refresh in the background
  ///    and return the stored value
  /// 4. Otherwise fetch, save, and return the network data
  ///
  /// Fetch errors on the foreground path propagate, except for
  /// `CacheAndUrl` with a cache hit, which falls back to the stored value.
  pub async fn fetch<F, Fut>(
    &self,
    request: &RequestDescriptor,
    rule: CacheRule,
    fetcher: F,
  ) -> Result<CacheResult>
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Option<Vec<u8>>>> + Send + 'static,
  {
    let cached = if rule.should_get_from_cache() {
      self.manager.verify_request(request)
    } else {
      None
    };
    let cache_hit = cached.is_some();

    if !rule.should_get_from_url(cache_hit) {
      return Ok(CacheResult::from_cache(cached));
    }

    if !rule.should_return_url_data(cache_hit) {
      self.spawn_refresh(request.clone(), fetcher);
      return Ok(CacheResult::from_cache(cached));
    }

    match fetcher().await {
      Ok(data) => {
        self.manager.save_request(request, data.as_deref());
        Ok(CacheResult::from_network(data))
      }
      Err(e) => match cached {
        Some(cached) => {
          warn!(url = %request.url, error = %e, "fetch failed, serving cached data");
          Ok(CacheResult::offline(cached))
        }
        None => Err(e),
      },
    }
  }

  /// Run the fetch and store write without the caller waiting on it.
  ///
  /// A refresh already in flight for the same key absorbs this one.
  fn spawn_refresh<F, Fut>(&self, request: RequestDescriptor, fetcher: F)
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Option<Vec<u8>>>> + Send + 'static,
  {
    let key = request.cache_key();
    if !self.refreshes.keys().insert(key.clone()) {
      debug!(key = %key, "refresh already in flight");
      return;
    }

    let manager = self.manager.clone();
    let guard = RefreshGuard {
      key,
      refreshes: Arc::clone(&self.refreshes),
    };

    tokio::spawn(async move {
      let _guard = guard;
      match fetcher().await {
        Ok(data) => {
          manager.save_request(&request, data.as_deref());
          info!(url = %request.url, "background refresh complete");
        }
        Err(e) => {
          warn!(url = %request.url, error = %e, "background refresh failed");
        }
      }
    });
  }

  /// Number of background refreshes still running.
  pub fn pending_refreshes(&self) -> usize {
    self.refreshes.keys().len()
  }

  /// Wait until every background refresh has settled.
  pub async fn wait_for_refreshes(&self) {
    loop {
      let idle = self.refreshes.idle.notified();
      tokio::pin!(idle);
      // Register before checking so a drain between the two isn't missed
      idle.as_mut().enable();

      if self.pending_refreshes() == 0 {
        return;
      }
      idle.await;
    }
  }
}

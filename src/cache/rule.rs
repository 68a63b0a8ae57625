//! Cache rules: how a request combines the store and the network.

use serde::Deserialize;

/// Policy selected by the caller for a single request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CacheRule {
  /// Only read the store; never touch the network
  CacheOnly,
  /// Use the store, fetch only on a miss
  #[default]
  CacheOrUrl,
  /// Return the stored value, then refresh the store in the background
  CacheOrUrlThenUpdate,
  /// Read the store, but always fetch and return the network result
  CacheAndUrl,
  /// Skip the store read and always fetch
  UrlOnly,
}

impl CacheRule {
  /// Whether the store is read before anything else.
  pub fn should_get_from_cache(self) -> bool {
    !matches!(self, CacheRule::UrlOnly)
  }

  /// Whether the remote fetch must run, given the outcome of the store read.
  pub fn should_get_from_url(self, cache_hit: bool) -> bool {
    match self {
      CacheRule::CacheOnly => false,
      CacheRule::CacheOrUrl => !cache_hit,
      CacheRule::CacheOrUrlThenUpdate | CacheRule::CacheAndUrl | CacheRule::UrlOnly => true,
    }
  }

  /// Whether the caller gets the remote result rather than the stored one.
  pub fn should_return_url_data(self, cache_hit: bool) -> bool {
    match self {
      CacheRule::CacheOnly | CacheRule::CacheOrUrlThenUpdate => false,
      CacheRule::CacheAndUrl | CacheRule::UrlOnly => true,
      CacheRule::CacheOrUrl => !cache_hit,
    }
  }
}

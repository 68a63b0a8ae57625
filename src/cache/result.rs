//! Result types returned by the cache layer.

/// Response handed back to the caller, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResult {
  /// The response bytes; `None` when neither source produced any
  pub data: Option<Vec<u8>>,
  /// Where the data came from
  pub source: CacheSource,
}

impl CacheResult {
  /// Create a result from fresh network data.
  pub fn from_network(data: Option<Vec<u8>>) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// Create a result from the store (possibly a miss).
  pub fn from_cache(data: Option<Vec<u8>>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  /// Create a result for offline mode: the fetch failed, stored data is served.
  pub fn offline(data: Vec<u8>) -> Self {
    Self {
      data: Some(data),
      source: CacheSource::Offline,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Data from the network fetch
  Network,
  /// Data from the store, or a miss when `data` is `None`
  Cache,
  /// Network failed, serving stored data
  Offline,
}

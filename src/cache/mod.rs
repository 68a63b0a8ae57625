//! Request-level caching in front of network fetches.
//!
//! This module decides, per request, whether to read the local store,
//! whether to hit the network, and which result the caller receives:
//! - Cache keys derived from (url, method, body)
//! - Five cache rules, including stale-while-revalidate
//! - Pluggable stores: embedded SQLite or an in-process URL cache
//! - Background refreshes that never feed the original caller

mod key;
mod layer;
mod manager;
mod result;
mod rule;
mod storage;

pub use key::{build_body, build_key, RequestDescriptor};
pub use layer::CacheLayer;
pub use manager::CacheManager;
pub use result::{CacheResult, CacheSource};
pub use rule::CacheRule;
pub use storage::{CacheStore, CacheStoreKind, SqliteStorage, UrlCacheStorage};

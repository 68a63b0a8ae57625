use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::{CacheRule, CacheStoreKind};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Backing store for cached responses
  pub store: CacheStoreKind,
  /// SQLite file (defaults to the platform data directory)
  pub database_path: Option<PathBuf>,
  /// Rule used when a request doesn't pick one
  pub default_rule: CacheRule,
  /// HTTP request timeout in seconds
  pub timeout_secs: u64,
  /// Write logs to this file instead of stderr
  pub log_file: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      store: CacheStoreKind::default(),
      database_path: None,
      default_rule: CacheRule::default(),
      timeout_secs: 30,
      log_file: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./netcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/netcache/config.yaml
  ///
  /// Falls back to defaults when no file is found.
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("netcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("netcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(
      "store: url_cache\n\
       database_path: /tmp/netcache.db\n\
       default_rule: cache_and_url\n\
       timeout_secs: 5\n\
       log_file: /tmp/netcache.log\n",
    )
    .unwrap();

    assert_eq!(config.store, CacheStoreKind::UrlCache);
    assert_eq!(config.database_path, Some(PathBuf::from("/tmp/netcache.db")));
    assert_eq!(config.default_rule, CacheRule::CacheAndUrl);
    assert_eq!(config.timeout_secs, 5);
    assert_eq!(config.log_file, Some(PathBuf::from("/tmp/netcache.log")));
  }

  #[test]
  fn test_missing_fields_use_defaults() {
    let config = Config::parse("timeout_secs: 10\n").unwrap();
    assert_eq!(config.store, CacheStoreKind::Database);
    assert_eq!(config.default_rule, CacheRule::CacheOrUrl);
    assert_eq!(config.timeout_secs, 10);
    assert!(config.database_path.is_none());
  }

  #[test]
  fn test_unknown_rule_is_rejected() {
    assert!(Config::parse("default_rule: sometimes\n").is_err());
  }

  #[test]
  fn test_load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("netcache.yaml");
    std::fs::write(&path, "store: url_cache\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.store, CacheStoreKind::UrlCache);

    assert!(Config::load(Some(&dir.path().join("missing.yaml"))).is_err());
  }
}

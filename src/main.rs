use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use netcache::cache::{CacheManager, CacheRule, CacheStoreKind, RequestDescriptor};
use netcache::client::CachedClient;
use netcache::{config, logging};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "netcache")]
#[command(about = "Fetch URLs through a request-level cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/netcache/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Backing store to use, overriding the config file
  #[arg(long, value_enum, global = true)]
  store: Option<CacheStoreKind>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch a URL, applying a cache rule
  Get {
    url: String,

    /// HTTP method
    #[arg(short = 'X', long)]
    method: Option<String>,

    /// Request body, sent as-is
    #[arg(short, long)]
    data: Option<String>,

    /// Cache rule (default from config)
    #[arg(short, long, value_enum)]
    rule: Option<CacheRule>,
  },
  /// Remove every cached response
  Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override store if specified on command line
  let config = if let Some(store) = args.store {
    config::Config { store, ..config }
  } else {
    config
  };

  let _guard = logging::init(config.log_file.as_deref())?;

  match args.command {
    Command::Get {
      url,
      method,
      data,
      rule,
    } => {
      let mut request = RequestDescriptor::new(url);
      if let Some(method) = method {
        request = request.with_method(method);
      }
      if let Some(data) = data {
        request = request.with_body(data);
      }
      let rule = rule.unwrap_or(config.default_rule);

      let client = CachedClient::new(&config)?;
      let result = client.send(&request, rule).await?;
      tracing::info!(url = %request.url, ?rule, source = ?result.source, "request complete");

      // Let a background refresh land before the process exits
      client.cache().wait_for_refreshes().await;

      match result.data {
        Some(bytes) => std::io::stdout()
          .write_all(&bytes)
          .map_err(|e| eyre!("Failed to write response: {}", e))?,
        None => eprintln!("no data ({:?})", result.source),
      }
    }
    Command::Clear => {
      let manager = CacheManager::open(config.store, config.database_path.as_deref())?;
      manager.clear_cache();
    }
  }

  Ok(())
}

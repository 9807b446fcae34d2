//! QAlytics API server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) overlaid by
//! `QALYTICS_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.
//!
//! `token_secret` has no default and must be set, e.g.
//!
//! ```text
//! QALYTICS_TOKEN_SECRET=change-me cargo run -p qalytics-api --bin server
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use qalytics_api::{AppState, ServerConfig, TokenKeys};
use qalytics_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "QAlytics API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("QALYTICS"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if server_cfg.token_secret.is_empty() {
    anyhow::bail!("token_secret must not be empty");
  }
  let tokens = TokenKeys::new(
    server_cfg.token_secret.as_bytes(),
    server_cfg.token_ttl_hours,
  )
  .context("invalid token configuration")?;

  let db_path = expand_tilde(&server_cfg.database_path);
  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("failed to open database at {db_path:?}"))?;

  let state = AppState {
    store:  Arc::new(store),
    config: Arc::new(server_cfg.clone()),
    tokens: Arc::new(tokens),
  };

  let app = qalytics_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

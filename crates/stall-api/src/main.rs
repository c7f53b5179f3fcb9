//! stall server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) overlaid by
//! `STALL_*` environment variables, opens the SQLite store and serves the
//! marketplace API under `/api`.
//!
//! # Demo data
//!
//! ```
//! cargo run -p stall-api --bin server -- --seed
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use stall_api::{AppState, Marketplace, ServerConfig, seed, token::TokenService};
use stall_media::{Backend, MediaPipeline};
use stall_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Stall marketplace server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Insert the demo identities and products, then exit.
  #[arg(long)]
  seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  if server_cfg.jwt_secret.trim().is_empty() {
    anyhow::bail!("jwt_secret must not be empty");
  }

  // Expand `~` in store path.
  let db_path = expand_tilde(&server_cfg.database_path);

  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("failed to open store at {db_path:?}"))?;

  if cli.seed {
    let created = seed::seed(&store).await.context("seeding failed")?;
    tracing::info!(created, "seeding complete");
    return Ok(());
  }

  let backend = Backend::from_config(&server_cfg.media).context("failed to set up media backend")?;
  let media = MediaPipeline::from_config(backend, &server_cfg.media);
  let tokens = Arc::new(TokenService::new(
    server_cfg.jwt_secret.as_bytes(),
    chrono::Duration::minutes(server_cfg.token_ttl_minutes),
  ));
  let state = AppState::new(Marketplace::new(store, media, Arc::clone(&tokens)), tokens);

  let app = stall_api::app(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(backend = ?server_cfg.media.backend, "Listening on http://{address}/api");
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

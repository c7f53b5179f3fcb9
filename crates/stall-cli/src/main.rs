//! `stall`: command-line client for the Stall marketplace.
//!
//! # Usage
//!
//! ```
//! stall --url http://localhost:4000/api login --email alice@example.com
//! stall list --search chair --sort price:asc
//! stall create --title Lamp --description "Brass desk lamp" --price 25,50 --image ./lamp.jpg
//! ```

mod client;
mod credentials;
mod error;
mod middleware;
mod session;
#[cfg(test)]
mod testing;
mod transport;
mod upload;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use client::{ApiClient, ListQuery};
use credentials::FileCredentials;
use error::ClientError;
use middleware::Chain;
use serde::{Deserialize, Serialize};
use session::Session;
use stall_core::identity::{Credentials, Registration};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};
use transport::HttpTransport;
use upload::{ProductInput, ResilientUploader};
use uuid::Uuid;

const DEFAULT_URL: &str = "http://localhost:4000/api";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "stall", about = "Command-line client for the Stall marketplace")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the API (default: http://localhost:4000/api).
  #[arg(long, env = "STALL_URL")]
  url: Option<String>,

  /// Where the session token is kept
  /// (default: ~/.config/stall/credentials.toml).
  #[arg(long, value_name = "FILE", env = "STALL_CREDENTIALS")]
  credentials: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create an account and log in.
  Register {
    #[arg(long)]
    name:     String,
    #[arg(long)]
    email:    String,
    #[arg(long, env = "STALL_PASSWORD")]
    password: String,
  },
  Login {
    #[arg(long)]
    email:    String,
    #[arg(long, env = "STALL_PASSWORD")]
    password: String,
  },
  /// Forget the stored session token.
  Logout,
  /// Browse active listings.
  List {
    #[arg(long)]
    page:      Option<u32>,
    #[arg(long)]
    limit:     Option<u32>,
    #[arg(long)]
    search:    Option<String>,
    #[arg(long)]
    min_price: Option<String>,
    #[arg(long)]
    max_price: Option<String>,
    /// `field[:asc|desc]` with field one of createdAt, updatedAt, price, title.
    #[arg(long)]
    sort:      Option<String>,
  },
  Show {
    id: Uuid,
  },
  Create {
    #[arg(long)]
    title:       String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    price:       String,
    /// Local path or `file:` URI.
    #[arg(long)]
    image:       Option<String>,
  },
  /// Change only the given fields of one of your listings.
  Update {
    id:          Uuid,
    #[arg(long)]
    title:       Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    price:       Option<String>,
    #[arg(long)]
    active:      Option<bool>,
    #[arg(long)]
    image:       Option<String>,
  },
  Delete {
    id: Uuid,
  },
  /// Show a seller's public profile.
  Profile {
    user_id: Uuid,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| DEFAULT_URL.to_string());

  let credentials_path = args
    .credentials
    .or_else(FileCredentials::default_path)
    .ok_or_else(|| anyhow!("HOME is not set; pass --credentials"))?;

  let session = Session::new(Arc::new(FileCredentials::new(credentials_path)));
  let uploader = ResilientUploader::new(
    HttpTransport::new().context("failed to build HTTP client")?,
    HttpTransport::fallback().context("failed to build fallback HTTP client")?,
    Chain::standard(session.clone()),
    session,
  );
  let api = ApiClient::new(base_url, uploader);

  let outcome = run(&api, args.command).await;
  if let Err(ClientError::Api { errors, .. }) = &outcome {
    for e in errors {
      eprintln!("  {}: {}", e.field, e.message);
    }
  }
  Ok(outcome?)
}

async fn run(
  api: &ApiClient<HttpTransport, HttpTransport>,
  command: Command,
) -> Result<(), ClientError> {
  match command {
    Command::Register { name, email, password } => {
      let user = api.register(Registration { display_name: name, email, password }).await?;
      println!("registered {} <{}>", user.display_name, user.email);
    }
    Command::Login { email, password } => {
      let user = api.login(Credentials { email, password }).await?;
      println!("logged in as {} <{}>", user.display_name, user.email);
    }
    Command::Logout => {
      api.logout()?;
      println!("logged out");
    }
    Command::List { page, limit, search, min_price, max_price, sort } => {
      let query = ListQuery { page, limit, search, min_price, max_price, sort };
      let page = api.list(&query).await?;
      for product in &page.data {
        println!("{}  {:>10}  {}", product.id, product.price, product.title);
      }
      println!("page {} of {} ({} total)", page.page, page.total_pages, page.total);
    }
    Command::Show { id } => print_json(&api.get(id).await?)?,
    Command::Create { title, description, price, image } => {
      let input = ProductInput {
        title: Some(title),
        description: Some(description),
        price: Some(price),
        is_active: None,
        image,
      };
      print_json(&api.create(input).await?)?;
    }
    Command::Update { id, title, description, price, active, image } => {
      let input = ProductInput { title, description, price, is_active: active, image };
      print_json(&api.update(id, input).await?)?;
    }
    Command::Delete { id } => {
      if api.delete(id).await? {
        println!("deleted {id}");
      }
    }
    Command::Profile { user_id } => print_json(&api.profile(user_id).await?)?,
  }
  Ok(())
}

fn print_json(value: &impl Serialize) -> Result<(), ClientError> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

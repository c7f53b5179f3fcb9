//! Runtime server configuration, deserialised from `config.toml` and
//! `STALL_*` environment variables.

use std::path::PathBuf;

use serde::Deserialize;
use stall_media::MediaConfig;

use crate::token::DEFAULT_TTL_MINUTES;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_database_path")]
  pub database_path:     PathBuf,
  /// HMAC secret for session tokens.
  pub jwt_secret:        String,
  #[serde(default = "default_token_ttl")]
  pub token_ttl_minutes: i64,
  #[serde(default)]
  pub media:             MediaConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 4000 }
fn default_database_path() -> PathBuf { PathBuf::from("stall.db") }
fn default_token_ttl() -> i64 { DEFAULT_TTL_MINUTES }

impl ServerConfig {
  /// Load from an optional TOML file overlaid by the environment
  /// (`STALL_PORT`, `STALL_MEDIA__BACKEND`, ...).
  pub fn load(file: impl Into<PathBuf>) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(file.into()).required(false))
      .add_source(
        config::Environment::with_prefix("STALL")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use stall_media::BackendKind;

  fn from_toml(toml: &str) -> Result<ServerConfig, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()?
      .try_deserialize()
  }

  #[test]
  fn defaults_fill_everything_but_the_secret() {
    let cfg = from_toml(r#"jwt_secret = "s3cret""#).unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 4000);
    assert_eq!(cfg.database_path, PathBuf::from("stall.db"));
    assert_eq!(cfg.token_ttl_minutes, 60);
    assert_eq!(cfg.media.backend, BackendKind::Memory);
    assert_eq!(cfg.media.folder, "marketplace");
    assert_eq!(cfg.media.max_upload_bytes, 5 * 1024 * 1024);
    assert_eq!(cfg.media.max_edge, 1200);
    assert_eq!(cfg.media.quality, 80);
  }

  #[test]
  fn secret_is_required() {
    assert!(from_toml("port = 5000").is_err());
  }

  #[test]
  fn nested_media_section() {
    let cfg = from_toml(
      r#"
        jwt_secret = "x"
        [media]
        backend = "cloudinary"
        [media.cloudinary]
        cloud_name = "demo"
        api_key = "key"
        api_secret = "secret"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.media.backend, BackendKind::Cloudinary);
    let cloudinary = cfg.media.cloudinary.unwrap();
    assert_eq!(cloudinary.cloud_name, "demo");
    assert_eq!(cloudinary.base_url, "https://api.cloudinary.com/v1_1");
  }
}

//! Media settings, nested under `media` in the server configuration.

use serde::Deserialize;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_MAX_EDGE: u32 = 1200;
pub const DEFAULT_QUALITY: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
  #[default]
  Memory,
  Cloudinary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
  #[serde(default)]
  pub backend:          BackendKind,
  /// Remote folder every asset is uploaded under.
  #[serde(default = "default_folder")]
  pub folder:           String,
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes: usize,
  #[serde(default = "default_max_edge")]
  pub max_edge:         u32,
  /// JPEG quality, 1 to 100.
  #[serde(default = "default_quality")]
  pub quality:          u8,
  pub cloudinary:       Option<CloudinaryConfig>,
}

impl Default for MediaConfig {
  fn default() -> Self {
    Self {
      backend:          BackendKind::default(),
      folder:           default_folder(),
      max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
      max_edge:         DEFAULT_MAX_EDGE,
      quality:          DEFAULT_QUALITY,
      cloudinary:       None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
  pub cloud_name: String,
  pub api_key:    String,
  pub api_secret: String,
  #[serde(default = "default_base_url")]
  pub base_url:   String,
}

fn default_folder() -> String { "marketplace".to_owned() }
fn default_max_upload_bytes() -> usize { DEFAULT_MAX_UPLOAD_BYTES }
fn default_max_edge() -> u32 { DEFAULT_MAX_EDGE }
fn default_quality() -> u8 { DEFAULT_QUALITY }
fn default_base_url() -> String { "https://api.cloudinary.com/v1_1".to_owned() }

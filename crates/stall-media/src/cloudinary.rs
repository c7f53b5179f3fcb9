//! Cloudinary-compatible object store over the signed upload API.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{
  Client,
  multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use crate::{CloudinaryConfig, Error, ObjectStore, Result, StoredObject};

/// Async client for one Cloudinary cloud.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct CloudinaryStore {
  client: Client,
  config: CloudinaryConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
  secure_url: String,
  public_id:  String,
}

#[derive(Deserialize)]
struct DestroyResponse {
  result: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
  error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
  message: String,
}

impl CloudinaryStore {
  pub fn new(config: CloudinaryConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(Error::upstream)?;
    Ok(Self { client, config })
  }

  fn url(&self, action: &str) -> String {
    format!(
      "{}/{}/image/{action}",
      self.config.base_url.trim_end_matches('/'),
      self.config.cloud_name
    )
  }

  /// Build the signed part of a request: every signed parameter plus
  /// `api_key`, `signature` and `signature_algorithm`.
  fn signed_form(&self, params: &[(&str, String)]) -> Form {
    let signature = sign(params, &self.config.api_secret);
    let mut form = Form::new();
    for (key, value) in params {
      form = form.text(key.to_string(), value.clone());
    }
    form
      .text("api_key", self.config.api_key.clone())
      .text("signature", signature)
      .text("signature_algorithm", "sha256")
  }

  async fn post<T: DeserializeOwned>(&self, action: &str, form: Form) -> Result<T> {
    let resp = self
      .client
      .post(self.url(action))
      .multipart(form)
      .send()
      .await
      .map_err(Error::upstream)?;

    let status = resp.status();
    let body = resp.bytes().await.map_err(Error::upstream)?;
    if !status.is_success() {
      let message = serde_json::from_slice::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
      return Err(Error::upstream(format!("cloudinary {action} → {status}: {message}")));
    }
    serde_json::from_slice(&body).map_err(Error::upstream)
  }
}

impl ObjectStore for CloudinaryStore {
  async fn upload(&self, folder: &str, content_type: &str, bytes: Bytes) -> Result<StoredObject> {
    let params = [
      ("folder", folder.to_owned()),
      ("timestamp", chrono::Utc::now().timestamp().to_string()),
    ];
    let file = Part::bytes(bytes.to_vec())
      .file_name("upload.jpg")
      .mime_str(content_type)
      .map_err(Error::upstream)?;
    let form = self.signed_form(&params).part("file", file);

    let uploaded: UploadResponse = self.post("upload", form).await?;
    tracing::debug!(public_id = %uploaded.public_id, "uploaded image to cloudinary");
    Ok(StoredObject { url: uploaded.secure_url, asset_id: uploaded.public_id })
  }

  async fn delete(&self, asset_id: &str) -> Result<()> {
    let params = [
      ("public_id", asset_id.to_owned()),
      ("timestamp", chrono::Utc::now().timestamp().to_string()),
    ];
    let destroyed: DestroyResponse = self.post("destroy", self.signed_form(&params)).await?;
    match destroyed.result.as_str() {
      "ok" | "not found" => Ok(()),
      other => Err(Error::upstream(format!("cloudinary destroy {asset_id}: {other}"))),
    }
  }
}

/// Hex SHA-256 over the `key=value` pairs sorted by key and joined with `&`,
/// followed by the API secret.
fn sign(params: &[(&str, String)], secret: &str) -> String {
  let mut sorted: Vec<_> = params.iter().collect();
  sorted.sort_by_key(|(key, _)| *key);
  let joined = sorted
    .iter()
    .map(|(key, value)| format!("{key}={value}"))
    .collect::<Vec<_>>()
    .join("&");

  let mut hasher = Sha256::new();
  hasher.update(joined.as_bytes());
  hasher.update(secret.as_bytes());
  hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signature_sorts_params_and_appends_secret() {
    let params = [
      ("timestamp", "1315060510".to_owned()),
      ("folder", "marketplace".to_owned()),
    ];
    let expected = {
      let mut h = Sha256::new();
      h.update(b"folder=marketplace&timestamp=1315060510abcd");
      hex::encode(h.finalize())
    };
    assert_eq!(sign(&params, "abcd"), expected);
  }

  #[test]
  fn signature_depends_on_secret() {
    let params = [("public_id", "marketplace/x".to_owned())];
    assert_ne!(sign(&params, "a"), sign(&params, "b"));
    assert_eq!(sign(&params, "a").len(), 64);
  }

  #[test]
  fn urls_include_cloud_and_action() {
    let store = CloudinaryStore::new(CloudinaryConfig {
      cloud_name: "demo".into(),
      api_key:    "key".into(),
      api_secret: "secret".into(),
      base_url:   "https://api.cloudinary.com/v1_1/".into(),
    })
    .unwrap();
    assert_eq!(store.url("upload"), "https://api.cloudinary.com/v1_1/demo/image/upload");
    assert_eq!(store.url("destroy"), "https://api.cloudinary.com/v1_1/demo/image/destroy");
  }
}

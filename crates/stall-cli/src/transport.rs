//! The wire: outgoing requests, raw replies, and the reqwest-backed
//! transports that carry them.

use std::{future::Future, time::Duration};

use bytes::Bytes;
use reqwest::{Client, Method, header::HeaderMap};
use serde::{Deserialize, de::DeserializeOwned};
use stall_core::FieldError;

use crate::error::{ClientError, Result, TransportError};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

// ─── Request ─────────────────────────────────────────────────────────────────

/// A local file attached to a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
  pub field:        String,
  pub file_name:    String,
  pub content_type: String,
  pub bytes:        Bytes,
}

/// A multipart body kept in a rebuildable form, so the identical submission
/// can be sent again over another transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
  pub fields: Vec<(String, String)>,
  pub file:   Option<FilePart>,
}

impl Form {
  pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
    self.fields.push((name.to_owned(), value.into()));
    self
  }

  #[cfg(test)]
  pub fn field(&self, name: &str) -> Option<&str> {
    self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
  }

  fn to_multipart(&self) -> Result<reqwest::multipart::Form, TransportError> {
    let mut form = reqwest::multipart::Form::new();
    for (name, value) in &self.fields {
      form = form.text(name.clone(), value.clone());
    }
    if let Some(file) = &self.file {
      let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
        .file_name(file.file_name.clone())
        .mime_str(&file.content_type)
        .map_err(|e| TransportError::Other(e.to_string()))?;
      form = form.part(file.field.clone(), part);
    }
    Ok(form)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
  Empty,
  Json(serde_json::Value),
  Form(Form),
}

/// A fully described request, before any transport touches it.
#[derive(Debug, Clone)]
pub struct Outgoing {
  pub method:  Method,
  pub url:     String,
  pub headers: HeaderMap,
  pub payload: Payload,
  pub timeout: Duration,
}

impl Outgoing {
  pub fn new(method: Method, url: impl Into<String>) -> Self {
    Self {
      method,
      url: url.into(),
      headers: HeaderMap::new(),
      payload: Payload::Empty,
      timeout: REQUEST_TIMEOUT,
    }
  }

  pub fn json(mut self, body: serde_json::Value) -> Self {
    self.payload = Payload::Json(body);
    self
  }

  pub fn form(mut self, form: Form) -> Self {
    self.payload = Payload::Form(form);
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }
}

// ─── Reply ───────────────────────────────────────────────────────────────────

/// Whatever the server sent back, success or not.
#[derive(Debug, Clone)]
pub struct Reply {
  pub status: u16,
  pub body:   Bytes,
}

#[derive(Deserialize)]
struct Envelope {
  message: Option<String>,
  #[serde(default)]
  errors:  Vec<FieldError>,
}

impl Reply {
  pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

  /// Deserialize a success body, or surface the error envelope's message.
  pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
    if self.is_success() {
      return Ok(serde_json::from_slice(&self.body)?);
    }
    let envelope = serde_json::from_slice::<Envelope>(&self.body).ok();
    let (message, errors) = match envelope {
      Some(Envelope { message: Some(message), errors }) => (message, errors),
      Some(Envelope { message: None, errors }) => (self.fallback_message(), errors),
      None => (self.fallback_message(), Vec::new()),
    };
    Err(ClientError::Api { status: self.status, message, errors })
  }

  fn fallback_message(&self) -> String { format!("Request failed with status {}", self.status) }
}

// ─── Transports ──────────────────────────────────────────────────────────────

pub trait Transport: Send + Sync {
  fn send<'a>(
    &'a self,
    request: &'a Outgoing,
  ) -> impl Future<Output = Result<Reply, TransportError>> + Send + 'a;
}

/// A reqwest client.
#[derive(Clone)]
pub struct HttpTransport {
  client: Client,
}

impl HttpTransport {
  /// The primary transport: pooled connections, negotiated HTTP version.
  pub fn new() -> std::result::Result<Self, reqwest::Error> {
    let client = Client::builder().connect_timeout(Duration::from_secs(10)).build()?;
    Ok(Self { client })
  }

  /// The secondary transport: HTTP/1.1 only, a fresh connection per request.
  pub fn fallback() -> std::result::Result<Self, reqwest::Error> {
    let client = Client::builder()
      .http1_only()
      .pool_max_idle_per_host(0)
      .connect_timeout(Duration::from_secs(10))
      .build()?;
    Ok(Self { client })
  }
}

impl Transport for HttpTransport {
  async fn send(&self, request: &Outgoing) -> Result<Reply, TransportError> {
    let mut builder = self
      .client
      .request(request.method.clone(), &request.url)
      .headers(request.headers.clone())
      .timeout(request.timeout);

    builder = match &request.payload {
      Payload::Empty => builder,
      Payload::Json(body) => builder.json(body),
      Payload::Form(form) => builder.multipart(form.to_multipart()?),
    };

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    Ok(Reply { status, body })
  }
}

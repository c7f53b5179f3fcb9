//! An explicit, ordered request pipeline sitting between the API client and
//! a [`Transport`].
//!
//! Each step may adjust the outgoing request before it is sent and observe
//! the outcome afterwards. Steps are registered explicitly: nothing is
//! installed globally.

use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use tracing::debug;

use crate::{
  error::{ClientError, Result, TransportError},
  session::Session,
  transport::{Outgoing, Reply, Transport},
};

pub trait Step: Send + Sync {
  fn prepare(&self, _request: &mut Outgoing) -> Result<()> { Ok(()) }

  fn observe(
    &self,
    _request: &Outgoing,
    _outcome: &Result<Reply, TransportError>,
    _elapsed: Duration,
  ) {
  }
}

#[derive(Clone, Default)]
pub struct Chain {
  steps: Vec<Arc<dyn Step>>,
}

impl Chain {
  pub fn new() -> Self { Self::default() }

  pub fn with(mut self, step: impl Step + 'static) -> Self {
    self.steps.push(Arc::new(step));
    self
  }

  /// The standard chain: JSON accept header, bearer credential, exchange log.
  pub fn standard(session: Session) -> Self {
    Self::new()
      .with(AcceptJson)
      .with(BearerAuth::new(session))
      .with(LogExchange)
  }

  /// Run every `prepare` in registration order, then send.
  pub async fn send<T: Transport>(
    &self,
    transport: &T,
    mut request: Outgoing,
  ) -> Result<Result<Reply, TransportError>> {
    for step in &self.steps {
      step.prepare(&mut request)?;
    }
    Ok(self.dispatch(transport, &request).await)
  }

  /// Send a request whose headers were set by the caller. Steps still
  /// observe the outcome.
  pub async fn dispatch<T: Transport>(
    &self,
    transport: &T,
    request: &Outgoing,
  ) -> Result<Reply, TransportError> {
    let started = Instant::now();
    let outcome = transport.send(request).await;
    let elapsed = started.elapsed();
    for step in &self.steps {
      step.observe(request, &outcome, elapsed);
    }
    outcome
  }
}

// ─── Steps ───────────────────────────────────────────────────────────────────

pub struct AcceptJson;

impl Step for AcceptJson {
  fn prepare(&self, request: &mut Outgoing) -> Result<()> {
    request
      .headers
      .insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(())
  }
}

/// Attaches the stored session token, when there is one.
pub struct BearerAuth {
  session: Session,
}

impl BearerAuth {
  pub fn new(session: Session) -> Self { Self { session } }
}

impl Step for BearerAuth {
  fn prepare(&self, request: &mut Outgoing) -> Result<()> {
    if let Some(bearer) = self.session.bearer()? {
      request.headers.insert(AUTHORIZATION, bearer_header(&bearer)?);
    }
    Ok(())
  }
}

pub fn bearer_header(bearer: &str) -> Result<HeaderValue> {
  let mut value = HeaderValue::from_str(bearer)
    .map_err(|_| ClientError::Credentials("stored token is not a valid header value".into()))?;
  value.set_sensitive(true);
  Ok(value)
}

pub struct LogExchange;

impl Step for LogExchange {
  fn observe(
    &self,
    request: &Outgoing,
    outcome: &Result<Reply, TransportError>,
    elapsed: Duration,
  ) {
    let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    match outcome {
      Ok(reply) => debug!(method = %request.method, url = %request.url, status = reply.status, ms, "exchange"),
      Err(e) => debug!(method = %request.method, url = %request.url, error = %e, ms, "exchange failed"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{MemoryCredentials, Scripted};
  use reqwest::Method;

  #[tokio::test]
  async fn standard_chain_sets_headers() {
    let session = Session::new(Arc::new(MemoryCredentials::with_token("tok")));
    let transport = Scripted::new([Scripted::ok(200, "{}")]);

    Chain::standard(session)
      .send(&transport, Outgoing::new(Method::GET, "http://stall.test/api/products"))
      .await
      .unwrap()
      .unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].headers[ACCEPT], "application/json");
    assert_eq!(sent[0].headers[AUTHORIZATION], "Bearer tok");
  }

  #[tokio::test]
  async fn anonymous_requests_carry_no_bearer() {
    let session = Session::new(Arc::new(MemoryCredentials::default()));
    let transport = Scripted::new([Scripted::ok(200, "{}")]);

    Chain::standard(session)
      .send(&transport, Outgoing::new(Method::GET, "http://stall.test/api/products"))
      .await
      .unwrap()
      .unwrap();

    assert!(!transport.sent()[0].headers.contains_key(AUTHORIZATION));
  }
}

//! Async client for the Stall JSON API.

use reqwest::{Method, Url};
use serde::{Deserialize, de::DeserializeOwned};
use stall_core::{
  identity::{Credentials, PublicProfile, Registration, User},
  product::Product,
  query::Page,
};
use tracing::info;
use uuid::Uuid;

use crate::{
  error::{ClientError, Result},
  transport::{Outgoing, Transport},
  upload::{ProductInput, ResilientUploader},
};

/// Query parameters for `GET /products`.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
  pub page:      Option<u32>,
  pub limit:     Option<u32>,
  pub search:    Option<String>,
  pub min_price: Option<String>,
  pub max_price: Option<String>,
  pub sort:      Option<String>,
}

impl ListQuery {
  fn pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(page) = self.page {
      pairs.push(("page", page.to_string()));
    }
    if let Some(limit) = self.limit {
      pairs.push(("limit", limit.to_string()));
    }
    for (key, value) in [
      ("search", &self.search),
      ("minPrice", &self.min_price),
      ("maxPrice", &self.max_price),
      ("sort", &self.sort),
    ] {
      if let Some(value) = value {
        pairs.push((key, value.clone()));
      }
    }
    pairs
  }
}

#[derive(Deserialize)]
struct AuthReply {
  user:  User,
  token: Option<String>,
}

#[derive(Deserialize)]
struct ProductBody {
  product: Product,
}

#[derive(Deserialize)]
struct Deleted {
  success: bool,
}

pub struct ApiClient<P, F> {
  base_url: String,
  uploader: ResilientUploader<P, F>,
}

impl<P: Transport, F: Transport> ApiClient<P, F> {
  pub fn new(base_url: impl Into<String>, uploader: ResilientUploader<P, F>) -> Self {
    Self { base_url: base_url.into(), uploader }
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url.trim_end_matches('/'), path)
  }

  async fn call<R: DeserializeOwned>(&self, request: Outgoing) -> Result<R> {
    let reply = self
      .uploader
      .chain()
      .send(self.uploader.primary(), request)
      .await??;
    reply.decode()
  }

  fn require_session(&self) -> Result<()> {
    match self.uploader.session().bearer()? {
      Some(_) => Ok(()),
      None => Err(ClientError::Unauthenticated),
    }
  }

  // ── Auth ──────────────────────────────────────────────────────────────────

  /// `POST /auth/register`, then keep the returned token. Without one, log
  /// in with the same credentials.
  pub async fn register(&self, registration: Registration) -> Result<User> {
    let registration = registration.validate()?;
    let request = Outgoing::new(Method::POST, self.url("/auth/register"))
      .json(serde_json::to_value(&registration)?);
    let reply: AuthReply = self.call(request).await?;

    match reply.token {
      Some(token) => {
        self.uploader.session().start(&token)?;
        info!(user = %reply.user.id, "registered");
        Ok(reply.user)
      }
      None => {
        self
          .login(Credentials { email: registration.email, password: registration.password })
          .await
      }
    }
  }

  /// `POST /auth/login`
  pub async fn login(&self, credentials: Credentials) -> Result<User> {
    let credentials = credentials.validate()?;
    let request = Outgoing::new(Method::POST, self.url("/auth/login"))
      .json(serde_json::to_value(&credentials)?);
    let reply: AuthReply = self.call(request).await?;

    let token = reply
      .token
      .ok_or_else(|| ClientError::Invalid("login response carried no token".into()))?;
    self.uploader.session().start(&token)?;
    info!(user = %reply.user.id, "logged in");
    Ok(reply.user)
  }

  pub fn logout(&self) -> Result<()> { self.uploader.session().end() }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// `GET /products?...`
  pub async fn list(&self, query: &ListQuery) -> Result<Page<Product>> {
    let url = Url::parse_with_params(&self.url("/products"), query.pairs())
      .map_err(|e| ClientError::Invalid(format!("bad server url: {e}")))?;
    self.call(Outgoing::new(Method::GET, url.as_str())).await
  }

  /// `GET /products/:id`
  pub async fn get(&self, id: Uuid) -> Result<Product> {
    let body: ProductBody = self
      .call(Outgoing::new(Method::GET, self.url(&format!("/products/{id}"))))
      .await?;
    Ok(body.product)
  }

  /// `GET /users/:id`
  pub async fn profile(&self, id: Uuid) -> Result<PublicProfile> {
    self
      .call(Outgoing::new(Method::GET, self.url(&format!("/users/{id}"))))
      .await
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// `POST /products` through the resilient uploader.
  pub async fn create(&self, input: ProductInput) -> Result<Product> {
    input.check_create()?;
    let form = input.into_form().await?;
    self
      .uploader
      .submit(Method::POST, self.url("/products"), form)
      .await
  }

  /// `PUT /products/:id` through the resilient uploader.
  pub async fn update(&self, id: Uuid, input: ProductInput) -> Result<Product> {
    input.check_update()?;
    let form = input.into_form().await?;
    self
      .uploader
      .submit(Method::PUT, self.url(&format!("/products/{id}")), form)
      .await
  }

  /// `DELETE /products/:id`
  pub async fn delete(&self, id: Uuid) -> Result<bool> {
    self.require_session()?;
    let deleted: Deleted = self
      .call(Outgoing::new(Method::DELETE, self.url(&format!("/products/{id}"))))
      .await?;
    Ok(deleted.success)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use reqwest::header::AUTHORIZATION;
  use serde_json::json;

  use super::*;
  use crate::{
    credentials::CredentialStore,
    middleware::Chain,
    session::Session,
    testing::{MemoryCredentials, Scripted, product_body},
    transport::Payload,
  };

  fn client(
    primary: Scripted,
    credentials: Arc<MemoryCredentials>,
  ) -> ApiClient<Scripted, Scripted> {
    let session = Session::new(credentials);
    let uploader =
      ResilientUploader::new(primary, Scripted::new([]), Chain::standard(session.clone()), session);
    ApiClient::new("http://stall.test/api/", uploader)
  }

  fn auth_body(token: Option<&str>) -> String {
    json!({
      "user": {
        "id": "0b7e8a64-45a8-49e5-9b0c-51f4b9f0c6d2",
        "displayName": "Alice",
        "email": "alice@example.com",
      },
      "token": token,
    })
    .to_string()
  }

  fn alice() -> Registration {
    Registration {
      display_name: "Alice".into(),
      email:        "Alice@Example.com".into(),
      password:     "password123".into(),
    }
  }

  #[tokio::test]
  async fn register_stores_token() {
    let creds = Arc::new(MemoryCredentials::default());
    let api = client(Scripted::new([Scripted::ok(201, &auth_body(Some("tok")))]), creds.clone());

    let user = api.register(alice()).await.unwrap();
    assert_eq!(user.display_name, "Alice");
    assert_eq!(creds.get().unwrap().as_deref(), Some("tok"));

    let sent = api.uploader.primary().sent();
    assert_eq!(sent[0].url, "http://stall.test/api/auth/register");
    match &sent[0].payload {
      Payload::Json(body) => assert_eq!(body["email"], "alice@example.com"),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test]
  async fn register_without_token_logs_in() {
    let creds = Arc::new(MemoryCredentials::default());
    let api = client(
      Scripted::new([
        Scripted::ok(201, &auth_body(None)),
        Scripted::ok(200, &auth_body(Some("from-login"))),
      ]),
      creds.clone(),
    );

    api.register(alice()).await.unwrap();
    assert_eq!(creds.get().unwrap().as_deref(), Some("from-login"));
    assert_eq!(api.uploader.primary().sent()[1].url, "http://stall.test/api/auth/login");
  }

  #[tokio::test]
  async fn invalid_registration_never_leaves() {
    let api = client(Scripted::new([]), Arc::new(MemoryCredentials::default()));
    let err = api
      .register(Registration { password: "short".into(), ..alice() })
      .await
      .unwrap_err();
    assert!(err.to_string().contains("Password min length 8"));
    assert!(api.uploader.primary().sent().is_empty());
  }

  #[tokio::test]
  async fn rejected_login_surfaces_message() {
    let creds = Arc::new(MemoryCredentials::default());
    let api = client(
      Scripted::new([Scripted::ok(401, r#"{"status":"error","message":"Invalid credentials"}"#)]),
      creds.clone(),
    );

    let err = api
      .login(Credentials { email: "alice@example.com".into(), password: "nope".into() })
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(creds.get().unwrap(), None);
  }

  #[tokio::test]
  async fn logout_clears_the_token() {
    let creds = Arc::new(MemoryCredentials::with_token("tok"));
    let api = client(Scripted::new([]), creds.clone());
    api.logout().unwrap();
    assert_eq!(creds.get().unwrap(), None);
  }

  #[tokio::test]
  async fn list_encodes_query() {
    let page = json!({ "data": [], "page": 2, "totalPages": 1, "total": 0 }).to_string();
    let api = client(Scripted::new([Scripted::ok(200, &page)]), Arc::new(MemoryCredentials::default()));

    let query = ListQuery {
      page: Some(2),
      search: Some("oak chair".into()),
      sort: Some("price:asc".into()),
      ..Default::default()
    };
    let page = api.list(&query).await.unwrap();
    assert_eq!(page.page, 2);
    assert!(page.data.is_empty());

    let url = Url::parse(&api.uploader.primary().sent()[0].url).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
      pairs,
      vec![
        ("page".to_owned(), "2".to_owned()),
        ("search".to_owned(), "oak chair".to_owned()),
        ("sort".to_owned(), "price:asc".to_owned()),
      ]
    );
  }

  #[tokio::test]
  async fn get_reads_product_envelope() {
    let api = client(
      Scripted::new([Scripted::ok(200, &product_body("Chair"))]),
      Arc::new(MemoryCredentials::default()),
    );
    let id = Uuid::new_v4();
    let product = api.get(id).await.unwrap();
    assert_eq!(product.title, "Chair");
    assert_eq!(product.image, None);
    assert_eq!(
      api.uploader.primary().sent()[0].url,
      format!("http://stall.test/api/products/{id}")
    );
  }

  #[tokio::test]
  async fn delete_requires_a_session() {
    let api = client(Scripted::new([]), Arc::new(MemoryCredentials::default()));
    let err = api.delete(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated));
    assert!(api.uploader.primary().sent().is_empty());
  }

  #[tokio::test]
  async fn delete_sends_bearer() {
    let api = client(
      Scripted::new([Scripted::ok(200, r#"{"success":true}"#)]),
      Arc::new(MemoryCredentials::with_token("tok")),
    );
    assert!(api.delete(Uuid::new_v4()).await.unwrap());
    assert_eq!(api.uploader.primary().sent()[0].headers[AUTHORIZATION], "Bearer tok");
  }

  #[tokio::test]
  async fn create_validates_before_sending() {
    let api = client(Scripted::new([]), Arc::new(MemoryCredentials::with_token("tok")));
    let err = api
      .create(ProductInput { title: Some("Chair".into()), ..Default::default() })
      .await
      .unwrap_err();
    assert!(matches!(err, ClientError::Invalid(_)));
    assert!(api.uploader.primary().sent().is_empty());
  }

  #[tokio::test]
  async fn create_posts_form() {
    let api = client(
      Scripted::new([Scripted::ok(201, &product_body("Chair"))]),
      Arc::new(MemoryCredentials::with_token("tok")),
    );
    let product = api
      .create(ProductInput {
        title: Some("Chair".into()),
        description: Some("Solid oak".into()),
        price: Some("49.99".into()),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(product.title, "Chair");

    let sent = &api.uploader.primary().sent()[0];
    assert_eq!(sent.method, Method::POST);
    match &sent.payload {
      Payload::Form(form) => assert_eq!(form.field("price"), Some("49.99")),
      other => panic!("unexpected {other:?}"),
    }
  }
}

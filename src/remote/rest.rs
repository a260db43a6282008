//! Data client for a hosted PostgREST backend (the Supabase REST and auth APIs).

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use crate::config::BackendConfig;

use super::api_types::{ApiErrorBody, ApiTokenResponse};
use super::client::RemoteDataClient;
use super::error::{RemoteError, RemoteResult};
use super::types::{Filter, Order, Row, SessionUser};

/// Makes the data API answer with a bare object, or 406 when the filter
/// matched no row.
const OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";

/// Signed-in client for the backend's REST interface
#[derive(Clone)]
pub struct RestClient {
  http: reqwest::Client,
  base: Url,
  anon_key: String,
  access_token: String,
  user: SessionUser,
}

impl RestClient {
  /// Open a session with email and password.
  pub async fn sign_in(
    backend: &BackendConfig,
    anon_key: String,
    email: &str,
    password: &str,
  ) -> RemoteResult<Self> {
    let http = reqwest::Client::builder()
      .timeout(backend.timeout())
      .build()?;
    let base = base_url(&backend.url)?;

    let mut url = base.join("auth/v1/token")?;
    url.query_pairs_mut().append_pair("grant_type", "password");

    info!(email, "signing in");
    let response = http
      .post(url)
      .header("apikey", &anon_key)
      .json(&json!({ "email": email, "password": password }))
      .send()
      .await?;
    let body = check(response).await?.bytes().await?;
    let token: ApiTokenResponse = serde_json::from_slice(&body)?;

    let user = SessionUser::from(token.user);
    info!(user_id = %user.id, "signed in");

    Ok(Self {
      http,
      base,
      anon_key,
      access_token: token.access_token,
      user,
    })
  }

  pub fn user(&self) -> &SessionUser {
    &self.user
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    self
      .http
      .request(method, url)
      .header("apikey", &self.anon_key)
      .bearer_auth(&self.access_token)
  }
}

#[async_trait]
impl RemoteDataClient for RestClient {
  async fn select(
    &self,
    collection: &str,
    filters: &[Filter],
    order: Option<&Order>,
  ) -> RemoteResult<Vec<Row>> {
    let url = query_url(&self.base, collection, filters, order, true)?;
    debug!(collection, %url, "select");

    let response = self.request(Method::GET, url).send().await?;
    let body = check(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
  }

  async fn select_one(&self, collection: &str, filters: &[Filter]) -> RemoteResult<Row> {
    let url = query_url(&self.base, collection, filters, None, true)?;
    debug!(collection, %url, "select one");

    let response = self
      .request(Method::GET, url)
      .header(ACCEPT, OBJECT_MEDIA_TYPE)
      .send()
      .await?;
    let body = check(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
  }

  async fn insert(&self, collection: &str, record: Row) -> RemoteResult<()> {
    let url = collection_url(&self.base, collection)?;
    debug!(collection, %url, "insert");

    let response = self
      .request(Method::POST, url)
      .header("Prefer", "return=minimal")
      .json(&record)
      .send()
      .await?;
    check(response).await?;
    Ok(())
  }

  async fn delete(&self, collection: &str, filters: &[Filter]) -> RemoteResult<()> {
    let url = query_url(&self.base, collection, filters, None, false)?;
    debug!(collection, %url, "delete");

    let response = self.request(Method::DELETE, url).send().await?;
    check(response).await?;
    Ok(())
  }

  async fn sign_out(&self) -> RemoteResult<()> {
    let url = self.base.join("auth/v1/logout")?;
    info!(user_id = %self.user.id, "signing out");

    let response = self.request(Method::POST, url).send().await?;
    check(response).await?;
    Ok(())
  }
}

/// Project URL with a trailing slash so relative joins keep its path.
fn base_url(raw: &str) -> RemoteResult<Url> {
  let mut raw = raw.trim().to_string();
  if !raw.ends_with('/') {
    raw.push('/');
  }
  Ok(Url::parse(&raw)?)
}

fn collection_url(base: &Url, collection: &str) -> RemoteResult<Url> {
  Ok(base.join("rest/v1/")?.join(collection)?)
}

fn query_url(
  base: &Url,
  collection: &str,
  filters: &[Filter],
  order: Option<&Order>,
  select: bool,
) -> RemoteResult<Url> {
  let mut url = collection_url(base, collection)?;
  if !select && filters.is_empty() && order.is_none() {
    return Ok(url);
  }

  {
    let mut pairs = url.query_pairs_mut();
    if select {
      pairs.append_pair("select", "*");
    }
    for filter in filters {
      pairs.append_pair(&filter.column, &format!("eq.{}", filter.value_text()));
    }
    if let Some(order) = order {
      let direction = if order.ascending { "asc" } else { "desc" };
      pairs.append_pair("order", &format!("{}.{}", order.column, direction));
    }
  }
  Ok(url)
}

async fn check(response: Response) -> RemoteResult<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> RemoteError {
  let message = serde_json::from_str::<ApiErrorBody>(body)
    .ok()
    .and_then(ApiErrorBody::into_message)
    .or_else(|| {
      let text = body.trim();
      (!text.is_empty()).then(|| text.to_string())
    })
    .unwrap_or_else(|| {
      status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
    });

  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized(message),
    StatusCode::NOT_FOUND | StatusCode::NOT_ACCEPTABLE => RemoteError::NotFound(message),
    _ => RemoteError::Api {
      status: status.as_u16(),
      message,
    },
  }
}

//! Serde-deserializable types matching backend responses.
//!
//! The data API and the auth API report errors with different field names,
//! so `ApiErrorBody` accepts all of them.

use serde::Deserialize;

use super::types::SessionUser;

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  /// Data API (PostgREST) and most auth errors
  pub message: Option<String>,
  /// Older auth errors
  pub msg: Option<String>,
  /// OAuth-style auth errors
  pub error_description: Option<String>,
  pub error: Option<String>,
}

impl ApiErrorBody {
  pub fn into_message(self) -> Option<String> {
    self
      .message
      .or(self.msg)
      .or(self.error_description)
      .or(self.error)
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub id: String,
  pub email: Option<String>,
}

impl From<ApiUser> for SessionUser {
  fn from(user: ApiUser) -> Self {
    SessionUser {
      id: user.id,
      email: user.email,
    }
  }
}

/// Response of the password grant token endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiTokenResponse {
  pub access_token: String,
  pub user: ApiUser,
}

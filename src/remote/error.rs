use thiserror::Error;

/// Errors surfaced by a [`RemoteDataClient`](super::RemoteDataClient).
#[derive(Debug, Error)]
pub enum RemoteError {
  /// The request was valid but matched no row
  #[error("Not found: {0}")]
  NotFound(String),

  /// The session is missing, expired, or not allowed to touch the row
  #[error("Unauthorized: {0}")]
  Unauthorized(String),

  /// A write was attempted without a signed-in user
  #[error("Not authenticated")]
  NotAuthenticated,

  /// The backend rejected the request; `message` is the backend's own text
  #[error("{message}")]
  Api { status: u16, message: String },

  #[error("Request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("Invalid response: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("Invalid URL: {0}")]
  Url(#[from] url::ParseError),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

use async_trait::async_trait;

use super::error::RemoteResult;
use super::types::{Filter, Order, Row};

/// Request/response access to the hosted data store.
///
/// Owner scoping is enforced on the other side of this trait: implementations
/// only ever return or modify rows the current session may see.
#[async_trait]
pub trait RemoteDataClient: Send + Sync {
  /// All rows of `collection` matching every filter, in `order` if given.
  async fn select(
    &self,
    collection: &str,
    filters: &[Filter],
    order: Option<&Order>,
  ) -> RemoteResult<Vec<Row>>;

  /// Exactly one row; zero rows is [`RemoteError::NotFound`](super::RemoteError::NotFound).
  async fn select_one(&self, collection: &str, filters: &[Filter]) -> RemoteResult<Row>;

  async fn insert(&self, collection: &str, record: Row) -> RemoteResult<()>;

  async fn delete(&self, collection: &str, filters: &[Filter]) -> RemoteResult<()>;

  /// End the backend session.
  async fn sign_out(&self) -> RemoteResult<()> {
    Ok(())
  }
}

//! Write requests that invalidate cached queries once confirmed.

use super::client::QueryClient;
use super::key::QueryKey;
use std::future::Future;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A write request plus the cache keys it affects.
///
/// Keys are only touched after the request resolved successfully, so no
/// observer can see a refetch that races the write itself. One request runs
/// at a time; `mutate` refuses a second one while the first is pending.
pub struct Mutation<T> {
  client: QueryClient,
  invalidates: Vec<QueryKey>,
  removes: Vec<QueryKey>,
  receiver: Option<oneshot::Receiver<Result<T, String>>>,
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new(client: QueryClient) -> Self {
    Self {
      client,
      invalidates: Vec::new(),
      removes: Vec::new(),
      receiver: None,
    }
  }

  /// Invalidate every query under `prefix` after a successful request.
  pub fn invalidates(mut self, prefix: QueryKey) -> Self {
    self.invalidates.push(prefix);
    self
  }

  /// Drop the cached result for `key` after a successful request.
  pub fn removes(mut self, key: QueryKey) -> Self {
    self.removes.push(key);
    self
  }

  pub fn is_pending(&self) -> bool {
    self.receiver.is_some()
  }

  /// Start `request`. Returns `false` without running it if a request is
  /// already pending.
  pub fn mutate<Fut>(&mut self, request: Fut) -> bool
  where
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    if self.is_pending() {
      debug!("mutation already pending, ignoring");
      return false;
    }

    let (tx, rx) = oneshot::channel();
    let client = self.client.clone();
    let invalidates = self.invalidates.clone();
    let removes = self.removes.clone();

    tokio::spawn(async move {
      let result = request.await;
      match &result {
        Ok(_) => {
          for key in &removes {
            client.remove(key);
          }
          for prefix in &invalidates {
            client.invalidate(prefix);
          }
        }
        Err(e) => warn!(error = %e, "mutation failed"),
      }
      // Receiver is gone if the view was closed meanwhile
      let _ = tx.send(result);
    });

    self.receiver = Some(rx);
    true
  }

  /// Take the result of the pending request if it has arrived.
  pub fn poll(&mut self) -> Option<Result<T, String>> {
    let receiver = self.receiver.as_mut()?;
    match receiver.try_recv() {
      Ok(result) => {
        self.receiver = None;
        Some(result)
      }
      Err(oneshot::error::TryRecvError::Empty) => None,
      Err(oneshot::error::TryRecvError::Closed) => {
        self.receiver = None;
        Some(Err("Mutation was cancelled".to_string()))
      }
    }
  }
}

//! Observer handle for one cache entry.
//!
//! A view owns a `Query<T>` for each key it renders. The handle registers
//! itself with the [`QueryClient`] when fetched and unregisters on drop; the
//! event loop calls [`Query::poll`] on every tick to pick up entry changes.
//!
//! ```ignore
//! let notes = api.clone();
//! let mut query = Query::new(cache.clone(), notes_key(), move || {
//!   let notes = notes.clone();
//!   async move { notes.list().await.map_err(|e| e.to_string()) }
//! });
//!
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!   // State changed, trigger re-render
//! }
//! ```

use super::client::{downcast, erase, ErasedFetcher, ObserverId, QueryClient};
use super::key::QueryKey;
use super::state::QueryState;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

struct Subscription {
  id: ObserverId,
  receiver: mpsc::UnboundedReceiver<()>,
}

/// Typed observer of a cached query.
pub struct Query<T> {
  client: QueryClient,
  key: QueryKey,
  /// `None` for a disabled query, which never fetches
  fetcher: Option<ErasedFetcher>,
  subscription: Option<Subscription>,
  state: QueryState<Arc<T>>,
  fetching: bool,
}

impl<T: Send + Sync + 'static> Query<T> {
  /// Create an observer for `key`. Nothing is fetched until `fetch()`.
  pub fn new<F, Fut>(client: QueryClient, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      client,
      key,
      fetcher: Some(erase(fetcher)),
      subscription: None,
      state: QueryState::Idle,
      fetching: false,
    }
  }

  /// Create an observer that stays idle, for views missing the input the
  /// fetch needs.
  pub fn disabled(client: QueryClient, key: QueryKey) -> Self {
    Self {
      client,
      key,
      fetcher: None,
      subscription: None,
      state: QueryState::Idle,
      fetching: false,
    }
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn is_enabled(&self) -> bool {
    self.fetcher.is_some()
  }

  pub fn state(&self) -> &QueryState<Arc<T>> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data().map(|data| data.as_ref())
  }

  /// Shared handle to the data, for callers that keep it past the next poll.
  pub fn data_arc(&self) -> Option<Arc<T>> {
    self.state.data().cloned()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// True while a request is in flight, including background refetches of
  /// data that is already shown.
  pub fn is_fetching(&self) -> bool {
    self.fetching
  }

  /// Subscribe to the entry and read it through the cache.
  ///
  /// Fresh cached data is visible immediately; otherwise the entry moves to
  /// loading and the result arrives through `poll()`.
  pub fn fetch(&mut self) {
    let Some(fetcher) = self.fetcher.clone() else {
      return;
    };
    self.subscribe();
    self.client.ensure(&self.key, fetcher);
    self.sync();
  }

  /// Ask the backend again even if the cached entry is fresh.
  pub fn refetch(&mut self) {
    let Some(fetcher) = self.fetcher.clone() else {
      return;
    };
    self.subscribe();
    self.client.refetch(&self.key, fetcher);
    self.sync();
  }

  /// Apply pending entry changes.
  ///
  /// Returns `true` if the entry changed since the last poll.
  pub fn poll(&mut self) -> bool {
    let Some(subscription) = &mut self.subscription else {
      return false;
    };

    let mut changed = false;
    loop {
      match subscription.receiver.try_recv() {
        Ok(()) => changed = true,
        Err(mpsc::error::TryRecvError::Empty) => break,
        Err(mpsc::error::TryRecvError::Disconnected) => {
          // Entry was dropped from the cache, e.g. on teardown
          changed = true;
          break;
        }
      }
    }

    if changed {
      self.sync();
    }
    changed
  }

  fn subscribe(&mut self) {
    if self.subscription.is_none() {
      let (id, receiver) = self.client.subscribe(&self.key);
      self.subscription = Some(Subscription { id, receiver });
    }
  }

  fn sync(&mut self) {
    match self.client.snapshot(&self.key) {
      Some(snapshot) => {
        self.fetching = snapshot.fetching;
        self.state = match snapshot.state {
          QueryState::Idle => QueryState::Idle,
          QueryState::Loading => QueryState::Loading,
          QueryState::Error(e) => QueryState::Error(e),
          QueryState::Success(data) => match downcast::<T>(&self.key, data) {
            Ok(data) => QueryState::Success(data),
            Err(e) => QueryState::Error(e),
          },
        };
      }
      None => {
        self.fetching = false;
        self.state = QueryState::Idle;
      }
    }
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    if let Some(subscription) = self.subscription.take() {
      self.client.unsubscribe(&self.key, subscription.id);
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("fetching", &self.fetching)
      .finish_non_exhaustive()
  }
}

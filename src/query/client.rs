//! Process-wide query cache.
//!
//! `QueryClient` stores one entry per [`QueryKey`]. Reads go through
//! [`QueryClient::fetch`] (awaitable) or a [`Query`](super::Query) observer
//! (polled from the event loop). Both paths share the same in-flight request
//! for a key, so N concurrent reads of `["notes"]` reach the backend once.
//!
//! Mutations call [`QueryClient::invalidate`] with a key prefix once the
//! backend confirmed the write. Matching entries become stale; entries that
//! still have observers are refetched in the background, the rest wait for
//! their next read.

use super::key::QueryKey;
use super::state::QueryState;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Cached payload. Entries hold values of different types, so they are erased
/// here and downcast again by the typed accessors.
pub(crate) type AnyData = Arc<dyn Any + Send + Sync>;

type FetchResult = Result<AnyData, String>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Fetcher stored with an entry so invalidation can refetch it without the
/// original caller.
pub(crate) type ErasedFetcher = Arc<dyn Fn() -> BoxFuture<'static, FetchResult> + Send + Sync>;

pub(crate) fn erase<T, F, Fut>(fetcher: F) -> ErasedFetcher
where
  T: Send + Sync + 'static,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, String>> + Send + 'static,
{
  Arc::new(move || {
    let request = fetcher();
    async move { request.await.map(|data| Arc::new(data) as AnyData) }.boxed()
  })
}

pub(crate) fn downcast<T: Send + Sync + 'static>(
  key: &QueryKey,
  data: AnyData,
) -> Result<Arc<T>, String> {
  data
    .downcast::<T>()
    .map_err(|_| format!("cached value for {} has an unexpected type", key))
}

pub type ObserverId = u64;

/// Point-in-time copy of one entry, handed to observers.
#[derive(Clone)]
pub(crate) struct Snapshot {
  pub state: QueryState<AnyData>,
  pub fetching: bool,
  pub stale: bool,
}

/// Counters kept per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStats {
  pub fetches: u64,
  pub invalidations: u64,
  pub observers: usize,
  pub stale: bool,
}

struct CacheEntry {
  state: QueryState<AnyData>,
  stale: bool,
  fetched_at: Option<Instant>,
  /// Bumped whenever the in-flight request is replaced; results from an older
  /// generation are dropped on arrival.
  generation: u64,
  in_flight: Option<SharedFetch>,
  fetcher: Option<ErasedFetcher>,
  observers: HashMap<ObserverId, mpsc::UnboundedSender<()>>,
  fetches: u64,
  invalidations: u64,
}

impl CacheEntry {
  fn new() -> Self {
    Self {
      state: QueryState::Idle,
      stale: false,
      fetched_at: None,
      generation: 0,
      in_flight: None,
      fetcher: None,
      observers: HashMap::new(),
      fetches: 0,
      invalidations: 0,
    }
  }

  fn is_stale(&self, stale_time: Option<Duration>) -> bool {
    self.stale
      || match (stale_time, self.fetched_at) {
        (Some(limit), Some(at)) => at.elapsed() > limit,
        _ => false,
      }
  }

  fn notify(&mut self) {
    // Closed channels belong to observers that went away without unsubscribing
    self.observers.retain(|_, tx| tx.send(()).is_ok());
  }

  fn snapshot(&self, stale_time: Option<Duration>) -> Snapshot {
    Snapshot {
      state: self.state.clone(),
      fetching: self.in_flight.is_some(),
      stale: self.is_stale(stale_time),
    }
  }
}

struct CacheInner {
  entries: HashMap<QueryKey, CacheEntry>,
  next_observer: ObserverId,
}

enum Lookup {
  Hit(AnyData),
  Pending(SharedFetch),
}

/// Shared query cache. Cloning is cheap and every clone sees the same entries.
#[derive(Clone)]
pub struct QueryClient {
  inner: Arc<Mutex<CacheInner>>,
  /// Optional age after which data counts as stale even without invalidation
  stale_time: Option<Duration>,
}

impl QueryClient {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(CacheInner {
        entries: HashMap::new(),
        next_observer: 0,
      })),
      stale_time: None,
    }
  }

  /// Set the age after which cached data is refetched on the next read.
  ///
  /// `None` keeps data fresh until it is invalidated.
  pub fn with_stale_time(mut self, stale_time: Option<Duration>) -> Self {
    self.stale_time = stale_time;
    self
  }

  fn lock(&self) -> MutexGuard<'_, CacheInner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Read `key` through the cache.
  ///
  /// Returns fresh cached data without calling `fetcher`. Otherwise joins the
  /// request already in flight for `key`, or starts one.
  pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<Arc<T>, String>
  where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    let data = match self.lookup(key, erase(fetcher), false) {
      Lookup::Hit(data) => data,
      Lookup::Pending(request) => request.await?,
    };
    downcast(key, data)
  }

  /// Make sure `key` has data or a request in flight, without waiting.
  pub(crate) fn ensure(&self, key: &QueryKey, fetcher: ErasedFetcher) {
    let _ = self.lookup(key, fetcher, false);
  }

  /// Start a new request for `key` even if fresh data or a request exists.
  pub(crate) fn refetch(&self, key: &QueryKey, fetcher: ErasedFetcher) {
    let _ = self.lookup(key, fetcher, true);
  }

  fn lookup(&self, key: &QueryKey, fetcher: ErasedFetcher, force: bool) -> Lookup {
    let stale_time = self.stale_time;
    let mut inner = self.lock();
    let entry = inner
      .entries
      .entry(key.clone())
      .or_insert_with(CacheEntry::new);
    entry.fetcher = Some(Arc::clone(&fetcher));

    if !force {
      if let Some(request) = &entry.in_flight {
        debug!(%key, "joining in-flight fetch");
        return Lookup::Pending(request.clone());
      }
      if let QueryState::Success(data) = &entry.state {
        if !entry.is_stale(stale_time) {
          debug!(%key, "cache hit");
          return Lookup::Hit(Arc::clone(data));
        }
      }
    }

    Lookup::Pending(self.start_fetch(key, entry, fetcher))
  }

  /// Must be called with the cache lock held and `entry` taken from it.
  fn start_fetch(
    &self,
    key: &QueryKey,
    entry: &mut CacheEntry,
    fetcher: ErasedFetcher,
  ) -> SharedFetch {
    entry.generation += 1;
    entry.fetches += 1;
    let generation = entry.generation;

    let client = self.clone();
    let settle_key = key.clone();
    let request = fetcher();
    let shared = async move {
      let result = request.await;
      client.settle(&settle_key, generation, &result);
      result
    }
    .boxed()
    .shared();

    entry.in_flight = Some(shared.clone());
    if entry.state.data().is_none() {
      entry.state = QueryState::Loading;
    }
    entry.notify();

    // Observers only poll the cache, so the request is driven independently
    // of any awaiting caller
    tokio::spawn(shared.clone());
    debug!(%key, generation, "fetch started");

    shared
  }

  fn settle(&self, key: &QueryKey, generation: u64, result: &FetchResult) {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      return;
    };

    if entry.generation != generation {
      debug!(%key, generation, "discarding superseded fetch result");
      return;
    }

    entry.in_flight = None;
    match result {
      Ok(data) => {
        entry.state = QueryState::Success(Arc::clone(data));
        entry.stale = false;
        entry.fetched_at = Some(Instant::now());
        debug!(%key, generation, "fetch settled");
      }
      Err(e) => {
        warn!(%key, error = %e, "fetch failed");
        entry.state = QueryState::Error(e.clone());
      }
    }
    entry.notify();
  }

  /// Mark every entry whose key starts with `prefix` as stale.
  ///
  /// Observed entries are refetched right away; returns how many entries
  /// matched.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut inner = self.lock();
    let mut count = 0;

    for (key, entry) in inner
      .entries
      .iter_mut()
      .filter(|(key, _)| key.starts_with(prefix))
    {
      count += 1;
      entry.stale = true;
      entry.invalidations += 1;
      entry.generation += 1;
      entry.in_flight = None;

      let fetcher = entry
        .fetcher
        .clone()
        .filter(|_| !entry.observers.is_empty());
      match fetcher {
        Some(fetcher) => {
          let _ = self.start_fetch(key, entry, fetcher);
        }
        None => entry.notify(),
      }
    }

    debug!(%prefix, count, "invalidated queries");
    count
  }

  /// Drop the cached result for `key`.
  ///
  /// An entry that still has observers is reset to idle instead of removed so
  /// the observers keep their subscription.
  pub fn remove(&self, key: &QueryKey) {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      return;
    };

    if entry.observers.is_empty() {
      inner.entries.remove(key);
    } else {
      entry.generation += 1;
      entry.in_flight = None;
      entry.state = QueryState::Idle;
      entry.stale = true;
      entry.notify();
    }
    debug!(%key, "removed query");
  }

  /// Drop every entry. Used at session teardown.
  pub fn clear(&self) {
    let mut inner = self.lock();
    let count = inner.entries.len();
    inner.entries.clear();
    debug!(count, "query cache cleared");
  }

  pub(crate) fn subscribe(&self, key: &QueryKey) -> (ObserverId, mpsc::UnboundedReceiver<()>) {
    let mut inner = self.lock();
    inner.next_observer += 1;
    let id = inner.next_observer;
    let (tx, rx) = mpsc::unbounded_channel();
    inner
      .entries
      .entry(key.clone())
      .or_insert_with(CacheEntry::new)
      .observers
      .insert(id, tx);
    (id, rx)
  }

  pub(crate) fn unsubscribe(&self, key: &QueryKey, id: ObserverId) {
    if let Some(entry) = self.lock().entries.get_mut(key) {
      entry.observers.remove(&id);
    }
  }

  pub(crate) fn snapshot(&self, key: &QueryKey) -> Option<Snapshot> {
    let stale_time = self.stale_time;
    self
      .lock()
      .entries
      .get(key)
      .map(|entry| entry.snapshot(stale_time))
  }

  pub fn stats(&self, key: &QueryKey) -> Option<EntryStats> {
    let stale_time = self.stale_time;
    self.lock().entries.get(key).map(|entry| EntryStats {
      fetches: entry.fetches,
      invalidations: entry.invalidations,
      observers: entry.observers.len(),
      stale: entry.is_stale(stale_time),
    })
  }
}

impl Default for QueryClient {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  /// Fetcher that counts its calls and resolves to the call number.
  fn counting_fetcher(
    counter: Arc<AtomicU32>,
    delay: Duration,
  ) -> impl Fn() -> BoxFuture<'static, Result<u32, String>> + Clone + Send + Sync + 'static {
    move || {
      let counter = counter.clone();
      async move {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(delay).await;
        Ok(n)
      }
      .boxed()
    }
  }

  fn notes() -> QueryKey {
    QueryKey::new(["notes"])
  }

  fn value(client: &QueryClient, key: &QueryKey) -> Option<u32> {
    let snapshot = client.snapshot(key)?;
    let data = snapshot.state.data()?.clone();
    downcast::<u32>(key, data).ok().map(|v| *v)
  }

  #[tokio::test]
  async fn test_concurrent_fetches_share_one_request() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::from_millis(20));
    let key = notes();

    let (a, b) = tokio::join!(
      client.fetch(&key, fetcher.clone()),
      client.fetch(&key, fetcher)
    );

    assert_eq!(*a.unwrap(), 1);
    assert_eq!(*b.unwrap(), 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fresh_entry_is_served_from_cache() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::ZERO);
    let key = notes();

    client.fetch(&key, fetcher.clone()).await.unwrap();
    let second = client.fetch(&key, fetcher).await.unwrap();

    assert_eq!(*second, 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_error_is_stored_without_retry() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let calls = counter.clone();
    let fetcher = move || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err::<u32, _>("backend unavailable".to_string()) }
    };
    let key = notes();

    let result = client.fetch(&key, fetcher.clone()).await;
    assert_eq!(result.unwrap_err(), "backend unavailable");

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    let snapshot = client.snapshot(&key).unwrap();
    assert_eq!(snapshot.state.error(), Some("backend unavailable"));

    // Re-invoking the query is the retry
    let _ = client.fetch(&key, fetcher).await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_invalidate_matches_prefix_only() {
    let client = QueryClient::new();
    let list_calls = Arc::new(AtomicU32::new(0));
    let detail_calls = Arc::new(AtomicU32::new(0));
    let list = counting_fetcher(list_calls.clone(), Duration::ZERO);
    let detail = counting_fetcher(detail_calls.clone(), Duration::ZERO);
    let note = QueryKey::new(["note", "1"]);

    client.fetch(&notes(), list.clone()).await.unwrap();
    client.fetch(&note, detail.clone()).await.unwrap();

    assert_eq!(client.invalidate(&notes()), 1);

    assert_eq!(*client.fetch(&notes(), list).await.unwrap(), 2);
    assert_eq!(*client.fetch(&note, detail).await.unwrap(), 1);
    assert_eq!(client.stats(&notes()).unwrap().invalidations, 1);
    assert_eq!(client.stats(&note).unwrap().invalidations, 0);
  }

  #[tokio::test]
  async fn test_invalidate_refetches_observed_entries() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = notes();

    let (id, mut rx) = client.subscribe(&key);
    client.ensure(
      &key,
      erase(counting_fetcher(counter.clone(), Duration::ZERO)),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
    while rx.try_recv().is_ok() {}

    client.invalidate(&key);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!(rx.try_recv().is_ok());
    assert_eq!(value(&client, &key), Some(2));
    assert!(!client.stats(&key).unwrap().stale);

    client.unsubscribe(&key, id);
    assert_eq!(client.stats(&key).unwrap().observers, 0);
  }

  #[tokio::test]
  async fn test_invalidate_unobserved_entry_waits_for_next_read() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::ZERO);
    let key = notes();

    client.fetch(&key, fetcher.clone()).await.unwrap();
    client.invalidate(&key);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(client.stats(&key).unwrap().stale);

    assert_eq!(*client.fetch(&key, fetcher).await.unwrap(), 2);
  }

  #[tokio::test]
  async fn test_result_from_before_invalidation_is_discarded() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let calls = counter.clone();
    // First call is slow, later calls are fast
    let fetcher = move || {
      let calls = calls.clone();
      async move {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = if n == 1 { 80 } else { 10 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok::<_, String>(n)
      }
    };
    let key = notes();

    client.ensure(&key, erase(fetcher.clone()));
    tokio::time::sleep(Duration::from_millis(10)).await;
    client.invalidate(&key);

    assert_eq!(*client.fetch(&key, fetcher).await.unwrap(), 2);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(value(&client, &key), Some(2));
  }

  #[tokio::test]
  async fn test_zero_stale_time_refetches_every_read() {
    let client = QueryClient::new().with_stale_time(Some(Duration::ZERO));
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::ZERO);
    let key = notes();

    client.fetch(&key, fetcher.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    client.fetch(&key, fetcher).await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_remove_forgets_unobserved_entry() {
    let client = QueryClient::new();
    let key = QueryKey::new(["note", "1"]);
    client
      .fetch(&key, || async { Ok::<_, String>(1u32) })
      .await
      .unwrap();

    client.remove(&key);
    assert!(client.snapshot(&key).is_none());
  }
}

use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::query::{Mutation, Query, QueryClient, QueryKey};
use crate::remote::{Filter, Order, RemoteDataClient, RemoteError, RemoteResult, Row, SessionUser};

use super::types::{NewNote, Note};

pub const COLLECTION: &str = "notes";
const OWNER_COLUMN: &str = "user_id";

/// Key of the notes list. Invalidating it refreshes every dashboard.
pub fn notes_key() -> QueryKey {
  QueryKey::new([COLLECTION])
}

pub fn note_key(id: &str) -> QueryKey {
  QueryKey::new(["note", id])
}

/// Note operations against the remote data client, scoped to the session user
#[derive(Clone)]
pub struct NotesApi {
  remote: Arc<dyn RemoteDataClient>,
  user: Option<SessionUser>,
}

impl NotesApi {
  pub fn new(remote: Arc<dyn RemoteDataClient>, user: Option<SessionUser>) -> Self {
    Self { remote, user }
  }

  pub fn user(&self) -> Option<&SessionUser> {
    self.user.as_ref()
  }

  fn owner_filters(&self) -> Vec<Filter> {
    self
      .user
      .iter()
      .map(|user| Filter::eq(OWNER_COLUMN, user.id.as_str()))
      .collect()
  }

  fn id_filters(&self, id: &str) -> Vec<Filter> {
    let mut filters = vec![Filter::eq("id", id)];
    filters.extend(self.owner_filters());
    filters
  }

  /// The user's notes, newest first.
  pub async fn list(&self) -> RemoteResult<Vec<Note>> {
    let rows = self
      .remote
      .select(
        COLLECTION,
        &self.owner_filters(),
        Some(&Order::desc("created_at")),
      )
      .await?;
    rows.into_iter().map(decode).collect()
  }

  pub async fn get(&self, id: &str) -> RemoteResult<Note> {
    let row = self
      .remote
      .select_one(COLLECTION, &self.id_filters(id))
      .await?;
    decode(row)
  }

  pub async fn create(&self, title: &str, content: &str) -> RemoteResult<()> {
    let user = self.user.as_ref().ok_or(RemoteError::NotAuthenticated)?;
    let note = NewNote::from_input(title, content, user.id.as_str());
    info!(title = %note.title, "creating note");
    self.remote.insert(COLLECTION, note.into_row()).await
  }

  pub async fn delete(&self, id: &str) -> RemoteResult<()> {
    info!(id, "deleting note");
    self.remote.delete(COLLECTION, &self.id_filters(id)).await
  }

  pub async fn sign_out(&self) -> RemoteResult<()> {
    self.remote.sign_out().await
  }

  /// Observer of the notes list.
  pub fn list_query(&self, cache: &QueryClient) -> Query<Vec<Note>> {
    let api = self.clone();
    Query::new(cache.clone(), notes_key(), move || {
      let api = api.clone();
      async move { api.list().await.map_err(|e| e.to_string()) }
    })
  }

  /// Observer of one note. Without an id the query never fetches.
  pub fn note_query(&self, cache: &QueryClient, id: Option<&str>) -> Query<Note> {
    let Some(id) = id else {
      return Query::disabled(cache.clone(), QueryKey::new(["note"]));
    };
    let api = self.clone();
    let owned = id.to_string();
    Query::new(cache.clone(), note_key(id), move || {
      let api = api.clone();
      let id = owned.clone();
      async move { api.get(&id).await.map_err(|e| e.to_string()) }
    })
  }

  /// Creation refreshes the list once the insert is confirmed.
  pub fn create_mutation(cache: &QueryClient) -> Mutation<()> {
    Mutation::new(cache.clone()).invalidates(notes_key())
  }

  /// Deletion drops the note's own entry and refreshes the list.
  pub fn delete_mutation(cache: &QueryClient, id: &str) -> Mutation<()> {
    Mutation::new(cache.clone())
      .removes(note_key(id))
      .invalidates(notes_key())
  }

  /// Start creating a note on `mutation`. Returns `false` if one is pending.
  pub fn start_create(&self, mutation: &mut Mutation<()>, title: &str, content: &str) -> bool {
    let api = self.clone();
    let title = title.to_string();
    let content = content.to_string();
    mutation.mutate(async move {
      api
        .create(&title, &content)
        .await
        .map_err(|e| e.to_string())
    })
  }

  /// Start deleting note `id` on `mutation`. Returns `false` if one is pending.
  pub fn start_delete(&self, mutation: &mut Mutation<()>, id: &str) -> bool {
    let api = self.clone();
    let id = id.to_string();
    mutation.mutate(async move { api.delete(&id).await.map_err(|e| e.to_string()) })
  }
}

fn decode(row: Row) -> RemoteResult<Note> {
  Ok(serde_json::from_value(Value::Object(row))?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notes::types::UNTITLED;
  use crate::remote::MemoryClient;
  use serde_json::json;
  use std::time::Duration;

  fn row(value: Value) -> Row {
    match value {
      Value::Object(map) => map,
      _ => Row::new(),
    }
  }

  fn user() -> SessionUser {
    SessionUser {
      id: "me".to_string(),
      email: Some("me@example.com".to_string()),
    }
  }

  fn seeded() -> NotesApi {
    let remote = MemoryClient::new("me").with_rows(
      COLLECTION,
      vec![
        row(json!({"id": "a", "title": "First", "content": "one", "user_id": "me",
                   "created_at": "2024-01-01T09:00:00Z"})),
        row(json!({"id": "b", "title": "Second", "content": null, "user_id": "me",
                   "created_at": "2024-02-01T09:00:00Z"})),
      ],
    );
    NotesApi::new(Arc::new(remote), Some(user()))
  }

  async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
  }

  #[tokio::test]
  async fn test_list_is_newest_first() {
    let notes = seeded().list().await.unwrap();
    let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
  }

  #[tokio::test]
  async fn test_get_missing_note_is_not_found() {
    let err = seeded().get("nope").await.unwrap_err();
    assert!(matches!(err, RemoteError::NotFound(_)));
  }

  #[tokio::test]
  async fn test_blank_title_is_saved_as_untitled() {
    let api = NotesApi::new(Arc::new(MemoryClient::new("me")), Some(user()));
    api.create("  ", "Hello").await.unwrap();

    let notes = api.list().await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, UNTITLED);
    assert_eq!(notes[0].content.as_deref(), Some("Hello"));
    assert_eq!(notes[0].user_id.as_deref(), Some("me"));
  }

  #[tokio::test]
  async fn test_create_without_session_fails() {
    let api = NotesApi::new(Arc::new(MemoryClient::new("me")), None);
    let err = api.create("t", "c").await.unwrap_err();
    assert_eq!(err.to_string(), "Not authenticated");
  }

  #[tokio::test]
  async fn test_created_note_appears_after_list_refresh() {
    let api = seeded();
    let cache = QueryClient::new();
    let mut list = api.list_query(&cache);
    list.fetch();
    settle().await;
    list.poll();
    assert_eq!(list.data().map(Vec::len), Some(2));

    let mut create = NotesApi::create_mutation(&cache);
    assert!(api.start_create(&mut create, "Third", ""));
    settle().await;
    assert_eq!(create.poll(), Some(Ok(())));

    settle().await;
    list.poll();
    let notes = list.data().unwrap();
    assert_eq!(notes.len(), 3);
    assert_eq!(notes[0].title, "Third");
  }

  #[tokio::test]
  async fn test_deleted_note_is_gone_from_next_list_read() {
    let api = seeded();
    let cache = QueryClient::new();
    let list_api = api.clone();
    let before = cache
      .fetch(&notes_key(), move || {
        let api = list_api.clone();
        async move { api.list().await.map_err(|e| e.to_string()) }
      })
      .await
      .unwrap();
    assert!(before.iter().any(|n| n.id == "a"));

    let mut delete = NotesApi::delete_mutation(&cache, "a");
    assert!(api.start_delete(&mut delete, "a"));
    settle().await;
    assert_eq!(delete.poll(), Some(Ok(())));
    assert_eq!(cache.stats(&notes_key()).unwrap().invalidations, 1);

    let list_api = api.clone();
    let after = cache
      .fetch(&notes_key(), move || {
        let api = list_api.clone();
        async move { api.list().await.map_err(|e| e.to_string()) }
      })
      .await
      .unwrap();
    assert!(after.iter().all(|n| n.id != "a"));
  }

  #[tokio::test]
  async fn test_note_query_without_id_is_idle() {
    let cache = QueryClient::new();
    let mut query = seeded().note_query(&cache, None);
    query.fetch();
    settle().await;
    assert!(!query.is_enabled());
    assert!(query.state().is_idle());
  }

  #[tokio::test]
  async fn test_note_query_loads_note() {
    let cache = QueryClient::new();
    let mut query = seeded().note_query(&cache, Some("b"));
    query.fetch();
    settle().await;
    query.poll();
    let note = query.data().unwrap();
    assert_eq!(note.title, "Second");
    assert_eq!(note.body(), crate::notes::NO_CONTENT);
  }
}

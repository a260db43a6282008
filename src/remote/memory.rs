//! In-memory data store for demo mode and tests.
//!
//! Behaves like the hosted backend as far as this app can tell: it assigns
//! `id` and `created_at` on insert and only exposes rows owned by its user.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

use super::client::RemoteDataClient;
use super::error::{RemoteError, RemoteResult};
use super::types::{Filter, Order, Row};

const OWNER_COLUMN: &str = "user_id";

pub struct MemoryClient {
  user_id: String,
  collections: Mutex<HashMap<String, Vec<Row>>>,
}

impl MemoryClient {
  pub fn new(user_id: impl Into<String>) -> Self {
    Self {
      user_id: user_id.into(),
      collections: Mutex::new(HashMap::new()),
    }
  }

  /// Seed `collection` with rows, stored as given.
  pub fn with_rows(self, collection: &str, rows: Vec<Row>) -> Self {
    self
      .lock()
      .entry(collection.to_string())
      .or_default()
      .extend(rows);
    self
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Row>>> {
    self
      .collections
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  fn is_owned(&self, row: &Row) -> bool {
    row.get(OWNER_COLUMN).and_then(Value::as_str) == Some(self.user_id.as_str())
  }

  fn visible(&self, row: &Row, filters: &[Filter]) -> bool {
    self.is_owned(row) && filters.iter().all(|f| f.matches(row))
  }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  match (a, b) {
    (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
    (Some(Value::Number(a)), Some(Value::Number(b))) => a
      .as_f64()
      .partial_cmp(&b.as_f64())
      .unwrap_or(Ordering::Equal),
    (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
    (None | Some(Value::Null), _) => Ordering::Less,
    (_, None | Some(Value::Null)) => Ordering::Greater,
    _ => Ordering::Equal,
  }
}

#[async_trait]
impl RemoteDataClient for MemoryClient {
  async fn select(
    &self,
    collection: &str,
    filters: &[Filter],
    order: Option<&Order>,
  ) -> RemoteResult<Vec<Row>> {
    let mut rows: Vec<Row> = self
      .lock()
      .get(collection)
      .map(|rows| {
        rows
          .iter()
          .filter(|row| self.visible(row, filters))
          .cloned()
          .collect()
      })
      .unwrap_or_default();

    if let Some(order) = order {
      rows.sort_by(|a, b| {
        let ordering = compare_values(a.get(&order.column), b.get(&order.column));
        if order.ascending {
          ordering
        } else {
          ordering.reverse()
        }
      });
    }

    debug!(collection, count = rows.len(), "memory select");
    Ok(rows)
  }

  async fn select_one(&self, collection: &str, filters: &[Filter]) -> RemoteResult<Row> {
    self
      .lock()
      .get(collection)
      .and_then(|rows| rows.iter().find(|row| self.visible(row, filters)).cloned())
      .ok_or_else(|| RemoteError::NotFound(format!("no matching row in {}", collection)))
  }

  async fn insert(&self, collection: &str, mut record: Row) -> RemoteResult<()> {
    if !self.is_owned(&record) {
      return Err(RemoteError::Unauthorized(
        "new row violates row-level security policy".to_string(),
      ));
    }

    record
      .entry("id")
      .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    record.entry("created_at").or_insert_with(|| {
      Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
    });

    debug!(collection, "memory insert");
    self
      .lock()
      .entry(collection.to_string())
      .or_default()
      .push(record);
    Ok(())
  }

  async fn delete(&self, collection: &str, filters: &[Filter]) -> RemoteResult<()> {
    let mut collections = self.lock();
    if let Some(rows) = collections.get_mut(collection) {
      let before = rows.len();
      rows.retain(|row| !self.visible(row, filters));
      debug!(collection, removed = before - rows.len(), "memory delete");
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn row(value: Value) -> Row {
    match value {
      Value::Object(map) => map,
      _ => Row::new(),
    }
  }

  fn seeded() -> MemoryClient {
    MemoryClient::new("me").with_rows(
      "notes",
      vec![
        row(json!({"id": "a", "title": "old", "user_id": "me", "created_at": "2024-01-01T00:00:00Z"})),
        row(json!({"id": "b", "title": "new", "user_id": "me", "created_at": "2024-03-01T00:00:00Z"})),
        row(json!({"id": "c", "title": "theirs", "user_id": "other", "created_at": "2024-02-01T00:00:00Z"})),
      ],
    )
  }

  fn ids(rows: &[Row]) -> Vec<&str> {
    rows
      .iter()
      .filter_map(|r| r.get("id").and_then(Value::as_str))
      .collect()
  }

  #[tokio::test]
  async fn test_select_is_owner_scoped_and_ordered() {
    let client = seeded();
    let rows = client
      .select("notes", &[], Some(&Order::desc("created_at")))
      .await
      .unwrap();
    assert_eq!(ids(&rows), vec!["b", "a"]);
  }

  #[tokio::test]
  async fn test_select_one_of_foreign_row_is_not_found() {
    let client = seeded();
    let err = client
      .select_one("notes", &[Filter::eq("id", "c")])
      .await
      .unwrap_err();
    assert!(matches!(err, RemoteError::NotFound(_)));
  }

  #[tokio::test]
  async fn test_insert_assigns_id_and_timestamp() {
    let client = MemoryClient::new("me");
    client
      .insert("notes", row(json!({"title": "t", "user_id": "me"})))
      .await
      .unwrap();

    let rows = client.select("notes", &[], None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].get("id").and_then(Value::as_str).is_some());
    assert!(rows[0].get("created_at").and_then(Value::as_str).is_some());
  }

  #[tokio::test]
  async fn test_insert_for_another_user_is_rejected() {
    let client = MemoryClient::new("me");
    let err = client
      .insert("notes", row(json!({"title": "t", "user_id": "other"})))
      .await
      .unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized(_)));
  }

  #[tokio::test]
  async fn test_delete_leaves_foreign_rows() {
    let client = seeded();
    client
      .delete("notes", &[Filter::eq("id", "c")])
      .await
      .unwrap();
    client
      .delete("notes", &[Filter::eq("id", "a")])
      .await
      .unwrap();

    let rows = client.select("notes", &[], None).await.unwrap();
    assert_eq!(ids(&rows), vec!["b"]);
    assert_eq!(client.lock().get("notes").map(Vec::len), Some(2));
  }
}

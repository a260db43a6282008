use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::remote::Row;

/// Title stored when the title input is blank
pub const UNTITLED: &str = "Untitled";
/// Shown in place of missing or empty content
pub const NO_CONTENT: &str = "No content";
/// Characters of content shown on a note card
pub const PREVIEW_CHARS: usize = 120;

/// A note as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub content: Option<String>,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub user_id: Option<String>,
}

impl Note {
  /// Content shortened for the card view.
  pub fn preview(&self) -> String {
    content_preview(self.content.as_deref())
  }

  /// Full content, or the placeholder when there is none.
  pub fn body(&self) -> &str {
    match self.content.as_deref() {
      Some(content) if !content.is_empty() => content,
      _ => NO_CONTENT,
    }
  }

  pub fn card_date(&self) -> String {
    format_card_date(&self.created_at.with_timezone(&Local))
  }

  pub fn created_label(&self) -> String {
    format_created_label(&self.created_at.with_timezone(&Local))
  }
}

/// First `PREVIEW_CHARS` characters followed by "..." when longer.
pub fn content_preview(content: Option<&str>) -> String {
  match content {
    None | Some("") => NO_CONTENT.to_string(),
    Some(text) => match text.char_indices().nth(PREVIEW_CHARS) {
      Some((cut, _)) => format!("{}...", &text[..cut]),
      None => text.to_string(),
    },
  }
}

pub fn format_card_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
  Tz::Offset: fmt::Display,
{
  at.format("%b %-d, %Y").to_string()
}

pub fn format_created_label<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
  Tz::Offset: fmt::Display,
{
  at.format("Created on %B %-d, %Y at %-I:%M %p").to_string()
}

/// Insert payload built from the creation form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewNote {
  pub title: String,
  pub content: String,
  pub user_id: String,
}

impl NewNote {
  /// Title is trimmed and defaults to "Untitled"; content is kept as typed.
  pub fn from_input(title: &str, content: &str, user_id: impl Into<String>) -> Self {
    let title = title.trim();
    Self {
      title: if title.is_empty() {
        UNTITLED.to_string()
      } else {
        title.to_string()
      },
      content: content.to_string(),
      user_id: user_id.into(),
    }
  }

  pub fn into_row(self) -> Row {
    let mut row = Row::new();
    row.insert("title".to_string(), Value::String(self.title));
    row.insert("content".to_string(), Value::String(self.content));
    row.insert("user_id".to_string(), Value::String(self.user_id));
    row
  }
}

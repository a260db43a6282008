//! Notes domain: the note model and its backend operations.

mod api;
mod types;

pub use api::{note_key, notes_key, NotesApi, COLLECTION};
pub use types::{
  content_preview, format_card_date, format_created_label, NewNote, Note, NO_CONTENT,
  PREVIEW_CHARS, UNTITLED,
};

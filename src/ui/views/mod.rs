mod note_detail;
mod note_list;

pub use note_detail::{detail_status, DetailStatus, NoteDetailView};
pub use note_list::{list_status, ListStatus, NoteListView};

use super::delete_confirm::{DeleteConfirm, DeleteOutcome, DeletePhase};
use crate::context::AppContext;
use crate::notes::Note;
use crate::ui::renderfns::truncate;
use ratatui::prelude::*;
use ratatui::widgets::ListItem;

/// Summary of one note in the list: title, content preview, date and its
/// own delete dialog.
pub struct NoteCard {
  note: Note,
  delete: DeleteConfirm,
}

impl NoteCard {
  pub fn new(ctx: &AppContext, note: Note) -> Self {
    let delete = DeleteConfirm::new(ctx, &note.id);
    Self { note, delete }
  }

  pub fn id(&self) -> &str {
    &self.note.id
  }

  pub fn note(&self) -> &Note {
    &self.note
  }

  /// Replace the shown note with a fresher copy, keeping dialog state.
  pub fn update(&mut self, note: Note) {
    self.note = note;
  }

  pub fn delete(&self) -> &DeleteConfirm {
    &self.delete
  }

  pub fn delete_mut(&mut self) -> &mut DeleteConfirm {
    &mut self.delete
  }

  pub fn poll(&mut self) -> Option<DeleteOutcome> {
    self.delete.poll()
  }

  pub fn list_item(&self, width: usize) -> ListItem<'static> {
    let mut title = vec![Span::styled(
      truncate(&self.note.title, width),
      Style::default().fg(Color::Cyan).bold(),
    )];
    if self.delete.phase() == DeletePhase::InFlight {
      title.push(Span::styled(
        "  (deleting...)",
        Style::default().fg(Color::Red),
      ));
    }

    let preview = self.note.preview().replace('\n', " ");
    ListItem::new(vec![
      Line::from(title),
      Line::from(Span::styled(
        truncate(&preview, width),
        Style::default().fg(Color::Gray),
      )),
      Line::from(Span::styled(
        self.note.card_date(),
        Style::default().fg(Color::DarkGray),
      )),
      Line::from(""),
    ])
  }

  pub fn render_dialog(&self, frame: &mut Frame, area: Rect) {
    self.delete.render(frame, area, &self.note.title);
  }
}

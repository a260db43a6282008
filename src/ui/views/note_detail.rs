use crate::context::AppContext;
use crate::notes::Note;
use crate::query::{Query, QueryState};
use crate::ui::components::{DeleteConfirm, DeleteOutcome};
use crate::ui::renderfns::truncate;
use crate::ui::view::{Route, ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tracing::{info, warn};

/// What the detail view shows.
///
/// A missing row and a failed request both end up as `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailStatus {
  Loading,
  NotFound,
  Loaded,
}

pub fn detail_status<T>(state: &QueryState<T>, enabled: bool) -> DetailStatus {
  match state {
    QueryState::Success(_) => DetailStatus::Loaded,
    QueryState::Error(_) => DetailStatus::NotFound,
    QueryState::Loading => DetailStatus::Loading,
    QueryState::Idle if enabled => DetailStatus::Loading,
    QueryState::Idle => DetailStatus::NotFound,
  }
}

/// Full view of one note
pub struct NoteDetailView {
  id: Option<String>,
  query: Query<Note>,
  delete: Option<DeleteConfirm>,
}

impl NoteDetailView {
  /// Without an id the view goes straight to not-found.
  pub fn new(ctx: &AppContext, id: Option<String>) -> Self {
    let mut query = ctx.notes.note_query(&ctx.cache, id.as_deref());
    query.fetch();
    let delete = id.as_deref().map(|id| DeleteConfirm::new(ctx, id));

    Self { id, query, delete }
  }

  pub fn status(&self) -> DetailStatus {
    detail_status(self.query.state(), self.query.is_enabled())
  }

  pub fn delete(&self) -> Option<&DeleteConfirm> {
    self.delete.as_ref()
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let status = self.status();
    let title = match (status, self.query.data()) {
      (DetailStatus::Loading, _) => " Note (loading...) ".to_string(),
      (DetailStatus::Loaded, Some(note)) => format!(" {} ", note.title),
      _ => " Note ".to_string(),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let note = match (status, self.query.data()) {
      (DetailStatus::Loaded, Some(note)) => note,
      (DetailStatus::Loading, _) => {
        let paragraph = Paragraph::new("Loading note...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, inner);
        return;
      }
      _ => {
        let text = vec![
          Line::from(Span::styled("Note not found", Style::default().fg(Color::Red).bold())),
          Line::from(""),
          Line::from("This note may have been deleted or you may not have access to it."),
          Line::from(""),
          Line::from(vec![
            Span::styled("<enter>", Style::default().fg(Color::Cyan)),
            Span::styled(" back to your notes", Style::default().fg(Color::DarkGray)),
          ]),
        ];
        let paragraph = Paragraph::new(text).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
        return;
      }
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Created date
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Content
      ])
      .split(inner);

    let created = Paragraph::new(note.created_label()).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(created, chunks[0]);

    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let body_style = if note.body() == crate::notes::NO_CONTENT {
      Style::default().fg(Color::DarkGray)
    } else {
      Style::default()
    };
    let body = Paragraph::new(note.body())
      .wrap(Wrap { trim: false })
      .style(body_style);
    frame.render_widget(body, chunks[2]);
  }
}

impl View for NoteDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(delete) = &mut self.delete {
      if delete.handle_key(key).is_consumed() {
        return ViewAction::None;
      }
    }

    let status = self.status();
    match key.code {
      KeyCode::Char('d') if status == DetailStatus::Loaded => {
        if let Some(delete) = &mut self.delete {
          delete.open();
        }
        ViewAction::None
      }
      KeyCode::Char('r') => {
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Enter if status == DetailStatus::NotFound => ViewAction::Navigate(Route::Notes),
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Navigate(Route::Notes),
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
    if let Some(delete) = &self.delete {
      let title = self.query.data().map(|note| note.title.as_str()).unwrap_or("");
      delete.render(frame, area, title);
    }
  }

  fn breadcrumb_label(&self) -> String {
    match (self.query.data(), &self.id) {
      (Some(note), _) => truncate(&note.title, 30),
      (None, Some(id)) => truncate(id, 12),
      (None, None) => "Note".to_string(),
    }
  }

  fn route(&self) -> Route {
    Route::Note(self.id.clone().unwrap_or_default())
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(delete) = &mut self.delete {
      if let Some(DeleteOutcome::Deleted) = delete.poll() {
        info!(id = ?self.id, "note deleted, back to list");
        return ViewAction::Navigate(Route::Notes);
      }
    }

    if self.query.poll() {
      if let Some(error) = self.query.error() {
        warn!(id = ?self.id, error, "failed to load note");
      }
    }
    ViewAction::None
  }

  fn on_command(&mut self, command: &str) -> bool {
    if command == "refresh" {
      self.query.refetch();
      return true;
    }
    false
  }

  fn captures_input(&self) -> bool {
    self.delete.as_ref().is_some_and(DeleteConfirm::is_open)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.status() == DetailStatus::NotFound {
      return vec![ShortcutInfo::new("enter", "back").with_priority(10)];
    }
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("d", "delete").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(30),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notes::{notes_key, COLLECTION};
  use crate::remote::{MemoryClient, Row};
  use crate::ui::components::DeletePhase;
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use ratatui::Terminal;
  use serde_json::{json, Value};
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn context(content: Option<&str>) -> AppContext {
    let row = match json!({"id": "n1", "title": "Trip plan", "content": content, "user_id": "me",
                           "created_at": "2024-05-01T12:00:00Z"}) {
      Value::Object(map) => map,
      _ => Row::new(),
    };
    AppContext::for_tests(Arc::new(MemoryClient::new("me").with_rows(COLLECTION, vec![row])))
  }

  async fn settle(view: &mut NoteDetailView) -> ViewAction {
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick()
  }

  fn screen(view: &mut NoteDetailView) -> String {
    let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
    terminal.draw(|frame| view.render(frame, frame.area())).unwrap();
    terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect()
  }

  #[test]
  fn test_status_mapping() {
    assert_eq!(detail_status::<()>(&QueryState::Idle, false), DetailStatus::NotFound);
    assert_eq!(detail_status::<()>(&QueryState::Idle, true), DetailStatus::Loading);
    assert_eq!(
      detail_status::<()>(&QueryState::Error("timeout".to_string()), true),
      DetailStatus::NotFound
    );
    assert_eq!(detail_status(&QueryState::Success(()), true), DetailStatus::Loaded);
  }

  #[tokio::test]
  async fn test_loaded_note() {
    let mut view = NoteDetailView::new(&context(Some("Pack boots")), Some("n1".to_string()));
    assert_eq!(view.status(), DetailStatus::Loading);

    settle(&mut view).await;
    assert_eq!(view.status(), DetailStatus::Loaded);
    assert_eq!(view.breadcrumb_label(), "Trip plan");
    assert!(screen(&mut view).contains("Pack boots"));
  }

  #[tokio::test]
  async fn test_empty_content_placeholder() {
    let mut view = NoteDetailView::new(&context(None), Some("n1".to_string()));
    settle(&mut view).await;
    assert!(screen(&mut view).contains("No content"));
  }

  #[tokio::test]
  async fn test_missing_note_is_not_found() {
    let mut view = NoteDetailView::new(&context(None), Some("nope".to_string()));
    settle(&mut view).await;

    assert_eq!(view.status(), DetailStatus::NotFound);
    assert!(screen(&mut view).contains("Note not found"));
    assert_eq!(
      view.handle_key(key(KeyCode::Enter)),
      ViewAction::Navigate(Route::Notes)
    );
  }

  #[tokio::test]
  async fn test_without_id_never_fetches() {
    let ctx = context(None);
    let mut view = NoteDetailView::new(&ctx, None);
    settle(&mut view).await;

    assert_eq!(view.status(), DetailStatus::NotFound);
    assert!(view.delete().is_none());
    assert_eq!(view.handle_key(key(KeyCode::Char('d'))), ViewAction::None);
  }

  #[tokio::test]
  async fn test_delete_navigates_to_list() {
    let ctx = context(Some("x"));
    let mut view = NoteDetailView::new(&ctx, Some("n1".to_string()));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('d')));
    assert!(view.captures_input());
    view.handle_key(key(KeyCode::Char('y')));
    assert_eq!(
      view.delete().map(DeleteConfirm::phase),
      Some(DeletePhase::InFlight)
    );

    assert_eq!(settle(&mut view).await, ViewAction::Navigate(Route::Notes));
    assert!(ctx.notes.get("n1").await.is_err());
    assert_eq!(ctx.toasts.visible()[0].title, "Note deleted");
  }

  #[tokio::test]
  async fn test_cancelled_delete_stays() {
    let ctx = context(Some("x"));
    let mut view = NoteDetailView::new(&ctx, Some("n1".to_string()));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('d')));
    view.handle_key(key(KeyCode::Char('n')));
    assert_eq!(settle(&mut view).await, ViewAction::None);
    assert!(ctx.notes.get("n1").await.is_ok());
    assert!(ctx.cache.stats(&notes_key()).is_none());
  }
}

use super::KeyResult;
use crate::context::AppContext;
use crate::notes::NotesApi;
use crate::query::Mutation;
use crate::ui::components::Toasts;
use crate::ui::renderfns::centered_rect;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use tracing::debug;

/// Where a two-phase delete currently is.
///
/// `Confirming` is only entered from `Idle` and `InFlight` only from
/// `Confirming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePhase {
  Idle,
  Confirming,
  InFlight,
}

/// How a confirmed delete ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
  Deleted,
  Failed(String),
}

/// Confirmation dialog and request state for deleting one note
pub struct DeleteConfirm {
  note_id: String,
  notes: NotesApi,
  toasts: Toasts,
  mutation: Mutation<()>,
  phase: DeletePhase,
  last_error: Option<String>,
}

impl DeleteConfirm {
  pub fn new(ctx: &AppContext, note_id: &str) -> Self {
    Self {
      note_id: note_id.to_string(),
      notes: ctx.notes.clone(),
      toasts: ctx.toasts.clone(),
      mutation: NotesApi::delete_mutation(&ctx.cache, note_id),
      phase: DeletePhase::Idle,
      last_error: None,
    }
  }

  pub fn phase(&self) -> DeletePhase {
    self.phase
  }

  /// Dialog is showing, either asking or waiting for the backend
  pub fn is_open(&self) -> bool {
    self.phase != DeletePhase::Idle
  }

  /// Error of the last attempt, cleared when the dialog opens again
  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  pub fn open(&mut self) -> bool {
    if self.phase != DeletePhase::Idle {
      return false;
    }
    self.phase = DeletePhase::Confirming;
    self.last_error = None;
    true
  }

  pub fn cancel(&mut self) -> bool {
    if self.phase != DeletePhase::Confirming {
      return false;
    }
    self.phase = DeletePhase::Idle;
    true
  }

  /// Send the delete request. Ignored unless the dialog is asking.
  pub fn confirm(&mut self) -> bool {
    if self.phase != DeletePhase::Confirming {
      return false;
    }
    if !self.notes.start_delete(&mut self.mutation, &self.note_id) {
      return false;
    }
    debug!(id = %self.note_id, "delete confirmed");
    self.phase = DeletePhase::InFlight;
    true
  }

  /// Pick up the request result and report it as a toast.
  pub fn poll(&mut self) -> Option<DeleteOutcome> {
    if self.phase != DeletePhase::InFlight {
      return None;
    }
    let result = self.mutation.poll()?;
    self.phase = DeletePhase::Idle;

    match result {
      Ok(()) => {
        self
          .toasts
          .push_success("Note deleted", "Your note has been removed.");
        Some(DeleteOutcome::Deleted)
      }
      Err(message) => {
        self.toasts.push_error("Error deleting note", message.clone());
        self.last_error = Some(message.clone());
        Some(DeleteOutcome::Failed(message))
      }
    }
  }

  /// Keys for the open dialog. The dialog is modal, so every key is
  /// swallowed while it shows.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<()> {
    match self.phase {
      DeletePhase::Idle => KeyResult::NotHandled,
      DeletePhase::Confirming => {
        match key.code {
          KeyCode::Char('y') | KeyCode::Enter => {
            self.confirm();
          }
          KeyCode::Char('n') | KeyCode::Esc => {
            self.cancel();
          }
          _ => {}
        }
        KeyResult::Handled
      }
      DeletePhase::InFlight => KeyResult::Handled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, title: &str) {
    if !self.is_open() {
      return;
    }

    let dialog = centered_rect(50, 7, area);
    frame.render_widget(Clear, dialog);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(" Delete note? ")
      .title_alignment(Alignment::Center);

    let actions = match self.phase {
      DeletePhase::InFlight => Line::from(Span::styled(
        "Deleting...",
        Style::default().fg(Color::DarkGray),
      )),
      _ => Line::from(vec![
        Span::styled("<y>", Style::default().fg(Color::Red)),
        Span::styled(" delete   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<n>", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ]),
    };

    let text = vec![
      Line::from(format!("\"{}\" will be permanently deleted.", title)),
      Line::from(""),
      actions,
    ];
    let paragraph = Paragraph::new(text)
      .block(block)
      .alignment(Alignment::Center)
      .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, dialog);
  }
}

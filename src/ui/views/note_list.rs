use crate::context::AppContext;
use crate::notes::{Note, NotesApi};
use crate::query::{Mutation, Query, QueryState};
use crate::ui::components::{FormEvent, KeyResult, NoteCard, NoteForm};
use crate::ui::ensure_valid_selection;
use crate::ui::view::{Route, ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListState, Paragraph, Wrap};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const FORM_HEIGHT: u16 = 12;

/// What the dashboard shows. Exactly one applies at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
  Loading,
  Error(String),
  Empty,
  Populated(usize),
}

pub fn list_status<T>(state: &QueryState<Arc<Vec<T>>>) -> ListStatus {
  match state {
    QueryState::Idle | QueryState::Loading => ListStatus::Loading,
    QueryState::Error(e) => ListStatus::Error(e.clone()),
    QueryState::Success(items) if items.is_empty() => ListStatus::Empty,
    QueryState::Success(items) => ListStatus::Populated(items.len()),
  }
}

/// Dashboard listing the user's notes, newest first, with an inline
/// creation form
pub struct NoteListView {
  ctx: AppContext,
  query: Query<Vec<Note>>,
  cards: Vec<NoteCard>,
  list_state: ListState,
  form: NoteForm,
  create: Mutation<()>,
}

impl NoteListView {
  pub fn new(ctx: AppContext) -> Self {
    let mut query = ctx.notes.list_query(&ctx.cache);
    // Start fetching immediately
    query.fetch();

    let create = NotesApi::create_mutation(&ctx.cache);
    let mut view = Self {
      ctx,
      query,
      cards: Vec::new(),
      list_state: ListState::default(),
      form: NoteForm::new(),
      create,
    };
    view.sync_cards();
    view
  }

  pub fn status(&self) -> ListStatus {
    list_status(self.query.state())
  }

  pub fn cards(&self) -> &[NoteCard] {
    &self.cards
  }

  pub fn form(&self) -> &NoteForm {
    &self.form
  }

  pub fn open_form(&mut self) {
    self.form.open();
  }

  /// Rebuild cards in server order, keeping dialog state of notes that are
  /// still listed
  fn sync_cards(&mut self) {
    let notes: Vec<Note> = self.query.data().cloned().unwrap_or_default();
    let mut previous: HashMap<String, NoteCard> = self
      .cards
      .drain(..)
      .map(|card| (card.id().to_string(), card))
      .collect();

    self.cards = notes
      .into_iter()
      .map(|note| match previous.remove(&note.id) {
        Some(mut card) => {
          card.update(note);
          card
        }
        None => NoteCard::new(&self.ctx, note),
      })
      .collect();

    // A delete may have settled in the same tick its refetch landed
    for mut card in previous.into_values() {
      card.poll();
    }
  }

  fn selected_card(&self) -> Option<&NoteCard> {
    self.list_state.selected().and_then(|i| self.cards.get(i))
  }

  fn open_dialog_card(&mut self) -> Option<&mut NoteCard> {
    self.cards.iter_mut().find(|card| card.delete().is_open())
  }

  fn save(&mut self, title: &str, content: &str) {
    if self.create.is_pending() {
      debug!("create already pending");
      return;
    }
    self.ctx.notes.start_create(&mut self.create, title, content);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let status = self.status();
    ensure_valid_selection(&mut self.list_state, self.cards.len());

    let title = match &status {
      ListStatus::Loading => " Notes (loading...) ".to_string(),
      ListStatus::Error(e) => format!(" Notes (error: {}) ", e),
      ListStatus::Populated(n) if self.query.is_fetching() => format!(" Notes ({}, refreshing...) ", n),
      ListStatus::Populated(n) => format!(" Notes ({}) ", n),
      ListStatus::Empty => " Notes (0) ".to_string(),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let message = match &status {
      ListStatus::Loading => Some(("Loading notes...".to_string(), Color::DarkGray)),
      ListStatus::Error(e) => Some((
        format!("Failed to load notes: {}\n\nPress 'r' to retry.", e),
        Color::Red,
      )),
      ListStatus::Empty => Some((
        "No notes yet. Press 'n' to create your first note.".to_string(),
        Color::DarkGray,
      )),
      ListStatus::Populated(_) => None,
    };
    if let Some((text, color)) = message {
      let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(color));
      frame.render_widget(paragraph, area);
      return;
    }

    // Borders and highlight symbol
    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<_> = self.cards.iter().map(|card| card.list_item(width)).collect();
    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for NoteListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Save { title, content }) => {
        self.save(&title, &content);
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      // Unbound keys stay inside the open form
      KeyResult::NotHandled if self.form.is_open() => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    if let Some(card) = self.open_dialog_card() {
      card.delete_mut().handle_key(key);
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Enter => {
        if let Some(card) = self.selected_card() {
          return ViewAction::Navigate(Route::Note(card.id().to_string()));
        }
      }
      KeyCode::Char('n') => self.form.open(),
      KeyCode::Char('d') => {
        if let Some(i) = self.list_state.selected() {
          if let Some(card) = self.cards.get_mut(i) {
            card.delete_mut().open();
          }
        }
      }
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') => return ViewAction::Quit,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let list_area = if self.form.is_open() {
      let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(FORM_HEIGHT), Constraint::Min(3)])
        .split(area);
      self.form.render(frame, chunks[0], self.create.is_pending());
      chunks[1]
    } else {
      area
    };

    self.render_list(frame, list_area);

    if let Some(card) = self.cards.iter().find(|card| card.delete().is_open()) {
      card.render_dialog(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Notes".to_string()
  }

  fn route(&self) -> Route {
    Route::Notes
  }

  fn tick(&mut self) -> ViewAction {
    // Cards first so a delete outcome is seen before its refetch drops the card
    for card in &mut self.cards {
      card.poll();
    }

    if let Some(result) = self.create.poll() {
      match result {
        Ok(()) => {
          self.form.reset();
          self
            .ctx
            .toasts
            .push_success("Note created", "Your note has been saved.");
        }
        Err(message) => self.ctx.toasts.push_error("Error creating note", message),
      }
    }

    if self.query.poll() {
      self.sync_cards();
    }
    ViewAction::None
  }

  fn on_command(&mut self, command: &str) -> bool {
    match command {
      "new" => {
        self.form.open();
        true
      }
      "refresh" => {
        self.query.refetch();
        true
      }
      _ => false,
    }
  }

  fn captures_input(&self) -> bool {
    self.form.is_open() || self.cards.iter().any(|card| card.delete().is_open())
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.form.is_open() {
      return vec![
        ShortcutInfo::new("ctrl-s", "save").with_priority(10),
        ShortcutInfo::new("esc", "cancel").with_priority(20),
      ];
    }
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("n", "new").with_priority(20),
      ShortcutInfo::new("d", "delete").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

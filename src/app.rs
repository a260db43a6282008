use crate::context::AppContext;
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, Toasts};
use crate::ui::view::{Route, View, ViewAction};
use crate::ui::views::{NoteDetailView, NoteListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const TICK_RATE: Duration = Duration::from_millis(100);

/// Main application state
pub struct App {
  ctx: AppContext,

  /// Navigation stack, the notes list is always at index 0
  views: Vec<Box<dyn View>>,

  /// `:` command palette
  command: CommandInput,

  /// Footer label for the backend in use
  backend: String,

  should_quit: bool,
  sign_out_requested: bool,
}

impl App {
  pub fn new(ctx: AppContext, backend: String, initial: Route) -> Self {
    let mut app = Self {
      views: vec![Box::new(NoteListView::new(ctx.clone()))],
      ctx,
      command: CommandInput::new(),
      backend,
      should_quit: false,
      sign_out_requested: false,
    };
    app.navigate(initial);
    app
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.main_loop(&mut terminal).await;

    // Cleanup terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    if self.sign_out_requested {
      match self.ctx.notes.sign_out().await {
        Ok(()) => info!("signed out"),
        Err(e) => warn!(error = %e, "sign out failed"),
      }
    }

    // Views hold cache observers; drop them before the cache itself
    self.views.clear();
    self.ctx.cache.clear();

    result
  }

  async fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::Resize => {} // Next draw uses the new size
    }
  }

  fn tick(&mut self) {
    // Views below the top keep their observers current too
    let mut action = ViewAction::None;
    let top = self.views.len().saturating_sub(1);
    for (i, view) in self.views.iter_mut().enumerate() {
      let result = view.tick();
      if i == top {
        action = result;
      }
    }
    self.apply(action);
    self.ctx.toasts.expire(Instant::now());
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let view_owns_keys = self.current_view().is_some_and(|v| v.captures_input());
    if self.command.is_active() || !view_owns_keys {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.views.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Navigate(route) => self.navigate(route),
      ViewAction::Quit => self.should_quit = true,
    }
  }

  fn navigate(&mut self, route: Route) {
    debug!(?route, "navigate");
    match route {
      Route::Notes => self.views.truncate(1),
      Route::Note(id) => {
        if self.current_view().map(|v| v.route()) == Some(Route::Note(id.clone())) {
          return;
        }
        let view = NoteDetailView::new(&self.ctx, Some(id));
        self.views.push(Box::new(view));
      }
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    debug!(cmd, "command");
    match cmd {
      "notes" => self.navigate(Route::Notes),
      "new" => {
        self.navigate(Route::Notes);
        self.forward_command(cmd);
      }
      "refresh" => self.forward_command(cmd),
      "signout" => {
        self.sign_out_requested = true;
        self.should_quit = true;
      }
      "quit" => self.should_quit = true,
      "" => {}
      other => {
        warn!(cmd = other, "unknown command");
        self
          .ctx
          .toasts
          .push_error("Unknown command", format!(":{}", other));
      }
    }
  }

  fn forward_command(&mut self, cmd: &str) {
    if let Some(view) = self.views.last_mut() {
      if !view.on_command(cmd) {
        debug!(cmd, "command has no effect here");
      }
    }
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.views.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut (dyn View + 'static)> {
    self.views.last_mut().map(|v| v.as_mut())
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self.views.iter().map(|v| v.breadcrumb_label()).collect()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn toasts(&self) -> &Toasts {
    &self.ctx.toasts
  }

  pub fn user_label(&self) -> &str {
    self
      .ctx
      .notes
      .user()
      .map(|user| user.display_name())
      .unwrap_or("signed out")
  }

  pub fn backend_label(&self) -> &str {
    &self.backend
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notes::COLLECTION;
  use crate::remote::{MemoryClient, Row};
  use serde_json::{json, Value};
  use std::sync::Arc;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn app(initial: Route) -> App {
    let row = match json!({"id": "n1", "title": "Hello", "user_id": "me",
                           "created_at": "2024-05-01T12:00:00Z"}) {
      Value::Object(map) => map,
      _ => Row::new(),
    };
    let ctx = AppContext::for_tests(Arc::new(MemoryClient::new("me").with_rows(COLLECTION, vec![row])));
    App::new(ctx, "in-memory demo".to_string(), initial)
  }

  fn type_command(app: &mut App, text: &str) {
    app.handle_key(key(KeyCode::Char(':')));
    for c in text.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
  }

  #[tokio::test]
  async fn test_initial_note_route() {
    let app = app(Route::Note("n1".to_string()));
    assert_eq!(app.views.len(), 2);
    assert_eq!(app.current_view().map(|v| v.route()), Some(Route::Note("n1".to_string())));
    assert_eq!(app.user_label(), "me@example.com");
  }

  #[tokio::test]
  async fn test_navigate_to_list_pops_to_root() {
    let mut app = app(Route::Note("n1".to_string()));
    app.handle_key(key(KeyCode::Char('q')));
    assert_eq!(app.views.len(), 1);
    assert!(!app.should_quit);

    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_same_note_is_not_pushed_twice() {
    let mut app = app(Route::Note("n1".to_string()));
    app.navigate(Route::Note("n1".to_string()));
    assert_eq!(app.views.len(), 2);
  }

  #[tokio::test]
  async fn test_new_command_opens_form_on_list() {
    let mut app = app(Route::Note("n1".to_string()));
    type_command(&mut app, "new");
    assert_eq!(app.views.len(), 1);
    assert!(app.current_view().is_some_and(|v| v.captures_input()));

    // ':' is text while the form owns the keyboard
    app.handle_key(key(KeyCode::Char(':')));
    assert!(!app.command.is_active());
  }

  #[tokio::test]
  async fn test_signout_command_quits() {
    let mut app = app(Route::Notes);
    type_command(&mut app, "logout");
    assert!(app.should_quit);
    assert!(app.sign_out_requested);
  }

  #[tokio::test]
  async fn test_unknown_command_toasts() {
    let mut app = app(Route::Notes);
    type_command(&mut app, "zzz");
    assert!(!app.should_quit);
    assert_eq!(app.toasts().visible()[0].title, "Unknown command");
  }
}

use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Places the app can navigate to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  /// The notes dashboard
  Notes,
  /// One note by id
  Note(String),
}

/// Actions that a view can request in response to input or ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
  /// No action needed
  None,
  /// Go to a route
  Navigate(Route),
  /// Exit the app
  Quit,
}

/// Trait for view behavior
///
/// Views handle their own input modes (forms, dialogs) and return actions
/// for the App to execute. This creates a clean delegation chain:
/// App → View → Components
///
/// Views that load data use `Query<T>` internally and poll it in `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// The route this view displays
  fn route(&self) -> Route;

  /// Called on each tick to poll queries and mutations
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// Run a `:` command aimed at the current view. Returns `false` if the
  /// view has no use for it.
  fn on_command(&mut self, _command: &str) -> bool {
    false
  }

  /// True while a text field or dialog owns the keyboard, so global keys
  /// like `:` must not be intercepted
  fn captures_input(&self) -> bool {
    false
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
  #[default]
  Title,
  Content,
}

/// Events emitted by the creation form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// Ctrl-S with the current title and content
  Save { title: String, content: String },
  /// Esc; the form is already cleared and closed
  Cancelled,
}

/// Inline form for a new note
#[derive(Debug, Clone, Default)]
pub struct NoteForm {
  title: TextInput,
  content: TextInput,
  focus: FormField,
  open: bool,
}

impl NoteForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_open(&self) -> bool {
    self.open
  }

  pub fn focus(&self) -> FormField {
    self.focus
  }

  pub fn title(&self) -> &str {
    self.title.value()
  }

  pub fn content(&self) -> &str {
    self.content.value()
  }

  pub fn open(&mut self) {
    self.open = true;
    self.focus = FormField::Title;
  }

  /// Empty both fields and hide the form
  pub fn reset(&mut self) {
    self.title.clear();
    self.content.clear();
    self.focus = FormField::Title;
    self.open = false;
  }

  fn toggle_focus(&mut self) {
    self.focus = match self.focus {
      FormField::Title => FormField::Content,
      FormField::Content => FormField::Title,
    };
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if !self.open {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        return KeyResult::Event(FormEvent::Save {
          title: self.title.value().to_string(),
          content: self.content.value().to_string(),
        });
      }
      KeyCode::Esc => {
        self.reset();
        return KeyResult::Event(FormEvent::Cancelled);
      }
      KeyCode::Tab | KeyCode::BackTab => {
        self.toggle_focus();
        return KeyResult::Handled;
      }
      KeyCode::Enter => {
        match self.focus {
          FormField::Title => self.focus = FormField::Content,
          FormField::Content => self.content.insert('\n'),
        }
        return KeyResult::Handled;
      }
      _ => {}
    }

    let input = match self.focus {
      FormField::Title => &mut self.title,
      FormField::Content => &mut self.content,
    };
    match input.handle_key(key) {
      InputResult::NotHandled => KeyResult::NotHandled,
      _ => KeyResult::Handled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, saving: bool) {
    let title = if saving {
      " New note (saving...) "
    } else {
      " New note "
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Title
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Content
        Constraint::Length(1), // Hints
      ])
      .split(inner);

    let mut title_line = vec![Span::styled("Title: ", Style::default().fg(Color::DarkGray))];
    title_line.extend(field_spans(&self.title, self.focus == FormField::Title));
    frame.render_widget(Paragraph::new(Line::from(title_line)), chunks[0]);

    frame.render_widget(
      Paragraph::new("─".repeat(chunks[1].width as usize))
        .style(Style::default().fg(Color::DarkGray)),
      chunks[1],
    );

    let content = if self.content.is_empty() && self.focus != FormField::Content {
      Text::from(Span::styled(
        "Write your note...",
        Style::default().fg(Color::DarkGray),
      ))
    } else {
      content_text(&self.content, self.focus == FormField::Content)
    };
    frame.render_widget(
      Paragraph::new(content).wrap(Wrap { trim: false }),
      chunks[2],
    );

    let hints = if saving {
      Line::from(Span::styled("Saving...", Style::default().fg(Color::DarkGray)))
    } else {
      Line::from(vec![
        Span::styled("<ctrl-s>", Style::default().fg(Color::Cyan)),
        Span::styled(" save   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<tab>", Style::default().fg(Color::Cyan)),
        Span::styled(" switch field   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<esc>", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ])
    };
    frame.render_widget(Paragraph::new(hints), chunks[3]);
  }
}

fn field_spans(input: &TextInput, focused: bool) -> Vec<Span<'_>> {
  if !focused {
    return vec![Span::raw(input.value())];
  }
  let (before, after) = input.split_at_cursor();
  vec![
    Span::raw(before),
    Span::styled("_", Style::default().fg(Color::Yellow)), // Cursor
    Span::raw(after),
  ]
}

/// Multi-line content with the cursor marker on its line
fn content_text(input: &TextInput, focused: bool) -> Text<'_> {
  let (before, after) = if focused {
    input.split_at_cursor()
  } else {
    (input.value(), "")
  };

  let mut lines: Vec<Line> = before.split('\n').map(Line::raw).collect();
  if focused {
    let mut rest = after.split('\n');
    if let Some(last) = lines.last_mut() {
      last.push_span(Span::styled("_", Style::default().fg(Color::Yellow)));
      if let Some(tail) = rest.next() {
        last.push_span(Span::raw(tail));
      }
    }
    lines.extend(rest.map(Line::raw));
  }
  Text::from(lines)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_text(form: &mut NoteForm, text: &str) {
    for c in text.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_closed_form_ignores_keys() {
    let mut form = NoteForm::new();
    assert_eq!(form.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);
  }

  #[test]
  fn test_enter_moves_to_content_then_inserts_newline() {
    let mut form = NoteForm::new();
    form.open();
    type_text(&mut form, "Shopping");
    form.handle_key(key(KeyCode::Enter));
    assert_eq!(form.focus(), FormField::Content);

    type_text(&mut form, "milk");
    form.handle_key(key(KeyCode::Enter));
    type_text(&mut form, "eggs");

    assert_eq!(form.title(), "Shopping");
    assert_eq!(form.content(), "milk\neggs");
  }

  #[test]
  fn test_save_emits_raw_values() {
    let mut form = NoteForm::new();
    form.open();
    type_text(&mut form, "  ");
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "Hello");

    let result = form.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
    assert_eq!(
      result,
      KeyResult::Event(FormEvent::Save {
        title: "  ".to_string(),
        content: "Hello".to_string(),
      })
    );
    // Saving does not clear; that waits for the backend
    assert!(form.is_open());
    assert_eq!(form.content(), "Hello");
  }

  #[test]
  fn test_cancel_clears_fields() {
    let mut form = NoteForm::new();
    form.open();
    type_text(&mut form, "draft");

    assert_eq!(
      form.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Cancelled)
    );
    assert!(!form.is_open());
    assert_eq!(form.title(), "");
  }

  #[test]
  fn test_content_cursor_lines() {
    let mut form = NoteForm::new();
    form.open();
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "a");
    form.handle_key(key(KeyCode::Enter));
    type_text(&mut form, "b");

    let text = content_text(&form.content, true);
    assert_eq!(text.lines.len(), 2);
    assert_eq!(text.lines[1].to_string(), "b_");
  }
}

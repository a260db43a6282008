use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 3;
const TOAST_WIDTH: u16 = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Success,
  Error,
}

/// A transient notification
#[derive(Debug, Clone)]
pub struct Toast {
  pub kind: ToastKind,
  pub title: String,
  pub description: String,
  shown_at: Instant,
}

/// Toast queue shared between the app and its views.
///
/// Clones refer to the same queue. Oldest toasts drop out first.
#[derive(Debug, Clone, Default)]
pub struct Toasts {
  queue: Rc<RefCell<VecDeque<Toast>>>,
}

impl Toasts {
  pub fn push_success(&self, title: impl Into<String>, description: impl Into<String>) {
    self.push(ToastKind::Success, title.into(), description.into());
  }

  pub fn push_error(&self, title: impl Into<String>, description: impl Into<String>) {
    self.push(ToastKind::Error, title.into(), description.into());
  }

  fn push(&self, kind: ToastKind, title: String, description: String) {
    let mut queue = self.queue.borrow_mut();
    queue.push_back(Toast {
      kind,
      title,
      description,
      shown_at: Instant::now(),
    });
    while queue.len() > MAX_TOASTS {
      queue.pop_front();
    }
  }

  /// Drop toasts shown longer than the display time. Returns `true` if any
  /// were dropped.
  pub fn expire(&self, now: Instant) -> bool {
    let mut queue = self.queue.borrow_mut();
    let before = queue.len();
    queue.retain(|toast| now.duration_since(toast.shown_at) < TOAST_TTL);
    queue.len() != before
  }

  pub fn is_empty(&self) -> bool {
    self.queue.borrow().is_empty()
  }

  pub fn visible(&self) -> Vec<Toast> {
    self.queue.borrow().iter().cloned().collect()
  }

  /// Stack toasts in the top-right corner of `area`.
  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = TOAST_WIDTH.min(area.width);
    let mut y = area.y;

    for toast in self.queue.borrow().iter().rev() {
      let height = 4;
      if y + height > area.y + area.height {
        break;
      }
      let toast_area = Rect::new(area.x + area.width - width, y, width, height);

      let color = match toast.kind {
        ToastKind::Success => Color::Green,
        ToastKind::Error => Color::Red,
      };
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(
          format!(" {} ", toast.title),
          Style::default().fg(color).bold(),
        ));
      let paragraph = Paragraph::new(toast.description.as_str())
        .block(block)
        .wrap(Wrap { trim: true });

      frame.render_widget(Clear, toast_area);
      frame.render_widget(paragraph, toast_area);
      y += height;
    }
  }
}

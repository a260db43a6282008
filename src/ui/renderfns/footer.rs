use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar: view breadcrumb on the left, backend on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], backend: &str) {
  let mut spans = vec![Span::raw(" ")];
  let last = breadcrumb.len().saturating_sub(1);

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }
    let style = if i == last {
      // Current view
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  let style = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(style), area);

  let backend = Line::from(Span::styled(
    format!("{} ", extract_domain(backend)),
    Style::default().fg(Color::DarkGray),
  ));
  frame.render_widget(
    Paragraph::new(backend).alignment(Alignment::Right),
    area,
  );
}

/// Host part of a backend URL; other labels pass through
fn extract_domain(url: &str) -> &str {
  match url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
  {
    Some(rest) => rest.split('/').next().unwrap_or(rest),
    None => url,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_domain() {
    assert_eq!(extract_domain("https://xyz.supabase.co"), "xyz.supabase.co");
    assert_eq!(
      extract_domain("https://notes.example.com/project/"),
      "notes.example.com"
    );
    assert_eq!(extract_domain("http://localhost:54321"), "localhost:54321");
    assert_eq!(extract_domain("in-memory demo"), "in-memory demo");
  }
}

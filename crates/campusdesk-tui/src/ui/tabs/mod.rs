//! Per-tab content rendering.

pub mod courses;
pub mod dashboard;
pub mod forum;
pub mod notifications;
pub mod profile;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::Loadable;
use crate::ui::styles;

/// Text to show instead of a list that is loading, failed, or empty.
/// `None` means the list has rows to draw.
pub fn placeholder<T>(list: &Loadable<Vec<T>>, empty: &str) -> Option<Line<'static>> {
    if !list.data.is_empty() {
        return None;
    }
    Some(match (&list.error, list.loading) {
        (Some(error), _) => Line::from(Span::styled(format!(" {}", error), styles::error_style())),
        (None, true) => Line::from(Span::styled(" Loading...", styles::muted_style())),
        (None, false) => Line::from(Span::styled(format!(" {}", empty), styles::muted_style())),
    })
}

/// Bordered box holding a single line of text.
pub fn render_message(frame: &mut Frame, area: Rect, title: &str, line: Line<'static>, focused: bool) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));
    let paragraph = Paragraph::new(line).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Block title with a trailing marker while a reload is running.
pub fn list_title<T>(name: &str, list: &Loadable<Vec<T>>) -> String {
    if list.loading {
        format!(" {} ({}) · updating ", name, list.data.len())
    } else {
        format!(" {} ({}) ", name, list.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_states() {
        let mut list: Loadable<Vec<u8>> = Loadable::default();
        let empty = placeholder(&list, "Nothing here").unwrap();
        assert!(empty.to_string().contains("Nothing here"));

        list.start();
        assert!(placeholder(&list, "x").unwrap().to_string().contains("Loading"));

        list.fail("Server error".to_string());
        assert!(placeholder(&list, "x").unwrap().to_string().contains("Server error"));

        list.finish(vec![1]);
        assert!(placeholder(&list, "x").is_none());
    }

    #[test]
    fn test_list_title_marks_reload() {
        let mut list: Loadable<Vec<u8>> = Loadable::default();
        list.finish(vec![1, 2, 3]);
        assert_eq!(list_title("Posts", &list), " Posts (3) ");
        list.start();
        assert!(list_title("Posts", &list).contains("updating"));
    }
}

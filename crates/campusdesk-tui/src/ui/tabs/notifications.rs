use chrono::Utc;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use campusdesk_core::utils::{time_ago, truncate};

use crate::app::App;
use crate::ui::styles;

use super::{placeholder, render_message};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let unread = app.unread_notifications();
    let title = format!("Notifications ({} unread)", unread);

    if let Some(line) = placeholder(&app.notifications, "You're all caught up") {
        render_message(frame, area, &title, line, true);
        return;
    }

    let now = Utc::now();
    let width = area.width.saturating_sub(8) as usize;

    let items: Vec<ListItem> = app
        .notifications
        .data
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let marker = if n.is_seen { "  " } else { "● " };
            let heading_style = if n.is_seen {
                styles::list_item_style()
            } else {
                styles::unread_style()
            };

            let mut meta = Vec::new();
            if let Some(ref course) = n.course {
                meta.push(course.code.clone());
            }
            if let Some(ts) = n.created_at {
                meta.push(time_ago(ts, now));
            }

            let mut lines = vec![Line::from(vec![
                Span::styled(marker, styles::highlight_style()),
                Span::styled(n.heading().to_string(), heading_style),
            ])];
            if !n.body().is_empty() {
                lines.push(Line::from(format!("  {}", truncate(n.body(), width))));
            }
            if !meta.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("  {}", meta.join(" · ")),
                    styles::muted_style(),
                )));
            }

            let item = ListItem::new(lines);
            if i == app.notification_selection {
                item.style(styles::selected_style())
            } else {
                item
            }
        })
        .collect();

    let block = Block::default()
        .title(format!(" {} ", title))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let mut state = ListState::default();
    state.select(Some(app.notification_selection));

    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

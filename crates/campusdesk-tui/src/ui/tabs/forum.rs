use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use campusdesk_core::utils::{time_ago, truncate};

use crate::app::{App, Focus};
use crate::ui::styles;

use super::{list_title, placeholder, render_message};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_post_list(frame, app, chunks[0]);
    render_post_detail(frame, app, chunks[1]);
}

fn render_post_list(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::List);
    let title = list_title("Posts", &app.posts);

    if let Some(line) = placeholder(&app.posts, "No posts yet. Press n to start one.") {
        render_message(frame, area, title.trim(), line, focused);
        return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = app
        .posts
        .data
        .iter()
        .enumerate()
        .map(|(i, post)| {
            let style = if i == app.post_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(vec![
                Line::from(truncate(&post.title, 50)),
                Line::from(Span::styled(
                    format!(
                        "  {} · {} · {} likes",
                        post.user.display_name(),
                        time_ago(post.date_posted, now),
                        post.likes
                    ),
                    styles::muted_style(),
                )),
            ])
            .style(style)
        })
        .collect();

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let mut state = ListState::default();
    state.select(Some(app.post_selection));

    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn render_post_detail(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);

    let Some(detail) = app.post_detail.data.as_ref() else {
        let line = match (&app.post_detail.error, app.post_detail.loading) {
            (Some(error), _) => Line::from(Span::styled(format!(" {}", error), styles::error_style())),
            (None, true) => Line::from(Span::styled(" Loading...", styles::muted_style())),
            (None, false) => Line::from(Span::styled(" Press Enter to open a post", styles::muted_style())),
        };
        render_message(frame, area, "Post", line, focused);
        return;
    };

    let now = Utc::now();
    let post = &detail.post;
    let mut lines = vec![
        Line::from(Span::styled(post.title.clone(), styles::title_style())),
        Line::from(Span::styled(
            format!("{} · {}", post.user.display_name(), time_ago(post.date_posted, now)),
            styles::muted_style(),
        )),
        Line::from(""),
    ];
    lines.extend(post.text.lines().map(|l| Line::from(l.to_string())));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Comments ({})", detail.comments.len()),
        styles::highlight_style(),
    )));

    if detail.comments.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No comments yet. Press c to add one.",
            styles::muted_style(),
        )));
    }

    for (i, comment) in detail.comments.iter().enumerate() {
        let style = if focused && i == app.comment_selection {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        let when = comment
            .date_posted
            .map(|ts| format!(" · {}", time_ago(ts, now)))
            .unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(format!("  {}", comment.user.display_name()), styles::highlight_style()),
            Span::styled(when, styles::muted_style()),
        ]));
        lines.push(Line::styled(format!("    {}", comment.text), style));
    }

    let title = if app.post_detail.loading { " Post · updating " } else { " Post " };
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

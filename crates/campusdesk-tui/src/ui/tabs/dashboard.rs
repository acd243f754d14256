use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use campusdesk_core::models::Weekday;
use campusdesk_core::utils::{format_clock, truncate};

use crate::app::{App, Focus};
use crate::ui::styles;

use super::{list_title, placeholder, render_message};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_timetable(frame, app, chunks[0]);
    render_announcements(frame, app, chunks[1]);
}

fn day_label(app: &App) -> String {
    if app.timetable_day == Weekday::today() {
        format!("{} (today)", app.timetable_day)
    } else {
        app.timetable_day.to_string()
    }
}

fn render_timetable(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::List);
    let title = format!("{} - {}", list_title("Timetable", &app.timetable).trim(), day_label(app));

    if let Some(line) = placeholder(&app.timetable, "No classes scheduled") {
        render_message(frame, area, &title, line, focused);
        return;
    }

    let header = Row::new([
        Cell::from("Time"),
        Cell::from("Course"),
        Cell::from("Type"),
        Cell::from("With"),
    ])
    .style(styles::title_style())
    .height(1);

    let teacher_view = app.identity().map(|i| i.is_teacher()).unwrap_or(false);
    let current = app.class_in_progress();

    let rows: Vec<Row> = app
        .timetable
        .data
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = if i == app.timetable_selection {
                styles::selected_style()
            } else if Some(i) == current {
                styles::in_progress_style()
            } else {
                styles::list_item_style()
            };

            // Teachers see which batches attend; students see who teaches.
            let with = if teacher_view {
                entry.batch_names()
            } else {
                entry.teacher_name().unwrap_or_else(|| "-".to_string())
            };

            Row::new(vec![
                Cell::from(format!(
                    "{} - {}",
                    format_clock(&entry.start_time),
                    format_clock(&entry.end_time)
                )),
                Cell::from(truncate(&entry.course.label(), 40)),
                Cell::from(entry.class_type.to_string())
                    .style(styles::class_type_style(entry.class_type)),
                Cell::from(with),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(20),
        Constraint::Fill(1),
        Constraint::Length(8),
        Constraint::Percentage(25),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(format!(" {} ", title))
                .title_style(styles::title_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.timetable_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_announcements(frame: &mut Frame, app: &App, area: Rect) {
    let title = list_title("Announcements", &app.announcements);

    if let Some(line) = placeholder(&app.announcements, "No announcements") {
        render_message(frame, area, title.trim(), line, false);
        return;
    }

    let mut lines = Vec::new();
    for announcement in &app.announcements.data {
        lines.push(Line::from(Span::styled(
            announcement.title.clone(),
            styles::highlight_style(),
        )));
        if let Some(created) = announcement.created_at {
            lines.push(Line::from(Span::styled(
                created.format("%b %d, %Y").to_string(),
                styles::muted_style(),
            )));
        }
        if !announcement.content.is_empty() {
            lines.push(Line::from(announcement.content.clone()));
        }
        lines.push(Line::from(""));
    }

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

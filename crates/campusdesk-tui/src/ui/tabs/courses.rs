use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use campusdesk_core::utils::{format_optional, truncate};

use crate::app::App;
use crate::ui::styles;

use super::{list_title, placeholder, render_message};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_course_list(frame, app, chunks[0]);
    render_course_detail(frame, app, chunks[1]);
}

fn render_course_list(frame: &mut Frame, app: &App, area: Rect) {
    let title = list_title("Courses", &app.courses);
    if let Some(line) = placeholder(&app.courses, "No courses found") {
        render_message(frame, area, title.trim(), line, true);
        return;
    }

    let items: Vec<ListItem> = app
        .courses
        .data
        .iter()
        .enumerate()
        .map(|(i, course)| {
            let style = if i == app.course_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let line = Line::from(format!("{:<10} {}", course.code, truncate(&course.name, 40)));
            ListItem::new(line).style(style)
        })
        .collect();

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let mut state = ListState::default();
    state.select(Some(app.course_selection));

    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn render_course_detail(frame: &mut Frame, app: &App, area: Rect) {
    let lines = match app.courses.data.get(app.course_selection) {
        Some(course) => vec![
            Line::from(Span::styled(course.name.clone(), styles::title_style())),
            Line::from(""),
            Line::from(vec![
                Span::styled("Code:  ", styles::muted_style()),
                Span::raw(course.code.clone()),
            ]),
            Line::from(""),
            Line::from(format_optional(course.description.as_deref(), "No description")),
        ],
        None => vec![Line::from(Span::styled("Select a course", styles::muted_style()))],
    };

    let block = Block::default()
        .title(" Details ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

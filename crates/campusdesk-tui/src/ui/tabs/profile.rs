use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use campusdesk_core::models::UserProfile;
use campusdesk_core::routes::Route;
use campusdesk_core::utils::initials;

use crate::app::App;
use crate::ui::styles;

use super::render_message;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(profile) = app.profile.data.as_ref() else {
        let line = match (&app.profile.error, app.profile.loading) {
            (Some(error), _) => Line::from(Span::styled(format!(" {}", error), styles::error_style())),
            (None, true) => Line::from(Span::styled(" Loading...", styles::muted_style())),
            (None, false) => Line::from(Span::styled(
                " Press / to look up an enrollment number",
                styles::muted_style(),
            )),
        };
        render_message(frame, area, "Profile", line, true);
        return;
    };

    if app.route == Route::TeacherProfile {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        render_profile(frame, profile, chunks[0]);
        render_teacher_summary(frame, app, chunks[1]);
    } else {
        render_profile(frame, profile, area);
    }
}

fn field(label: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(label, styles::muted_style()),
        Span::raw(value),
    ])
}

fn render_profile(frame: &mut Frame, profile: &UserProfile, area: Rect) {
    let name = profile.user.full_name();
    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!(" {} ", initials(&name)), styles::badge_style()),
            Span::raw("  "),
            Span::styled(name, styles::title_style()),
        ]),
        Line::from(""),
        field("Enrollment:  ", profile.user.enrollment_number.clone()),
    ];

    if let Some(batch) = profile.batch_name() {
        lines.push(field("Batch:       ", batch.to_string()));
    }
    if let Some(ref department) = profile.department {
        lines.push(field("Department:  ", department.clone()));
    }
    if let Some(years) = profile.years_of_teaching {
        lines.push(field("Teaching:    ", format!("{} years", years)));
    }

    let block = Block::default()
        .title(" Profile ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_teacher_summary(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();

    match app.teacher_stats {
        Some(ref stats) => {
            lines.push(field("Students:    ", stats.total_students.to_string()));
            lines.push(field("Courses:     ", stats.total_courses.to_string()));
            lines.push(field("Experience:  ", format!("{} years", stats.years_of_teaching)));
        }
        None => lines.push(Line::from(Span::styled("Loading stats...", styles::muted_style()))),
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Courses taught", styles::highlight_style())));
    if app.courses.data.is_empty() {
        lines.push(Line::from(Span::styled("  None", styles::muted_style())));
    }
    for course in &app.courses.data {
        lines.push(Line::from(format!("  {}", course.label())));
    }

    let block = Block::default()
        .title(" Teaching ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use campusdesk_core::validation::{Field, TEXT_MAX, TITLE_MAX};

use crate::app::{App, AppState, LoginFocus, PostFocus, Tab};

use super::styles;
use super::tabs::{courses, dashboard, forum, notifications, profile};

const LOGO: [&str; 3] = [
    "   ┏━╸┏━┓┏┳┓┏━┓╻ ╻┏━┓╺┳┓┏━╸┏━┓╻┏ ",
    "   ┃  ┣━┫┃┃┃┣━┛┃ ┃┗━┓ ┃┃┣╸ ┗━┓┣┻┓",
    "   ┗━╸╹ ╹╹ ╹╹  ┗━┛┗━┛╺┻┛┗━╸┗━┛╹ ╹",
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ComposingPost => render_compose_overlay(frame, app),
        AppState::Commenting => render_comment_overlay(frame, app),
        AppState::EnteringProfile => render_profile_lookup_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  campusdesk";
    let help_hint = "[?] Help";

    let mut right = Vec::new();
    match app.identity() {
        Some(identity) => {
            let unread = app.unread_notifications();
            if unread > 0 {
                right.push(Span::styled(format!(" {} unread ", unread), styles::badge_style()));
                right.push(Span::raw("  "));
            }
            right.push(Span::styled(
                format!("{} ({}) ", identity.display_name, identity.role.display_name()),
                styles::role_style(identity.role),
            ));
            if !app.session.is_confirmed() {
                right.push(Span::styled("· restored ", styles::muted_style()));
            }
        }
        None => right.push(Span::styled("not logged in ", styles::muted_style())),
    }
    right.push(Span::styled(help_hint, styles::muted_style()));

    let right_len: usize = right.iter().map(|s| s.content.chars().count()).sum();
    let padding = (area.width as usize).saturating_sub(title.len() + right_len + 2);

    let mut spans = vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(padding)),
    ];
    spans.extend(right);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in Tab::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, tab.title());
        spans.push(Span::styled(label, styles::tab_style(app.current_tab == *tab)));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_tab {
        Tab::Dashboard => dashboard::render(frame, app, area),
        Tab::Courses => courses::render(frame, app, area),
        Tab::Forum => forum::render(frame, app, area),
        Tab::Notifications => notifications::render(frame, app, area),
        Tab::Profile => profile::render(frame, app, area),
    }
}

fn shortcuts(app: &App) -> &'static str {
    match app.current_tab {
        Tab::Dashboard => "[ and ] day | [u]pdate | [L]ogout | [q]uit",
        Tab::Courses => "[u]pdate | [L]ogout | [q]uit",
        Tab::Forum => "[n]ew post | [c]omment | [u]pdate | [q]uit",
        Tab::Notifications => "[m]ark all read | [u]pdate | [q]uit",
        Tab::Profile => "[/] look up | [u]pdate | [q]uit",
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" Updated {} ", app.cache_ages.last_updated()),
    };
    let right_text = format!(" {} ", shortcuts(app));

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn logo_lines() -> Vec<Line<'static>> {
    LOGO.iter()
        .map(|row| Line::from(Span::styled(*row, styles::title_style())))
        .collect()
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(key, styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 26, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let mut help_text = logo_lines();
    help_text.extend([
        Line::from(Span::styled(
            format!("              version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("  1-5       ", "Switch tabs"),
        help_line("  ←/→ Tab   ", "Prev/next tab"),
        help_line("  ↑/↓ PgUp  ", "Navigate list"),
        help_line("  Enter     ", "Open post"),
        help_line("  Esc       ", "Go back"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("  [ / ]     ", "Previous/next timetable day"),
        help_line("  n         ", "New forum post"),
        help_line("  c         ", "Comment on the open post"),
        help_line("  m         ", "Mark all notifications read"),
        help_line("  /         ", "Look up a profile"),
        help_line("  u         ", "Update current tab"),
        help_line("  L         ", "Log out"),
        help_line("  q         ", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 14 } else { 12 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));

    let enrollment_focused = app.login_focus == LoginFocus::EnrollmentNumber;
    let cursor = if enrollment_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("    "),
        Span::styled("Enrollment: [", styles::muted_style()),
        Span::styled(
            format!("{:<16}{}", app.login_enrollment, cursor),
            styles::input_style(enrollment_focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    let password_focused = app.login_focus == LoginFocus::Password;
    let password_masked = "*".repeat(app.login_password.chars().count().min(16));
    let cursor = if password_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("    "),
        Span::styled("Password:   [", styles::muted_style()),
        Span::styled(
            format!("{:<16}{}", password_masked, cursor),
            styles::input_style(password_focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    let button_focused = app.login_focus == LoginFocus::Button;
    let label = if button_focused { " ▶ Login ◀ " } else { "   Login   " };
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("            ["),
        Span::styled(label, styles::input_style(button_focused)),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn field_error_line(message: Option<&str>) -> Line<'static> {
    match message {
        Some(msg) => Line::from(Span::styled(format!("  {}", msg), styles::error_style())),
        None => Line::from(""),
    }
}

fn render_compose_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(70, 16, frame.area());
    frame.render_widget(Clear, area);

    let title_focused = app.post_focus == PostFocus::Title;
    let text_focused = app.post_focus == PostFocus::Text;

    let lines = vec![
        Line::from(Span::styled(" New post", styles::title_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Title ", styles::highlight_style()),
            Span::styled(
                format!("({}/{})", app.post_title.chars().count(), TITLE_MAX),
                styles::muted_style(),
            ),
        ]),
        Line::from(Span::styled(
            format!(" {}{}", app.post_title, if title_focused { "▌" } else { "" }),
            styles::input_style(title_focused),
        )),
        field_error_line(app.post_error(Field::Title)),
        Line::from(vec![
            Span::styled(" Content ", styles::highlight_style()),
            Span::styled(
                format!("({}/{})", app.post_text.chars().count(), TEXT_MAX),
                styles::muted_style(),
            ),
        ]),
        Line::from(Span::styled(
            format!(" {}{}", app.post_text, if text_focused { "▌" } else { "" }),
            styles::input_style(text_focused),
        )),
        field_error_line(app.post_error(Field::Text)),
        Line::from(""),
        Line::from(vec![
            Span::styled(" [Tab]", styles::help_key_style()),
            Span::styled(" switch field  ", styles::muted_style()),
            Span::styled("[Enter]", styles::help_key_style()),
            Span::styled(" post  ", styles::muted_style()),
            Span::styled("[Esc]", styles::help_key_style()),
            Span::styled(" cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_comment_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(60, 8, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(" Add a comment", styles::title_style())),
        Line::from(""),
        Line::from(Span::styled(
            format!(" {}▌", app.comment_input),
            styles::selected_style(),
        )),
    ];
    lines.push(field_error_line(app.comment_error.as_deref()));
    lines.push(Line::from(vec![
        Span::styled(" [Enter]", styles::help_key_style()),
        Span::styled(" send  ", styles::muted_style()),
        Span::styled("[Esc]", styles::help_key_style()),
        Span::styled(" cancel", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_profile_lookup_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(46, 6, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled(" Look up enrollment number", styles::title_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled(" [", styles::muted_style()),
            Span::styled(format!("{:<20}▌", app.profile_query), styles::selected_style()),
            Span::styled("]", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 10, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.extend([
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

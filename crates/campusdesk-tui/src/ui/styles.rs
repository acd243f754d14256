use ratatui::style::{Color, Modifier, Style};

use campusdesk_core::auth::Role;
use campusdesk_core::models::ClassType;

// Campus palette: slate blue chrome, teal for students, amber for teachers.
pub const PRIMARY: Color = Color::Rgb(88, 120, 200);
pub const STUDENT: Color = Color::Rgb(72, 176, 160);
pub const TEACHER: Color = Color::Rgb(224, 168, 72);
pub const ERROR: Color = Color::Rgb(208, 80, 88);
pub const MUTED: Color = Color::Rgb(120, 124, 136);
pub const SELECTION: Color = Color::Rgb(40, 46, 70);
const STATUS_BG: Color = Color::Rgb(28, 30, 44);

// Chrome
pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn tab_style(selected: bool) -> Style {
    if selected {
        title_style().add_modifier(Modifier::UNDERLINED)
    } else {
        muted_style()
    }
}

pub fn border_style(focused: bool) -> Style {
    Style::default().fg(if focused { PRIMARY } else { MUTED })
}

pub fn status_bar_style() -> Style {
    Style::default().bg(STATUS_BG).fg(Color::White)
}

// Text
pub fn list_item_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn selected_style() -> Style {
    Style::default().bg(SELECTION).add_modifier(Modifier::BOLD)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn highlight_style() -> Style {
    Style::default().fg(TEACHER)
}

pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

pub fn input_style(focused: bool) -> Style {
    if focused {
        selected_style()
    } else {
        list_item_style()
    }
}

// Help overlay
pub fn help_key_style() -> Style {
    highlight_style().add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    list_item_style()
}

// Domain
/// Name and role in the title bar.
pub fn role_style(role: Role) -> Style {
    let color = match role {
        Role::Student => STUDENT,
        Role::Teacher => TEACHER,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Unread notifications in the title bar.
pub fn badge_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(TEACHER)
        .add_modifier(Modifier::BOLD)
}

pub fn unread_style() -> Style {
    list_item_style().add_modifier(Modifier::BOLD)
}

/// The class running right now.
pub fn in_progress_style() -> Style {
    Style::default().fg(STUDENT).add_modifier(Modifier::BOLD)
}

/// Labs stand out from lectures in the timetable.
pub fn class_type_style(class_type: ClassType) -> Style {
    match class_type {
        ClassType::Lecture => Style::default(),
        ClassType::Lab => Style::default().fg(STUDENT),
    }
}

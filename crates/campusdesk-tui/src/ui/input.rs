//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use campusdesk_core::routes::Route;
use campusdesk_core::validation::{TEXT_MAX, TITLE_MAX};

use crate::app::{
    can_add_enrollment_char, can_add_password_char, can_add_text_char, App, AppState, Focus,
    LoginFocus, PostFocus, Tab, PAGE_SCROLL_SIZE,
};

/// Longest comment accepted by the input line.
const MAX_COMMENT_LENGTH: usize = 1000;

/// Longest enrollment number accepted by the profile lookup.
const MAX_LOOKUP_LENGTH: usize = 32;

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::LoggingIn => {
            handle_login_input(app, key).await;
            Ok(false)
        }
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            Ok(false)
        }
        AppState::ConfirmingQuit => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                Ok(true)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
                Ok(false)
            }
            _ => Ok(false),
        },
        AppState::ComposingPost => {
            handle_compose_input(app, key);
            Ok(false)
        }
        AppState::Commenting => {
            handle_comment_input(app, key);
            Ok(false)
        }
        AppState::EnteringProfile => {
            handle_lookup_input(app, key);
            Ok(false)
        }
        AppState::Quitting => Ok(true),
        AppState::Normal => {
            handle_normal_input(app, key);
            Ok(false)
        }
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.dismiss_login(),
        KeyCode::Tab | KeyCode::Down => {
            app.login_focus = match app.login_focus {
                LoginFocus::EnrollmentNumber => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::EnrollmentNumber,
            };
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.login_focus = match app.login_focus {
                LoginFocus::EnrollmentNumber => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::EnrollmentNumber,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::EnrollmentNumber => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.attempt_login().await,
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::EnrollmentNumber => {
                app.login_enrollment.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::EnrollmentNumber => {
                if can_add_enrollment_char(app.login_enrollment.chars().count(), c) {
                    app.login_enrollment.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
}

fn handle_compose_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.state = AppState::Normal,
        KeyCode::Tab | KeyCode::BackTab => {
            app.post_focus = match app.post_focus {
                PostFocus::Title => PostFocus::Text,
                PostFocus::Text => PostFocus::Title,
            };
        }
        KeyCode::Enter => match app.post_focus {
            PostFocus::Title => app.post_focus = PostFocus::Text,
            PostFocus::Text => {
                app.submit_post();
            }
        },
        KeyCode::Backspace => {
            match app.post_focus {
                PostFocus::Title => app.post_title.pop(),
                PostFocus::Text => app.post_text.pop(),
            };
        }
        KeyCode::Char(c) => match app.post_focus {
            PostFocus::Title => {
                // One past the limit so the length error can show.
                if can_add_text_char(app.post_title.chars().count(), TITLE_MAX + 1, c) {
                    app.post_title.push(c);
                }
            }
            PostFocus::Text => {
                if can_add_text_char(app.post_text.chars().count(), TEXT_MAX + 1, c) {
                    app.post_text.push(c);
                }
            }
        },
        _ => {}
    }
}

fn handle_comment_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.state = AppState::Normal,
        KeyCode::Enter => {
            app.submit_comment();
        }
        KeyCode::Backspace => {
            app.comment_input.pop();
        }
        KeyCode::Char(c) => {
            if can_add_text_char(app.comment_input.chars().count(), MAX_COMMENT_LENGTH, c) {
                app.comment_input.push(c);
                app.comment_error = None;
            }
        }
        _ => {}
    }
}

fn handle_lookup_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.state = AppState::Normal,
        KeyCode::Enter => app.submit_profile_lookup(),
        KeyCode::Backspace => {
            app.profile_query.pop();
        }
        KeyCode::Char(c) => {
            if can_add_enrollment_char(app.profile_query.chars().count(), c)
                && app.profile_query.chars().count() < MAX_LOOKUP_LENGTH
            {
                app.profile_query.push(c);
            }
        }
        _ => {}
    }
}

fn move_selection(app: &mut App, delta: isize) {
    let len = app.current_list_len();
    if let Some(selection) = app.current_selection_mut() {
        if len == 0 {
            *selection = 0;
            return;
        }
        let max = len - 1;
        *selection = if delta < 0 {
            selection.saturating_sub(delta.unsigned_abs())
        } else {
            (*selection + delta as usize).min(max)
        };
    }
}

fn handle_normal_input(app: &mut App, key: KeyEvent) {
    // Any key press clears a transient status line.
    app.status_message = None;

    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            app.select_tab(Tab::ALL[index]);
        }
        KeyCode::Right | KeyCode::Tab => app.select_tab(app.current_tab.next()),
        KeyCode::Left | KeyCode::BackTab => app.select_tab(app.current_tab.prev()),
        KeyCode::Up | KeyCode::Char('k') => move_selection(app, -1),
        KeyCode::Down | KeyCode::Char('j') => move_selection(app, 1),
        KeyCode::PageUp => move_selection(app, -(PAGE_SCROLL_SIZE as isize)),
        KeyCode::PageDown => move_selection(app, PAGE_SCROLL_SIZE as isize),
        KeyCode::Char('u') => app.refresh_current_tab(),
        KeyCode::Char('L') => {
            if app.is_authenticated() {
                app.logout();
            } else {
                app.start_login();
            }
        }
        _ => handle_tab_input(app, key),
    }
}

fn handle_tab_input(app: &mut App, key: KeyEvent) {
    match (app.current_tab, key.code) {
        (Tab::Dashboard, KeyCode::Char('[')) => app.change_timetable_day(app.timetable_day.prev()),
        (Tab::Dashboard, KeyCode::Char(']')) => app.change_timetable_day(app.timetable_day.next()),
        (Tab::Forum, KeyCode::Enter) if app.focus == Focus::List => {
            if let Some(id) = app.posts.data.get(app.post_selection).map(|p| p.id) {
                app.navigate(Route::Post(id));
            }
        }
        (Tab::Forum, KeyCode::Esc) if app.focus == Focus::Detail => app.navigate(Route::Forum),
        (Tab::Forum, KeyCode::Char('n')) => app.navigate(Route::CreatePost),
        (Tab::Forum, KeyCode::Char('c')) => app.start_comment(),
        (Tab::Notifications, KeyCode::Char('m')) => app.mark_notifications_read(),
        (Tab::Profile, KeyCode::Char('/')) => app.start_profile_lookup(),
        _ => {}
    }
}

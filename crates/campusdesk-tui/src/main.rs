//! campusdesk - a terminal client for the campus learning-management system.
//!
//! This application provides a fast, keyboard-driven interface for the
//! timetable, courses, discussion forum, notifications and profiles.

mod app;
mod ui;

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use campusdesk_core::api::{ApiClient, BearerToken};
use campusdesk_core::auth::{
    Credentials, FileTokenStore, Identity, JwtDecoder, KeyringTokenStore, TokenStore,
};
use campusdesk_core::cache::CacheManager;
use campusdesk_core::config::{self, Config, TokenStorage};
use campusdesk_core::notifications::NotificationPoller;
use campusdesk_core::routes::Route;
use campusdesk_core::session::{RestoreOutcome, SessionManager, SessionPhase, SessionSettings};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Capacity of the notification update channel.
const NOTIFICATION_CHANNEL_SIZE: usize = 16;

/// Log file prefix inside the cache directory; a date suffix is appended daily.
const LOG_FILE_PREFIX: &str = "campusdesk.log";

const USAGE: &str = "\
Usage: campusdesk [OPTION]

Options:
  --open <PATH>   Start on a route, e.g. /forum/12 or /S123
  --login         Log in from the command line and save the session
  --logout        End the saved session
  --status        Print the saved session as JSON
  --help          Show this message

Environment:
  CAMPUSDESK_API_URL, CAMPUSDESK_REFRESH_SECS,
  CAMPUSDESK_ENROLLMENT, CAMPUSDESK_PASSWORD (used by --login)
  RUST_LOG (log filter, default warn)";

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the UI, so logs go to a daily file under
/// `log_dir`. The returned guard flushes the writer when dropped.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

/// Everything the commands and the UI share.
struct Services {
    config: Config,
    session: Arc<SessionManager>,
    api: ApiClient,
    cache: CacheManager,
}

fn token_store(config: &Config, cache_dir: &Path) -> Arc<dyn TokenStore> {
    match config.token_storage {
        TokenStorage::File => Arc::new(FileTokenStore::new(cache_dir.to_path_buf())),
        TokenStorage::Keyring => Arc::new(KeyringTokenStore::new()),
    }
}

fn build_services(config: Config, cache_dir: &Path) -> Result<Services> {
    let bearer = BearerToken::new();
    let api = ApiClient::new(&config, bearer.clone())?;
    let session = SessionManager::new(
        Arc::new(api.clone()),
        token_store(&config, cache_dir),
        Arc::new(JwtDecoder),
        bearer,
        SessionSettings::from_config(&config),
    );
    let cache = CacheManager::new(cache_dir.to_path_buf())?;

    Ok(Services {
        config,
        session,
        api,
        cache,
    })
}

#[derive(Debug, PartialEq)]
enum Command {
    Run { open: Option<Route> },
    Login,
    Logout,
    Status,
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args.get(1).map(String::as_str) {
        None => Ok(Command::Run { open: None }),
        Some("--open") => {
            let path = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("--open needs a path"))?;
            Ok(Command::Run {
                open: Some(Route::parse(path)),
            })
        }
        Some("--login") => Ok(Command::Login),
        Some("--logout") => Ok(Command::Logout),
        Some("--status") => Ok(Command::Status),
        Some("--help") | Some("-h") => Ok(Command::Help),
        Some(other) => Err(anyhow::anyhow!("Unknown option '{}'\n\n{}", other, USAGE)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = Config::load()?;
    config.apply_env();
    let cache_dir = config.cache_dir()?;
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create {}", cache_dir.display()))?;

    let _log_guard = init_tracing(&cache_dir);
    info!("campusdesk starting");
    for warning in config.validate() {
        warn!("{}", warning);
    }

    let services = build_services(config, &cache_dir)?;

    // Nothing protected is shown before this returns. One-shot commands exit
    // right away, so they must not start a token rotation they cannot save.
    let restored = match command {
        Command::Run { .. } => services.session.restore_session(),
        _ => services.session.restore_session_without_refresh(),
    };
    match restored {
        RestoreOutcome::Restored(identity) => {
            info!(enrollment = %identity.enrollment_number, "Session restored");
        }
        RestoreOutcome::Anonymous => info!("No saved session"),
    }

    match command {
        Command::Login => login_command(&services).await,
        Command::Logout => {
            services.session.logout();
            if let Err(e) = services.cache.clear() {
                warn!(error = %e, "Failed to clear cache");
            }
            println!("Logged out");
            Ok(())
        }
        Command::Status => status_command(&services),
        Command::Run { open } => run_tui(services, open).await,
        Command::Help => Ok(()),
    }
}

#[derive(Serialize)]
struct SessionStatus {
    phase: SessionPhase,
    api_base_url: String,
    identity: Option<Identity>,
}

fn status_command(services: &Services) -> Result<()> {
    let status = SessionStatus {
        phase: services.session.phase(),
        api_base_url: services.config.api_base().to_string(),
        identity: services.session.current_identity(),
    };
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// Prompt for a line on the terminal, showing `default` if there is one.
fn prompt_line(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();
    Ok(match (line.is_empty(), default) {
        (true, Some(d)) => d.to_string(),
        _ => line.to_string(),
    })
}

async fn login_command(services: &Services) -> Result<()> {
    let enrollment = match std::env::var(config::ENV_ENROLLMENT) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => prompt_line(
            "Enrollment number",
            services.config.last_enrollment_number.as_deref(),
        )?,
    };
    let password = match std::env::var(config::ENV_PASSWORD) {
        Ok(value) if !value.is_empty() => value,
        _ => rpassword::prompt_password("Password: ")?,
    };

    let credentials = Credentials::new(enrollment.trim(), password);
    match services.session.login(&credentials).await {
        Ok(identity) => {
            let mut config = services.config.clone();
            config.last_enrollment_number = Some(identity.enrollment_number.clone());
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            println!(
                "Logged in as {} ({})",
                identity.display_name,
                identity.role.display_name()
            );
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(e.user_message())),
    }
}

async fn run_tui(services: Services, open: Option<Route>) -> Result<()> {
    let Services {
        config,
        session,
        api,
        cache,
    } = services;

    let (notification_tx, notification_rx) = mpsc::channel(NOTIFICATION_CHANNEL_SIZE);
    let poller = NotificationPoller::new(
        Arc::new(api.clone()),
        config.notification_interval(),
        notification_tx,
    );
    let binding = poller.bind(&session);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, session, api, cache, poller, notification_rx);

    if app.is_authenticated() {
        // Cached data first, then the network.
        app.load_from_cache();
        app.refresh_all_background();
        app.navigate(open.unwrap_or(Route::Dashboard));
    } else {
        match open {
            Some(route) => app.navigate(route),
            None => app.start_login(),
        }
    }

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    binding.abort();
    app.poller.stop();

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("campusdesk shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("campusdesk")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(parse_args(&args(&[])).unwrap(), Command::Run { open: None });
        assert_eq!(parse_args(&args(&["--status"])).unwrap(), Command::Status);
        assert_eq!(parse_args(&args(&["--login"])).unwrap(), Command::Login);
        assert_eq!(
            parse_args(&args(&["--open", "/forum/7"])).unwrap(),
            Command::Run {
                open: Some(Route::Post(7))
            }
        );
        assert!(parse_args(&args(&["--open"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }
}

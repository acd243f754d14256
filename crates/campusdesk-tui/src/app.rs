//! Application state management for campusdesk.
//!
//! This module contains the core `App` struct that manages all application state,
//! including UI state, fetched data, the session, and background task coordination.

use std::future::Future;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use campusdesk_core::api::ApiClient;
use campusdesk_core::auth::{Credentials, Identity};
use campusdesk_core::cache::{CacheAges, CacheManager};
use campusdesk_core::config::Config;
use campusdesk_core::models::{
    unread_count, Announcement, Comment, Course, NewComment, NewPost, Notification, Post,
    PostDetail, TeacherStats, TimetableEntry, UserProfile, Weekday,
};
use campusdesk_core::notifications::{NotificationPoller, NotificationUpdate};
use campusdesk_core::routes::{guard, Route};
use campusdesk_core::session::{LogoutReason, SessionEvent, SessionManager};
use campusdesk_core::validation::{self, Field, FieldError};
use campusdesk_core::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for enrollment number input.
const MAX_ENROLLMENT_LENGTH: usize = 32;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Cache owner key for a teacher's own timetable.
const TEACHER_TIMETABLE_OWNER: &str = "teacher";

// ============================================================================
// Navigation Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Courses,
    Forum,
    Notifications,
    Profile,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Dashboard,
        Tab::Courses,
        Tab::Forum,
        Tab::Notifications,
        Tab::Profile,
    ];

    /// Get the display title for this tab.
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Courses => "Courses",
            Tab::Forum => "Forum",
            Tab::Notifications => "Notifications",
            Tab::Profile => "Profile",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Courses,
            Tab::Courses => Tab::Forum,
            Tab::Forum => Tab::Notifications,
            Tab::Notifications => Tab::Profile,
            Tab::Profile => Tab::Dashboard,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Profile,
            Tab::Courses => Tab::Dashboard,
            Tab::Forum => Tab::Courses,
            Tab::Notifications => Tab::Forum,
            Tab::Profile => Tab::Notifications,
        }
    }

    /// Route shown when the tab is selected directly.
    pub fn route(&self, identity: Option<&Identity>) -> Route {
        match self {
            Tab::Dashboard | Tab::Courses | Tab::Notifications => Route::Dashboard,
            Tab::Forum => Route::Forum,
            Tab::Profile => match identity {
                Some(id) if id.is_teacher() => Route::TeacherProfile,
                Some(id) => Route::UserProfile(id.enrollment_number.clone()),
                // Any protected route; the guard sends it to the login form.
                None => Route::TeacherProfile,
            },
        }
    }
}

/// Current UI focus area (list panel or detail panel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Detail,
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    LoggingIn,
    ComposingPost,
    Commenting,
    EnteringProfile,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    EnrollmentNumber,
    Password,
    Button,
}

/// New-post form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PostFocus {
    Title,
    Text,
}

// ============================================================================
// Per-list load state
// ============================================================================

/// Data behind one panel with its loading and error flags.
#[derive(Debug, Clone, Default)]
pub struct Loadable<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T: Default> Loadable<T> {
    pub fn start(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn finish(&mut self, data: T) {
        self.data = data;
        self.loading = false;
        self.error = None;
    }

    pub fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Which panel a failed load belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Timetable,
    Announcements,
    Courses,
    Posts,
    PostDetail,
    Profile,
    Notifications,
    /// Form submissions: the error goes to the status line.
    Submit,
}

/// Results sent from background fetch tasks back to the main loop.
enum LoadResult {
    Timetable(Weekday, Vec<TimetableEntry>),
    Announcements(Vec<Announcement>),
    Courses(Vec<Course>),
    Posts(Vec<Post>),
    PostDetail(PostDetail),
    PostCreated(Post),
    CommentAdded(i64, Comment),
    Profile(UserProfile),
    TeacherStats(TeacherStats),
    NotificationsMarked,
    Error(Section, String),
}

/// Turn a fetch error into the line shown in a panel.
fn error_message(err: &anyhow::Error) -> String {
    err.downcast_ref::<ApiError>()
        .map(ApiError::user_message)
        .unwrap_or_else(|| err.to_string())
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
    pub cache: CacheManager,
    pub poller: Arc<NotificationPoller>,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub route: Route,
    pub focus: Focus,
    pub status_message: Option<String>,

    // Login form
    pub login_enrollment: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // New post form
    pub post_title: String,
    pub post_text: String,
    pub post_focus: PostFocus,
    pub post_errors: Vec<FieldError>,

    // Comment and profile lookup inputs
    pub comment_input: String,
    pub comment_error: Option<String>,
    pub profile_query: String,

    // Data
    pub timetable_day: Weekday,
    pub timetable: Loadable<Vec<TimetableEntry>>,
    pub announcements: Loadable<Vec<Announcement>>,
    pub courses: Loadable<Vec<Course>>,
    pub posts: Loadable<Vec<Post>>,
    pub post_detail: Loadable<Option<PostDetail>>,
    pub profile: Loadable<Option<UserProfile>>,
    pub teacher_stats: Option<TeacherStats>,
    pub notifications: Loadable<Vec<Notification>>,
    pub cache_ages: CacheAges,

    // Selections
    pub timetable_selection: usize,
    pub course_selection: usize,
    pub post_selection: usize,
    pub comment_selection: usize,
    pub notification_selection: usize,

    // Background channels. Fetch results carry the epoch they were started in.
    load_epoch: u64,
    load_tx: mpsc::Sender<(u64, LoadResult)>,
    load_rx: mpsc::Receiver<(u64, LoadResult)>,
    session_rx: broadcast::Receiver<SessionEvent>,
    notification_rx: mpsc::Receiver<NotificationUpdate>,
}

impl App {
    /// Create the app around an already-restored session.
    pub fn new(
        config: Config,
        session: Arc<SessionManager>,
        api: ApiClient,
        cache: CacheManager,
        poller: Arc<NotificationPoller>,
        notification_rx: mpsc::Receiver<NotificationUpdate>,
    ) -> Self {
        let (load_tx, load_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let session_rx = session.subscribe();
        let login_enrollment = config.last_enrollment_number.clone().unwrap_or_default();
        let cache_ages = cache.get_cache_ages();

        Self {
            config,
            session,
            api,
            cache,
            poller,
            state: AppState::Normal,
            current_tab: Tab::Dashboard,
            route: Route::Dashboard,
            focus: Focus::List,
            status_message: None,
            login_enrollment,
            login_password: String::new(),
            login_focus: LoginFocus::EnrollmentNumber,
            login_error: None,
            post_title: String::new(),
            post_text: String::new(),
            post_focus: PostFocus::Title,
            post_errors: Vec::new(),
            comment_input: String::new(),
            comment_error: None,
            profile_query: String::new(),
            timetable_day: Weekday::today(),
            timetable: Loadable::default(),
            announcements: Loadable::default(),
            courses: Loadable::default(),
            posts: Loadable::default(),
            post_detail: Loadable::default(),
            profile: Loadable::default(),
            teacher_stats: None,
            notifications: Loadable::default(),
            cache_ages,
            timetable_selection: 0,
            course_selection: 0,
            post_selection: 0,
            comment_selection: 0,
            notification_selection: 0,
            load_epoch: 0,
            load_tx,
            load_rx,
            session_rx,
            notification_rx,
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.session.current_identity()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn unread_notifications(&self) -> usize {
        unread_count(&self.notifications.data)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Show `route`, or wherever the guard sends it instead.
    pub fn navigate(&mut self, route: Route) {
        let identity = self.identity();
        let resolved = guard(route.clone(), identity.as_ref());
        if resolved != route {
            debug!(from = %route.path(), to = %resolved.path(), "Route redirected");
        }
        self.route = resolved.clone();

        match resolved {
            Route::Login => self.start_login(),
            Route::Dashboard => {
                if !matches!(self.current_tab, Tab::Courses | Tab::Notifications) {
                    self.current_tab = Tab::Dashboard;
                }
                self.focus = Focus::List;
            }
            Route::Forum => {
                self.current_tab = Tab::Forum;
                self.focus = Focus::List;
                self.post_detail.reset();
            }
            Route::Post(id) => {
                self.current_tab = Tab::Forum;
                self.focus = Focus::Detail;
                self.fetch_post_detail(id);
            }
            Route::CreatePost => {
                self.current_tab = Tab::Forum;
                self.start_compose();
            }
            Route::UserProfile(enrollment) => {
                self.current_tab = Tab::Profile;
                self.teacher_stats = None;
                self.fetch_profile(enrollment);
            }
            Route::TeacherProfile => {
                self.current_tab = Tab::Profile;
                if let Some(identity) = identity {
                    self.fetch_profile(identity.enrollment_number.clone());
                    self.fetch_teacher_extras(identity.user_id);
                }
            }
            Route::NotFound => {
                self.status_message = Some("Page not found".to_string());
            }
        }
    }

    /// Switch tabs through the route guard.
    pub fn select_tab(&mut self, tab: Tab) {
        let identity = self.identity();
        let route = tab.route(identity.as_ref());
        if guard(route.clone(), identity.as_ref()) == Route::Login {
            self.navigate(route);
            return;
        }
        self.current_tab = tab;
        if tab == Tab::Profile {
            self.navigate(route);
        } else {
            self.route = route;
            self.focus = Focus::List;
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Start the login process (show login overlay)
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_enrollment.is_empty() {
            LoginFocus::EnrollmentNumber
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Leave the login form without logging in. Only public screens remain.
    pub fn dismiss_login(&mut self) {
        self.login_password.clear();
        self.login_error = None;
        self.state = AppState::Normal;
        self.navigate(Route::Forum);
        self.fetch_posts();
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) {
        let errors = validation::validate_login(&self.login_enrollment, &self.login_password);
        if let Some(first) = errors.first() {
            self.login_focus = match first.field {
                Field::Password => LoginFocus::Password,
                _ => LoginFocus::EnrollmentNumber,
            };
            self.login_error = Some(first.message.clone());
            return;
        }

        self.login_error = None;
        let credentials = Credentials::new(self.login_enrollment.trim(), self.login_password.clone());

        match self.session.login(&credentials).await {
            Ok(identity) => {
                self.login_password.clear();
                self.state = AppState::Normal;
                self.config.last_enrollment_number = Some(identity.enrollment_number.clone());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                info!(role = ?identity.role, "Login successful");
                // Navigation to the landing route happens on the LoggedIn event.
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.login_password.clear();
                self.login_focus = LoginFocus::Password;
                self.login_error = Some(e.user_message());
            }
        }
    }

    pub fn logout(&mut self) {
        self.session.logout();
    }

    /// Drop everything fetched for the previous user.
    ///
    /// Bumping the epoch orphans fetches still in flight, so their replies
    /// are neither shown nor cached.
    fn clear_user_data(&mut self) {
        self.load_epoch += 1;
        self.timetable.reset();
        self.announcements.reset();
        self.courses.reset();
        self.posts.reset();
        self.post_detail.reset();
        self.profile.reset();
        self.notifications.reset();
        self.teacher_stats = None;
        self.timetable_selection = 0;
        self.course_selection = 0;
        self.post_selection = 0;
        self.comment_selection = 0;
        self.notification_selection = 0;

        if let Err(e) = self.cache.clear() {
            warn!(error = %e, "Failed to clear cache");
        }
        self.cache_ages = self.cache.get_cache_ages();
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::LoggedIn { identity, landing } => {
                info!(enrollment = %identity.enrollment_number, "Session started");
                self.load_epoch += 1;
                self.status_message = Some(format!("Welcome, {}", identity.display_name));
                self.current_tab = Tab::Dashboard;
                self.navigate(landing);
                self.refresh_all_background();
            }
            SessionEvent::Restored { .. } | SessionEvent::Refreshed { .. } => {}
            SessionEvent::LoggedOut { reason, redirect } => {
                self.clear_user_data();
                self.status_message = Some(match reason {
                    LogoutReason::Expired => "Session expired. Please log in again.".to_string(),
                    LogoutReason::UserRequested => "Logged out".to_string(),
                });
                self.state = AppState::Normal;
                self.navigate(redirect);
            }
        }
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    fn timetable_owner(&self) -> Option<String> {
        let identity = self.identity()?;
        if identity.is_teacher() {
            Some(TEACHER_TIMETABLE_OWNER.to_string())
        } else {
            identity.batch
        }
    }

    /// Load all data from cache
    pub fn load_from_cache(&mut self) {
        if let Ok(Some(cached)) = self.cache.load_courses() {
            self.courses.data = cached.data;
        }
        if let Ok(Some(cached)) = self.cache.load_announcements() {
            self.announcements.data = cached.data;
        }
        if let Ok(Some(cached)) = self.cache.load_posts() {
            self.posts.data = cached.data;
        }
        if let Some(owner) = self.timetable_owner() {
            if let Ok(Some(cached)) = self.cache.load_timetable(&owner, self.timetable_day) {
                self.timetable.data = cached.data;
            }
        }
        self.cache_ages = self.cache.get_cache_ages();
    }

    pub fn is_cache_stale(&self) -> bool {
        self.cache.any_stale()
    }

    // =========================================================================
    // Background Fetches
    // =========================================================================

    fn spawn_load<F>(&self, task: F)
    where
        F: Future<Output = LoadResult> + Send + 'static,
    {
        let tx = self.load_tx.clone();
        let epoch = self.load_epoch;
        tokio::spawn(async move {
            let _ = tx.send((epoch, task.await)).await;
        });
    }

    /// Fetch everything the dashboard, courses and forum tabs show.
    pub fn refresh_all_background(&mut self) {
        self.fetch_timetable();
        self.fetch_announcements();
        self.fetch_courses();
        self.fetch_posts();
    }

    /// Refresh the data behind the current tab.
    pub fn refresh_current_tab(&mut self) {
        match self.current_tab {
            Tab::Dashboard => {
                self.fetch_timetable();
                self.fetch_announcements();
            }
            Tab::Courses => self.fetch_courses(),
            Tab::Forum => match self.post_detail.data.as_ref().map(|d| d.post.id) {
                Some(id) if self.focus == Focus::Detail => self.fetch_post_detail(id),
                _ => self.fetch_posts(),
            },
            Tab::Notifications => {
                self.notifications.start();
                let poller = self.poller.clone();
                tokio::spawn(async move { poller.poll_now().await });
            }
            Tab::Profile => {
                let route = self.route.clone();
                self.navigate(route);
            }
        }
    }

    pub fn fetch_timetable(&mut self) {
        let Some(identity) = self.identity() else {
            return;
        };
        let day = self.timetable_day;
        let api = self.api.clone();

        if identity.is_teacher() {
            self.timetable.start();
            self.spawn_load(async move {
                match api.fetch_teacher_timetable(day).await {
                    Ok(entries) => LoadResult::Timetable(day, entries),
                    Err(e) => LoadResult::Error(Section::Timetable, error_message(&e)),
                }
            });
        } else if let Some(batch) = identity.batch {
            self.timetable.start();
            self.spawn_load(async move {
                match api.fetch_timetable(&batch, day).await {
                    Ok(entries) => LoadResult::Timetable(day, entries),
                    Err(e) => LoadResult::Error(Section::Timetable, error_message(&e)),
                }
            });
        } else {
            self.timetable.fail("No batch assigned".to_string());
        }
    }

    /// Move the dashboard timetable to another day and load it.
    pub fn change_timetable_day(&mut self, day: Weekday) {
        self.timetable_day = day;
        self.timetable_selection = 0;
        self.timetable.data.clear();
        if let Some(owner) = self.timetable_owner() {
            if let Ok(Some(cached)) = self.cache.load_timetable(&owner, day) {
                self.timetable.data = cached.data;
            }
        }
        self.fetch_timetable();
    }

    pub fn fetch_announcements(&mut self) {
        self.announcements.start();
        let api = self.api.clone();
        self.spawn_load(async move {
            match api.fetch_announcements().await {
                Ok(list) => LoadResult::Announcements(list),
                Err(e) => LoadResult::Error(Section::Announcements, error_message(&e)),
            }
        });
    }

    pub fn fetch_courses(&mut self) {
        let Some(identity) = self.identity() else {
            return;
        };
        self.courses.start();
        let api = self.api.clone();
        self.spawn_load(async move {
            let result = if identity.is_teacher() {
                api.fetch_teacher_courses(identity.user_id).await
            } else {
                api.fetch_courses().await
            };
            match result {
                Ok(list) => LoadResult::Courses(list),
                Err(e) => LoadResult::Error(Section::Courses, error_message(&e)),
            }
        });
    }

    pub fn fetch_posts(&mut self) {
        self.posts.start();
        let api = self.api.clone();
        self.spawn_load(async move {
            match api.fetch_posts().await {
                Ok(list) => LoadResult::Posts(list),
                Err(e) => LoadResult::Error(Section::Posts, error_message(&e)),
            }
        });
    }

    pub fn fetch_post_detail(&mut self, id: i64) {
        self.post_detail.start();
        self.comment_selection = 0;
        let api = self.api.clone();
        self.spawn_load(async move {
            match api.fetch_post(id).await {
                Ok(detail) => LoadResult::PostDetail(detail),
                Err(e) => LoadResult::Error(Section::PostDetail, error_message(&e)),
            }
        });
    }

    pub fn fetch_profile(&mut self, enrollment: String) {
        self.profile.start();
        let api = self.api.clone();
        self.spawn_load(async move {
            match api.fetch_profile(&enrollment).await {
                Ok(profile) => LoadResult::Profile(profile),
                Err(e) => LoadResult::Error(Section::Profile, error_message(&e)),
            }
        });
    }

    /// Stats and taught courses shown on the teacher landing page, fetched together.
    fn fetch_teacher_extras(&mut self, teacher_id: i64) {
        self.courses.start();
        let api = self.api.clone();
        let tx = self.load_tx.clone();
        let epoch = self.load_epoch;
        tokio::spawn(async move {
            let (stats, courses) = futures::join!(
                api.fetch_teacher_stats(teacher_id),
                api.fetch_teacher_courses(teacher_id)
            );
            let results = [
                match stats {
                    Ok(stats) => LoadResult::TeacherStats(stats),
                    Err(e) => LoadResult::Error(Section::Profile, error_message(&e)),
                },
                match courses {
                    Ok(list) => LoadResult::Courses(list),
                    Err(e) => LoadResult::Error(Section::Courses, error_message(&e)),
                },
            ];
            for result in results {
                if tx.send((epoch, result)).await.is_err() {
                    break;
                }
            }
        });
    }

    pub fn mark_notifications_read(&mut self) {
        if self.unread_notifications() == 0 {
            return;
        }
        let poller = self.poller.clone();
        self.spawn_load(async move {
            match poller.mark_all_read().await {
                Ok(()) => LoadResult::NotificationsMarked,
                Err(e) => LoadResult::Error(Section::Notifications, error_message(&e)),
            }
        });
    }

    // =========================================================================
    // Forms
    // =========================================================================

    pub fn start_compose(&mut self) {
        self.post_title.clear();
        self.post_text.clear();
        self.post_errors.clear();
        self.post_focus = PostFocus::Title;
        self.state = AppState::ComposingPost;
    }

    pub fn post_error(&self, field: Field) -> Option<&str> {
        self.post_errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Validate and send the new-post form. Returns false when the form stays open.
    pub fn submit_post(&mut self) -> bool {
        self.post_errors = validation::validate_post(&self.post_title, &self.post_text);
        if !self.post_errors.is_empty() {
            return false;
        }
        let Some(identity) = self.identity() else {
            self.navigate(Route::CreatePost);
            return false;
        };

        let post = NewPost {
            title: self.post_title.trim().to_string(),
            text: self.post_text.trim().to_string(),
            user: identity.user_id,
        };
        let api = self.api.clone();
        self.spawn_load(async move {
            match api.create_post(&post).await {
                Ok(created) => LoadResult::PostCreated(created),
                Err(e) => LoadResult::Error(Section::Submit, error_message(&e)),
            }
        });

        self.status_message = Some("Posting...".to_string());
        self.state = AppState::Normal;
        true
    }

    pub fn start_comment(&mut self) {
        if self.post_detail.data.is_none() {
            return;
        }
        if !self.is_authenticated() {
            self.status_message = Some("Log in to comment".to_string());
            self.start_login();
            return;
        }
        self.comment_input.clear();
        self.comment_error = None;
        self.state = AppState::Commenting;
    }

    /// Validate and send the comment. Returns false when the input stays open.
    pub fn submit_comment(&mut self) -> bool {
        if let Err(e) = validation::validate_comment(&self.comment_input) {
            self.comment_error = Some(e.message);
            return false;
        }
        let (Some(identity), Some(post_id)) =
            (self.identity(), self.post_detail.data.as_ref().map(|d| d.post.id))
        else {
            self.state = AppState::Normal;
            return false;
        };

        let comment = NewComment {
            text: self.comment_input.trim().to_string(),
            user: identity.user_id,
        };
        let api = self.api.clone();
        self.spawn_load(async move {
            match api.add_comment(post_id, &comment).await {
                Ok(created) => LoadResult::CommentAdded(post_id, created),
                Err(e) => LoadResult::Error(Section::Submit, error_message(&e)),
            }
        });

        self.comment_input.clear();
        self.state = AppState::Normal;
        true
    }

    pub fn start_profile_lookup(&mut self) {
        self.profile_query.clear();
        self.state = AppState::EnteringProfile;
    }

    pub fn submit_profile_lookup(&mut self) {
        let query = self.profile_query.trim().to_string();
        self.state = AppState::Normal;
        if !query.is_empty() {
            self.navigate(Route::UserProfile(query));
        }
    }

    // =========================================================================
    // Background Task Processing
    // =========================================================================

    /// Drain session events, notification updates and fetch results.
    pub fn check_background_tasks(&mut self) {
        loop {
            match self.session_rx.try_recv() {
                Ok(event) => self.handle_session_event(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "UI missed session events");
                }
                Err(_) => break,
            }
        }

        while let Ok(update) = self.notification_rx.try_recv() {
            self.process_notification_update(update);
        }

        while let Ok((epoch, result)) = self.load_rx.try_recv() {
            if epoch != self.load_epoch {
                debug!(
                    epoch,
                    current = self.load_epoch,
                    "Dropping result from an earlier session"
                );
                continue;
            }
            self.process_load_result(result);
        }
    }

    fn process_notification_update(&mut self, update: NotificationUpdate) {
        match update {
            NotificationUpdate::Loaded(list) => {
                self.notification_selection =
                    self.notification_selection.min(list.len().saturating_sub(1));
                self.notifications.finish(list);
            }
            NotificationUpdate::Failed(message) => self.notifications.fail(message),
            NotificationUpdate::Cleared => self.notifications.reset(),
        }
    }

    /// Process a single result from a background task.
    fn process_load_result(&mut self, result: LoadResult) {
        match result {
            LoadResult::Timetable(day, entries) => {
                // A reply for a day the user already moved away from.
                if day != self.timetable_day {
                    return;
                }
                if let Some(owner) = self.timetable_owner() {
                    if let Err(e) = self.cache.save_timetable(&owner, day, &entries) {
                        warn!(error = %e, "Failed to cache timetable");
                    }
                }
                self.timetable_selection = 0;
                self.timetable.finish(entries);
            }
            LoadResult::Announcements(list) => {
                if let Err(e) = self.cache.save_announcements(&list) {
                    warn!(error = %e, "Failed to cache announcements");
                }
                self.announcements.finish(list);
                self.cache_ages = self.cache.get_cache_ages();
            }
            LoadResult::Courses(list) => {
                if let Err(e) = self.cache.save_courses(&list) {
                    warn!(error = %e, "Failed to cache courses");
                }
                self.course_selection = self.course_selection.min(list.len().saturating_sub(1));
                self.courses.finish(list);
                self.cache_ages = self.cache.get_cache_ages();
            }
            LoadResult::Posts(list) => {
                if let Err(e) = self.cache.save_posts(&list) {
                    warn!(error = %e, "Failed to cache posts");
                }
                self.post_selection = self.post_selection.min(list.len().saturating_sub(1));
                self.posts.finish(list);
                self.cache_ages = self.cache.get_cache_ages();
            }
            LoadResult::PostDetail(detail) => {
                self.post_detail.finish(Some(detail));
            }
            LoadResult::PostCreated(post) => {
                self.status_message = Some(format!("Posted \"{}\"", post.title));
                let id = post.id;
                self.posts.data.insert(0, post);
                self.post_selection = 0;
                self.navigate(Route::Post(id));
            }
            LoadResult::CommentAdded(post_id, comment) => {
                if let Some(detail) = self.post_detail.data.as_mut() {
                    if detail.post.id == post_id {
                        detail.push_comment(comment);
                        self.comment_selection = 0;
                    }
                }
                self.status_message = Some("Comment added".to_string());
            }
            LoadResult::Profile(profile) => self.profile.finish(Some(profile)),
            LoadResult::TeacherStats(stats) => self.teacher_stats = Some(stats),
            LoadResult::NotificationsMarked => {
                self.status_message = Some("All notifications marked as read".to_string());
            }
            LoadResult::Error(section, message) => {
                warn!(?section, error = %message, "Background load failed");
                match section {
                    Section::Timetable => self.timetable.fail(message),
                    Section::Announcements => self.announcements.fail(message),
                    Section::Courses => self.courses.fail(message),
                    Section::Posts => self.posts.fail(message),
                    Section::PostDetail => self.post_detail.fail(message),
                    Section::Profile => self.profile.fail(message),
                    Section::Notifications => self.notifications.fail(message),
                    Section::Submit => self.status_message = Some(message),
                }
            }
        }
    }

    // =========================================================================
    // Selection helpers
    // =========================================================================

    /// Length of the list the arrow keys currently move through.
    pub fn current_list_len(&self) -> usize {
        match self.current_tab {
            Tab::Dashboard => self.timetable.data.len(),
            Tab::Courses => self.courses.data.len(),
            Tab::Forum => match (&self.focus, &self.post_detail.data) {
                (Focus::Detail, Some(detail)) => detail.comments.len(),
                _ => self.posts.data.len(),
            },
            Tab::Notifications => self.notifications.data.len(),
            Tab::Profile => 0,
        }
    }

    pub fn current_selection_mut(&mut self) -> Option<&mut usize> {
        match self.current_tab {
            Tab::Dashboard => Some(&mut self.timetable_selection),
            Tab::Courses => Some(&mut self.course_selection),
            Tab::Forum if self.focus == Focus::Detail => Some(&mut self.comment_selection),
            Tab::Forum => Some(&mut self.post_selection),
            Tab::Notifications => Some(&mut self.notification_selection),
            Tab::Profile => None,
        }
    }

    /// The timetable row that is running right now, if today is shown.
    pub fn class_in_progress(&self) -> Option<usize> {
        let today = Weekday::today();
        if today != self.timetable_day {
            return None;
        }
        let now = Local::now().time();
        self.timetable
            .data
            .iter()
            .position(|entry| entry.is_in_progress(today, now))
    }
}

// ============================================================================
// Input Validation
// ============================================================================

/// Validates that a character is safe for text input.
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an enrollment number character should be accepted
pub fn can_add_enrollment_char(current_len: usize, c: char) -> bool {
    current_len < MAX_ENROLLMENT_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

/// Check if a character may be typed into a post title, text or comment
pub fn can_add_text_char(current_len: usize, max_len: usize, c: char) -> bool {
    current_len < max_len && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use campusdesk_core::api::BearerToken;
    use campusdesk_core::auth::{JwtDecoder, MemoryTokenStore};
    use campusdesk_core::session::SessionSettings;

    fn test_app(dir: &tempfile::TempDir) -> App {
        let config = Config {
            api_base_url: "http://127.0.0.1:9/api".to_string(),
            ..Config::default()
        };
        let bearer = BearerToken::new();
        let api = ApiClient::new(&config, bearer.clone()).unwrap();
        let session = SessionManager::new(
            Arc::new(api.clone()),
            Arc::new(MemoryTokenStore::new()),
            Arc::new(JwtDecoder),
            bearer,
            SessionSettings::from_config(&config),
        );
        session.restore_session();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        let (tx, rx) = mpsc::channel(8);
        let poller = NotificationPoller::new(Arc::new(api.clone()), config.notification_interval(), tx);
        App::new(config, session, api, cache, poller, rx)
    }

    // -------------------------------------------------------------------------
    // Tab Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_tab_cycle() {
        for tab in Tab::ALL {
            assert_eq!(tab.next().prev(), tab);
        }
        assert_eq!(Tab::Profile.next(), Tab::Dashboard);
        assert_eq!(Tab::Dashboard.prev(), Tab::Profile);
    }

    #[test]
    fn test_anonymous_profile_route_is_protected() {
        assert!(Tab::Profile.route(None).requires_auth());
        assert!(!Tab::Forum.route(None).requires_auth());
    }

    // -------------------------------------------------------------------------
    // Input Validation Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_can_add_enrollment_char() {
        assert!(can_add_enrollment_char(0, 'S'));
        assert!(can_add_enrollment_char(5, '7'));
        assert!(!can_add_enrollment_char(3, ' '));
        assert!(!can_add_enrollment_char(0, '\n'));
        assert!(!can_add_enrollment_char(MAX_ENROLLMENT_LENGTH, 'a'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, 'a'));
        assert!(can_add_password_char(0, ' '));
        assert!(can_add_password_char(MAX_PASSWORD_LENGTH - 1, '!'));
        assert!(!can_add_password_char(MAX_PASSWORD_LENGTH, 'a'));
        assert!(!can_add_password_char(0, '\x1b'));
    }

    #[test]
    fn test_loadable_transitions() {
        let mut list: Loadable<Vec<u32>> = Loadable::default();
        list.start();
        assert!(list.loading);
        list.fail("boom".to_string());
        assert!(!list.loading);
        assert_eq!(list.error.as_deref(), Some("boom"));
        list.start();
        assert!(list.error.is_none());
        list.finish(vec![1, 2]);
        assert_eq!(list.data, vec![1, 2]);
        list.reset();
        assert!(list.data.is_empty());
    }

    // -------------------------------------------------------------------------
    // Navigation Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_protected_tab_shows_login_when_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);

        app.select_tab(Tab::Profile);
        assert_eq!(app.state, AppState::LoggingIn);
        assert_eq!(app.route, Route::Login);
        assert_eq!(app.current_tab, Tab::Dashboard);
    }

    #[tokio::test]
    async fn test_dismissing_login_lands_on_public_forum() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);

        app.start_login();
        app.login_password = "secret".to_string();
        app.dismiss_login();
        assert_eq!(app.state, AppState::Normal);
        assert_eq!(app.current_tab, Tab::Forum);
        assert_eq!(app.route, Route::Forum);
        assert!(app.login_password.is_empty());
    }

    #[tokio::test]
    async fn test_login_form_validates_before_sending() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);

        app.start_login();
        app.login_enrollment = "S123".to_string();
        app.attempt_login().await;
        assert_eq!(app.login_error.as_deref(), Some("Password is required"));
        assert_eq!(app.login_focus, LoginFocus::Password);
        assert!(!app.is_authenticated());
    }

    #[tokio::test]
    async fn test_invalid_post_keeps_form_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);

        app.start_compose();
        app.post_title = "Hi".to_string();
        app.post_text = "short".to_string();
        assert!(!app.submit_post());
        assert_eq!(app.state, AppState::ComposingPost);
        assert!(app.post_error(Field::Title).is_some());
        assert!(app.post_error(Field::Text).is_some());
    }

    #[tokio::test]
    async fn test_logout_event_clears_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.cache.save_posts(&[]).unwrap();
        app.courses.finish(Vec::new());
        app.teacher_stats = Some(TeacherStats::default());

        app.session.logout();
        app.check_background_tasks();

        assert!(app.teacher_stats.is_none());
        assert_eq!(app.status_message.as_deref(), Some("Logged out"));
        assert_eq!(app.state, AppState::LoggingIn);
        assert!(app.cache.load_posts().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_results_from_before_logout_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        let course = Course {
            id: 1,
            name: "Data Structures".to_string(),
            code: "CS101".to_string(),
            description: None,
        };

        // Started for the previous user, delivered after the logout.
        let epoch = app.load_epoch;
        app.load_tx
            .send((epoch, LoadResult::Courses(vec![course.clone()])))
            .await
            .unwrap();
        app.session.logout();
        app.check_background_tasks();

        assert!(app.courses.data.is_empty());
        assert!(app.cache.load_courses().unwrap().is_none());

        // Results from the current epoch still land.
        app.load_tx
            .send((app.load_epoch, LoadResult::Courses(vec![course])))
            .await
            .unwrap();
        app.check_background_tasks();
        assert_eq!(app.courses.data.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_timetable_reply_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.timetable_day = Weekday::Monday;

        app.process_load_result(LoadResult::Timetable(Weekday::Tuesday, Vec::new()));
        assert!(!app.timetable.loading);
        app.timetable.start();
        app.process_load_result(LoadResult::Timetable(Weekday::Tuesday, Vec::new()));
        assert!(app.timetable.loading);
    }
}

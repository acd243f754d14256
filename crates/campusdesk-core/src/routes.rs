//! Navigation targets and the authenticated/anonymous route guard.

use crate::auth::{Identity, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Forum,
    Post(i64),
    CreatePost,
    UserProfile(String),
    TeacherProfile,
    NotFound,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Dashboard => "/".to_string(),
            Route::Forum => "/forum".to_string(),
            Route::Post(id) => format!("/forum/{}", id),
            Route::CreatePost => "/forum/create".to_string(),
            Route::UserProfile(enrollment) => format!("/{}", enrollment),
            Route::TeacherProfile => "/teacher/profile".to_string(),
            Route::NotFound => "/404".to_string(),
        }
    }

    pub fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path
            .trim()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [] | ["dashboard"] => Route::Dashboard,
            ["login"] => Route::Login,
            ["forum"] => Route::Forum,
            ["forum", "create"] => Route::CreatePost,
            ["forum", id] => id.parse().map(Route::Post).unwrap_or(Route::NotFound),
            ["teacher", "profile"] => Route::TeacherProfile,
            ["404"] => Route::NotFound,
            [user] => Route::UserProfile(user.to_string()),
            _ => Route::NotFound,
        }
    }

    /// Whether the route may only be shown to a logged-in user.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login | Route::Forum | Route::NotFound)
    }
}

/// Where a freshly logged-in user lands.
pub fn landing_route(role: Role) -> Route {
    match role {
        Role::Student => Route::Dashboard,
        Role::Teacher => Route::TeacherProfile,
    }
}

/// Resolve the route that should actually be shown.
pub fn guard(route: Route, identity: Option<&Identity>) -> Route {
    match (route, identity) {
        (route, None) if route.requires_auth() => Route::Login,
        (Route::Login, Some(identity)) => landing_route(identity.role),
        (route, _) => route,
    }
}

//! Session lifecycle: the one authoritative login state of the process.
//!
//! - `SessionManager`: login, logout, restore and background token refresh
//! - `RecurringTimer`: cancellable fixed-period schedule used for refresh and polling
//!
//! Phases move `Uninitialized -> Restoring -> {Authenticated, Anonymous}`;
//! `Authenticated -> Anonymous` on logout or a failed refresh, and
//! `Anonymous -> Authenticated` on login.

pub mod manager;
pub mod timer;

#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use serde::Serialize;

use crate::auth::{Identity, TokenPair};
use crate::config::Config;
use crate::routes::Route;

pub use manager::SessionManager;
pub use timer::RecurringTimer;

/// Tunables for the session manager.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// How often the token pair is rotated while authenticated. Must be
    /// shorter than the access token's validity window.
    pub refresh_interval: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            refresh_interval: config.refresh_interval(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Uninitialized,
    Restoring,
    Authenticated,
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserRequested,
    /// The refresh endpoint rejected the session.
    Expired,
}

/// Transitions broadcast to collaborators (navigation, pollers, UI).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    LoggedIn { identity: Identity, landing: Route },
    Restored { identity: Identity },
    Refreshed { identity: Identity },
    LoggedOut { reason: LogoutReason, redirect: Route },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No refresh token held; nothing happened.
    NoSession,
    /// Another refresh was already in flight.
    Skipped,
    Refreshed,
    /// The session changed while the request was out; the response was dropped.
    Discarded,
    /// The refresh failed and the session was torn down.
    SessionEnded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored(Identity),
    Anonymous,
}

/// Point-in-time view of the session. `tokens` is present iff `identity` is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub tokens: Option<TokenPair>,
    pub identity: Option<Identity>,
}

impl SessionState {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_none() && self.identity.is_none()
    }
}

//! campusdesk-core - the LMS client library behind the campusdesk front ends.
//!
//! - `session`: the authoritative login state, with background token rotation
//! - `auth`: token pair, identity decoding, persistence, login errors
//! - `api`: REST client for courses, timetable, forum, notifications, profiles
//! - `notifications`: polling that follows the session
//! - `cache`: last-fetched data for instant display
//! - `routes`: screen routing and role-based guards

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod notifications;
pub mod routes;
pub mod session;
pub mod utils;
pub mod validation;

pub use api::{ApiClient, ApiError, BearerToken};
pub use auth::{AuthError, Credentials, Identity, Role, TokenPair};
pub use config::Config;
pub use session::{SessionEvent, SessionManager, SessionPhase, SessionSettings};

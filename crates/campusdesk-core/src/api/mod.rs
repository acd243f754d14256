//! REST API client module for the LMS backend.
//!
//! This module provides the `ApiClient` for fetching courses, timetables,
//! forum posts, notifications and profiles, and for the token endpoints
//! the session manager drives through `AuthBackend`.
//!
//! Requests are authenticated with the JWT access token held in a shared
//! `BearerToken` slot.

pub mod bearer;
pub mod client;
pub mod error;

pub use bearer::BearerToken;
pub use client::ApiClient;
pub use error::ApiError;

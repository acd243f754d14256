//! Local caching of the last-fetched LMS data.
//!
//! This module provides the `CacheManager` so the UI has something to show
//! before (or without) a network round trip. Data is cached in JSON format
//! and considered stale after 60 minutes.
//!
//! Cached data types include:
//! - Courses and announcements
//! - Forum posts
//! - Per-day timetables

pub mod manager;

pub use manager::{CacheAges, CacheManager, CachedData};

//! Utility functions for string formatting and manipulation.

pub mod format;

pub use format::{capitalize, format_clock, format_optional, initials, time_ago, truncate};

//! Data models for LMS records.
//!
//! - `Course`, `TimetableEntry`: what is taught and when
//! - `Post`, `PostDetail`, `Comment`: discussion forum
//! - `Notification`, `Announcement`: things the user should see
//! - `UserSummary`, `UserProfile`, `TeacherStats`: people

pub mod course;
pub mod forum;
pub mod notification;
pub mod user;

pub use course::{sort_timetable, Batch, ClassType, Course, TeacherRef, TimetableEntry, Weekday};
pub use forum::{Author, Comment, NewComment, NewPost, Post, PostDetail};
pub use notification::{unread_count, Announcement, Notification};
pub use user::{StudentProfile, TeacherStats, UserProfile, UserSummary};

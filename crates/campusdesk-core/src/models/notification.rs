//! Notifications and announcements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Course;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Older records use `message` instead of `content`.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_seen: bool,
    #[serde(default, alias = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub course: Option<Course>,
}

impl Notification {
    pub fn body(&self) -> &str {
        self.content
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("")
    }

    pub fn heading(&self) -> &str {
        self.title.as_deref().unwrap_or("Notification")
    }
}

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_seen).count()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_field_fallbacks() {
        let list: Vec<Notification> = serde_json::from_str(
            r#"[
                {"id": 1, "title": "Quiz", "content": "Quiz on Friday", "is_seen": false,
                 "created_at": "2024-03-01T10:00:00Z",
                 "course": {"id": 1, "name": "Data Structures", "code": "CS201"}},
                {"id": 2, "message": "Lab moved", "is_seen": true, "timestamp": "2024-03-02T08:00:00Z",
                 "course": null}
            ]"#,
        )
        .unwrap();

        assert_eq!(list[0].body(), "Quiz on Friday");
        assert_eq!(list[1].body(), "Lab moved");
        assert_eq!(list[1].heading(), "Notification");
        assert!(list[1].created_at.is_some());
        assert_eq!(unread_count(&list), 1);
    }
}

//! Discussion forum posts and comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;

/// Author field: expanded on reads, a bare id on some write responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    User(UserSummary),
    Id(i64),
}

impl Author {
    pub fn id(&self) -> i64 {
        match self {
            Author::User(user) => user.id,
            Author::Id(id) => *id,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Author::User(user) if !user.first_name.trim().is_empty() => user.first_name.clone(),
            Author::User(user) => user.enrollment_number.clone(),
            Author::Id(id) => format!("User #{}", id),
        }
    }

    pub fn enrollment_number(&self) -> Option<&str> {
        match self {
            Author::User(user) => Some(&user.enrollment_number),
            Author::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub date_posted: DateTime<Utc>,
    pub user: Author,
    #[serde(default, deserialize_with = "like_count")]
    pub likes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub date_posted: Option<DateTime<Utc>>,
    pub user: Author,
}

/// `forum/<id>`: the post with its comments, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    #[serde(rename = "comment_set", default)]
    pub comments: Vec<Comment>,
}

impl PostDetail {
    /// Insert a freshly created comment at the top, as the server orders them.
    pub fn push_comment(&mut self, comment: Comment) {
        self.comments.insert(0, comment);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub user: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewComment {
    pub text: String,
    pub user: i64,
}

/// `likes` arrives either as a count or as the list of liking user ids.
fn like_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Likes {
        Count(u32),
        Users(Vec<serde_json::Value>),
    }

    Ok(match Option::<Likes>::deserialize(deserializer)? {
        Some(Likes::Count(n)) => n,
        Some(Likes::Users(users)) => users.len() as u32,
        None => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str = r#"{
        "id": 5,
        "title": "Exam schedule",
        "text": "Does anyone know when the midterms start?",
        "date_posted": "2024-03-01T10:15:00Z",
        "user": {"id": 7, "enrollment_number": "S123", "first_name": "Asha", "last_name": "Rao"},
        "likes": [1, 2, 3],
        "comment_set": [
            {"id": 1, "text": "Next Monday", "date_posted": "2024-03-01T11:00:00Z",
             "user": {"id": 9, "enrollment_number": "T0001", "first_name": "Ravi", "last_name": "Kumar"}}
        ]
    }"#;

    #[test]
    fn test_post_detail_parses() {
        let detail: PostDetail = serde_json::from_str(DETAIL).unwrap();
        assert_eq!(detail.post.title, "Exam schedule");
        assert_eq!(detail.post.likes, 3);
        assert_eq!(detail.post.user.display_name(), "Asha");
        assert_eq!(detail.comments.len(), 1);
        assert_eq!(detail.comments[0].user.enrollment_number(), Some("T0001"));
    }

    #[test]
    fn test_comment_with_bare_user_id() {
        let comment: Comment = serde_json::from_str(r#"{"id": 2, "text": "Thanks", "user": 7}"#).unwrap();
        assert_eq!(comment.user.id(), 7);
        assert_eq!(comment.user.display_name(), "User #7");

        let mut detail: PostDetail = serde_json::from_str(DETAIL).unwrap();
        detail.push_comment(comment);
        assert_eq!(detail.comments[0].text, "Thanks");
    }

    #[test]
    fn test_new_post_body() {
        let body = serde_json::to_value(NewPost {
            title: "Hello".to_string(),
            text: "First post on the forum".to_string(),
            user: 7,
        })
        .unwrap();
        assert_eq!(body["user"], 7);
        assert_eq!(body["title"], "Hello");
    }
}

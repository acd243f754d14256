//! Authentication error types.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use super::token::TokenError;

/// Body of a rejected credential request.
///
/// The API reports either a general `detail` or per-field messages; each
/// field may arrive as a string or as a list of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginRejection {
    #[serde(default, deserialize_with = "string_or_list")]
    pub detail: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub enrollment_number: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub password: Option<String>,
    #[serde(skip)]
    pub raw: String,
}

impl LoginRejection {
    /// Parse a response body; bodies that are not the expected shape keep
    /// only the raw text.
    pub fn from_body(body: &str) -> Self {
        let mut rejection: LoginRejection = serde_json::from_str(body).unwrap_or_default();
        rejection.raw = body.trim().to_string();
        rejection
    }

    /// The message to show inline, in the order the login form checks them.
    pub fn primary_message(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.enrollment_number.clone())
            .or_else(|| self.password.clone())
            .unwrap_or_else(|| {
                if self.raw.is_empty() {
                    "Invalid enrollment number or password".to_string()
                } else {
                    self.raw.clone()
                }
            })
    }
}

impl std::fmt::Display for LoginRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.primary_message())
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        Some(StringOrList::One(s)) => Some(s),
        Some(StringOrList::Many(list)) if !list.is_empty() => Some(list.join(" ")),
        _ => None,
    })
}

#[derive(Error, Debug, Clone)]
pub enum AuthError {
    /// The credential endpoint rejected the request.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(LoginRejection),

    /// No response from the endpoint.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The endpoint answered with a server-side error.
    #[error("Server error: {0}")]
    Server(String),

    /// The endpoint answered with a token the client cannot decode.
    #[error("Malformed access token: {0}")]
    MalformedToken(#[from] TokenError),
}

impl AuthError {
    /// Message suitable for the login form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials(rejection) => rejection.primary_message(),
            AuthError::NetworkFailure(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            AuthError::Server(_) => "An error occurred. Please try again later.".to_string(),
            AuthError::MalformedToken(_) => {
                "The server returned an unreadable session token.".to_string()
            }
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

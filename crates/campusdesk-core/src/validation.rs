//! Client-side checks run before a form is submitted.

use thiserror::Error;

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;
pub const TEXT_MIN: usize = 10;
pub const TEXT_MAX: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    EnrollmentNumber,
    Password,
    Title,
    Text,
    Comment,
}

/// A failed check, with the message shown next to the field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_login(enrollment_number: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if enrollment_number.trim().is_empty() {
        errors.push(FieldError::new(Field::EnrollmentNumber, "Enrollment number is required"));
    }
    if password.is_empty() {
        errors.push(FieldError::new(Field::Password, "Password is required"));
    }
    errors
}

pub fn validate_post(title: &str, text: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let title_len = title.trim().chars().count();
    if title_len == 0 {
        errors.push(FieldError::new(Field::Title, "Title is required"));
    } else if title_len < TITLE_MIN {
        errors.push(FieldError::new(
            Field::Title,
            format!("Title must be at least {} characters", TITLE_MIN),
        ));
    } else if title_len > TITLE_MAX {
        errors.push(FieldError::new(
            Field::Title,
            format!("Title must be less than {} characters", TITLE_MAX),
        ));
    }

    let text_len = text.trim().chars().count();
    if text_len < TEXT_MIN {
        errors.push(FieldError::new(
            Field::Text,
            format!("Content must be at least {} characters", TEXT_MIN),
        ));
    } else if text_len > TEXT_MAX {
        errors.push(FieldError::new(
            Field::Text,
            format!("Content must be less than {} characters", TEXT_MAX),
        ));
    }

    errors
}

pub fn validate_comment(text: &str) -> Result<(), FieldError> {
    if text.trim().is_empty() {
        return Err(FieldError::new(Field::Comment, "Comment cannot be empty"));
    }
    Ok(())
}

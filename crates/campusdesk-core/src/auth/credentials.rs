use serde::Serialize;

/// Login form input, sent as-is to the credential endpoint.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub enrollment_number: String,
    pub password: String,
}

impl Credentials {
    pub fn new(enrollment_number: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            enrollment_number: enrollment_number.into().trim().to_string(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("enrollment_number", &self.enrollment_number)
            .field("password", &"<redacted>")
            .finish()
    }
}

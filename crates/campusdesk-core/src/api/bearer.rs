use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::{HeaderValue, InvalidHeaderValue};

/// The access token attached to outbound requests.
///
/// Cloning shares the slot, so every `ApiClient` built from the same slot sees
/// a token change (or removal) on its very next request.
#[derive(Clone, Default)]
pub struct BearerToken {
    slot: Arc<RwLock<Option<String>>>,
}

impl BearerToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, access: &str) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(access.to_string());
    }

    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn get(&self) -> Option<String> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_set(&self) -> bool {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// `Authorization` header value, or `None` when logged out.
    pub fn header_value(&self) -> Result<Option<HeaderValue>, InvalidHeaderValue> {
        match self.get() {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
                value.set_sensitive(true);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken").field("set", &self.is_set()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_slot() {
        let a = BearerToken::new();
        let b = a.clone();
        assert!(a.header_value().unwrap().is_none());

        b.set("abc");
        assert_eq!(a.get().as_deref(), Some("abc"));
        assert_eq!(a.header_value().unwrap().unwrap().to_str().unwrap(), "Bearer abc");

        a.clear();
        assert!(!b.is_set());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let token = BearerToken::new();
        token.set("bad\ntoken");
        assert!(token.header_value().is_err());
    }
}

//! Authentication primitives.
//!
//! This module provides:
//! - `TokenPair`, `Identity` and the `TokenDecoder` that derives one from the other
//! - `TokenStore` implementations for persisting the pair across restarts
//! - `AuthBackend`, the seam between the session manager and the token endpoints
//! - The login error taxonomy (`AuthError`, `LoginRejection`)

pub mod credentials;
pub mod error;
pub mod store;
pub mod token;

use async_trait::async_trait;

pub use credentials::Credentials;
pub use error::{AuthError, AuthResult, LoginRejection};
pub use store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore, STORAGE_KEY};
pub use token::{Claims, Identity, JwtDecoder, Role, TokenDecoder, TokenError, TokenPair};

/// Issues and rotates token pairs.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for a fresh pair.
    async fn obtain_tokens(&self, credentials: &Credentials) -> AuthResult<TokenPair>;

    /// Exchange a refresh token for a rotated pair.
    async fn refresh_tokens(&self, refresh: &str) -> AuthResult<TokenPair>;
}

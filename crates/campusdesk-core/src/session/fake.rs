//! Scriptable in-memory `AuthBackend` for session tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::auth::{AuthBackend, AuthError, AuthResult, Credentials, TokenPair};

pub(crate) struct FakeBackend {
    login: Mutex<AuthResult<TokenPair>>,
    refresh: Mutex<AuthResult<TokenPair>>,
    last_refresh_token: Mutex<Option<String>>,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// Refresh requests wait here for a permit.
    gate: Semaphore,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::with_permits(Semaphore::MAX_PERMITS)
    }

    /// Refresh requests block until `release` is called.
    pub fn gated() -> Self {
        Self::with_permits(0)
    }

    fn with_permits(permits: usize) -> Self {
        Self {
            login: Mutex::new(Err(AuthError::NetworkFailure("no login scripted".into()))),
            refresh: Mutex::new(Err(AuthError::NetworkFailure("no refresh scripted".into()))),
            last_refresh_token: Mutex::new(None),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            gate: Semaphore::new(permits),
        }
    }

    pub fn set_login(&self, result: AuthResult<TokenPair>) {
        *self.login.lock().unwrap() = result;
    }

    pub fn set_refresh(&self, result: AuthResult<TokenPair>) {
        *self.refresh.lock().unwrap() = result;
    }

    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_refreshes(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_refresh_token(&self) -> Option<String> {
        self.last_refresh_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn obtain_tokens(&self, _credentials: &Credentials) -> AuthResult<TokenPair> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login.lock().unwrap().clone()
    }

    async fn refresh_tokens(&self, refresh: &str) -> AuthResult<TokenPair> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_refresh_token.lock().unwrap() = Some(refresh.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let permit = self.gate.acquire().await;
        if let Ok(permit) = permit {
            permit.forget();
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.refresh.lock().unwrap().clone()
    }
}

/// Yield to the scheduler until `condition` holds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

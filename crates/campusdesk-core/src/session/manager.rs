//! Session manager with background token rotation.
//!
//! The manager owns the only copy of the live token pair. Every change to it
//! is mirrored to the persistent store and to the shared bearer slot used by
//! the API client before the state lock is released. Network calls never run
//! while that lock is held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{
    LogoutReason, RecurringTimer, RefreshOutcome, RestoreOutcome, SessionEvent, SessionPhase,
    SessionSettings, SessionState,
};
use crate::api::BearerToken;
use crate::auth::{
    AuthBackend, AuthError, AuthResult, Credentials, Identity, TokenDecoder, TokenPair, TokenStore,
};
use crate::routes::{landing_route, Route};

/// Capacity of the session event channel.
/// Events are rare (login, refresh every few minutes, logout); 16 leaves headroom
/// for a slow subscriber.
const EVENT_CHANNEL_CAPACITY: usize = 16;

struct ActiveSession {
    tokens: TokenPair,
    identity: Identity,
}

struct Inner {
    phase: SessionPhase,
    session: Option<ActiveSession>,
    /// Bumped on every login and teardown; a refresh started under an older
    /// generation must not touch the session.
    generation: u64,
    /// False for an optimistically restored session until a refresh resolves.
    confirmed: bool,
}

/// Clears the in-flight flag however the refresh future ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn TokenStore>,
    decoder: Arc<dyn TokenDecoder>,
    bearer: BearerToken,
    settings: SessionSettings,
    inner: Mutex<Inner>,
    refreshing: AtomicBool,
    timer: Mutex<RecurringTimer>,
    events: broadcast::Sender<SessionEvent>,
    this: Weak<SessionManager>,
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn TokenStore>,
        decoder: Arc<dyn TokenDecoder>,
        bearer: BearerToken,
        settings: SessionSettings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new_cyclic(|this| Self {
            backend,
            store,
            decoder,
            bearer,
            settings,
            inner: Mutex::new(Inner {
                phase: SessionPhase::Uninitialized,
                session: None,
                generation: 0,
                confirmed: false,
            }),
            refreshing: AtomicBool::new(false),
            timer: Mutex::new(RecurringTimer::new("token-refresh")),
            events,
            this: this.clone(),
        })
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Identity of the logged-in user. Never performs I/O.
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner().session.as_ref().map(|s| s.identity.clone())
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner().phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner().session.is_some()
    }

    /// Whether the server has accepted the current tokens since they were set.
    pub fn is_confirmed(&self) -> bool {
        let inner = self.inner();
        inner.session.is_some() && inner.confirmed
    }

    pub fn snapshot(&self) -> SessionState {
        let inner = self.inner();
        SessionState {
            tokens: inner.session.as_ref().map(|s| s.tokens.clone()),
            identity: inner.session.as_ref().map(|s| s.identity.clone()),
        }
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    pub fn refresh_timer_running(&self) -> bool {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner).is_running()
    }

    pub fn bearer(&self) -> BearerToken {
        self.bearer.clone()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Load the persisted pair, if any, without touching the network.
    ///
    /// Must complete before anything that depends on the identity is shown.
    pub fn restore_session(&self) -> RestoreOutcome {
        self.restore(true)
    }

    /// Restore without arming the refresh timer.
    ///
    /// For short-lived callers that exit before a rotated pair could be
    /// persisted. The refresh token is left untouched on the server.
    pub fn restore_session_without_refresh(&self) -> RestoreOutcome {
        self.restore(false)
    }

    fn restore(&self, schedule_refresh: bool) -> RestoreOutcome {
        {
            let mut inner = self.inner();
            if let Some(active) = inner.session.as_ref() {
                return RestoreOutcome::Restored(active.identity.clone());
            }
            inner.phase = SessionPhase::Restoring;
        }

        let tokens = match self.store.load() {
            Ok(Some(tokens)) => tokens,
            Ok(None) => {
                info!("No persisted session");
                self.inner().phase = SessionPhase::Anonymous;
                return RestoreOutcome::Anonymous;
            }
            Err(e) => {
                warn!(error = %e, "Persisted session unreadable, starting anonymous");
                self.discard_persisted();
                self.inner().phase = SessionPhase::Anonymous;
                return RestoreOutcome::Anonymous;
            }
        };

        let identity = match self.decoder.decode(&tokens.access) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Persisted access token undecodable, starting anonymous");
                self.discard_persisted();
                self.inner().phase = SessionPhase::Anonymous;
                return RestoreOutcome::Anonymous;
            }
        };

        // An access token that has already lapsed gets rotated on the first tick.
        let first_tick = if identity.is_expired_at(Utc::now()) {
            debug!("Restored access token already expired, refreshing immediately");
            Duration::ZERO
        } else {
            self.settings.refresh_interval
        };

        let first_tick = schedule_refresh.then_some(first_tick);
        self.commit(tokens, identity.clone(), false, None, first_tick);

        info!(
            enrollment = %identity.enrollment_number,
            role = identity.role.display_name(),
            "Session restored"
        );
        self.emit(SessionEvent::Restored {
            identity: identity.clone(),
        });
        RestoreOutcome::Restored(identity)
    }

    /// Exchange credentials for a session.
    ///
    /// Nothing is committed unless the endpoint answers with a decodable pair.
    pub async fn login(&self, credentials: &Credentials) -> AuthResult<Identity> {
        debug!(enrollment = %credentials.enrollment_number, "Attempting login");

        let tokens = match self.backend.obtain_tokens(credentials).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Login failed");
                return Err(e);
            }
        };

        let identity = self.decoder.decode(&tokens.access).map_err(|e| {
            warn!(error = %e, "Login returned an undecodable access token");
            AuthError::MalformedToken(e)
        })?;

        self.commit(
            tokens,
            identity.clone(),
            true,
            None,
            Some(self.settings.refresh_interval),
        );

        let landing = landing_route(identity.role);
        info!(
            enrollment = %identity.enrollment_number,
            role = identity.role.display_name(),
            landing = %landing.path(),
            "Login successful"
        );
        self.emit(SessionEvent::LoggedIn {
            identity: identity.clone(),
            landing,
        });
        Ok(identity)
    }

    /// End the session. Safe to call with no session.
    pub fn logout(&self) {
        self.teardown(LogoutReason::UserRequested, None);
    }

    /// Rotate the token pair.
    ///
    /// At most one refresh runs at a time; a call made while another is
    /// outstanding returns `Skipped`. Any failure ends the session.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        }
        let _in_flight = InFlight(&self.refreshing);

        let (refresh_token, generation) = {
            let inner = self.inner();
            match inner.session.as_ref() {
                Some(active) => (active.tokens.refresh.clone(), inner.generation),
                None => return RefreshOutcome::NoSession,
            }
        };

        debug!("Refreshing token pair");
        let result = self.backend.refresh_tokens(&refresh_token).await;

        if self.inner().generation != generation {
            debug!("Session changed during refresh, discarding response");
            return RefreshOutcome::Discarded;
        }

        let decoded = result.and_then(|tokens| {
            let identity = self.decoder.decode(&tokens.access)?;
            Ok((tokens, identity))
        });

        match decoded {
            Ok((tokens, identity)) => {
                if !self.commit(tokens, identity.clone(), true, Some(generation), None) {
                    debug!("Session changed while committing refresh, discarding response");
                    return RefreshOutcome::Discarded;
                }
                info!("Token pair refreshed");
                self.emit(SessionEvent::Refreshed { identity });
                RefreshOutcome::Refreshed
            }
            Err(e) => {
                if !self.teardown(LogoutReason::Expired, Some(generation)) {
                    return RefreshOutcome::Discarded;
                }
                warn!(error = %e, "Token refresh failed, session ended");
                RefreshOutcome::SessionEnded
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Install a new pair as the live session.
    ///
    /// With `expected` set, the write only happens if no login or teardown
    /// has occurred since that generation was read. The store, bearer and
    /// timer are updated under the state lock so a concurrent teardown
    /// cannot interleave with them. Lock order is state, then timer.
    fn commit(
        &self,
        tokens: TokenPair,
        identity: Identity,
        confirmed: bool,
        expected: Option<u64>,
        first_tick: Option<Duration>,
    ) -> bool {
        self.check_refresh_interval(&identity);

        let mut inner = self.inner();
        if let Some(generation) = expected {
            if inner.generation != generation {
                return false;
            }
        } else {
            inner.generation += 1;
        }

        if let Err(e) = self.store.save(&tokens) {
            warn!(error = %e, "Failed to persist session");
        }
        self.bearer.set(&tokens.access);

        if let Some(delay) = first_tick {
            self.start_refresh_timer(delay);
        }

        inner.session = Some(ActiveSession { tokens, identity });
        inner.phase = SessionPhase::Authenticated;
        inner.confirmed = confirmed;
        true
    }

    /// Drop the session everywhere it lives. With `expected` set, nothing
    /// happens unless the session is still the one of that generation.
    fn teardown(&self, reason: LogoutReason, expected: Option<u64>) -> bool {
        let had_session = {
            let mut inner = self.inner();
            if expected.is_some_and(|generation| generation != inner.generation) {
                return false;
            }
            inner.generation += 1;
            inner.phase = SessionPhase::Anonymous;
            inner.confirmed = false;
            self.bearer.clear();
            self.discard_persisted();
            self.timer.lock().unwrap_or_else(PoisonError::into_inner).stop();
            inner.session.take().is_some()
        };

        if had_session {
            info!(?reason, "Session ended");
        }
        self.emit(SessionEvent::LoggedOut {
            reason,
            redirect: Route::Login,
        });
        true
    }

    fn discard_persisted(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
    }

    fn start_refresh_timer(&self, first_tick: Duration) {
        let this = self.this.clone();
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        timer.start(self.settings.refresh_interval, first_tick, move || {
            let this = this.clone();
            async move {
                if let Some(manager) = this.upgrade() {
                    manager.refresh().await;
                }
            }
        });
    }

    fn check_refresh_interval(&self, identity: &Identity) {
        if let Some(lifetime) = identity.token_lifetime().and_then(|l| l.to_std().ok()) {
            if self.settings.refresh_interval >= lifetime {
                warn!(
                    refresh_secs = self.settings.refresh_interval.as_secs(),
                    token_lifetime_secs = lifetime.as_secs(),
                    "Refresh interval is not shorter than the access token lifetime"
                );
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("phase", &self.phase())
            .field("authenticated", &self.is_authenticated())
            .field("refreshing", &self.refresh_in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::test_tokens;
    use crate::auth::{JwtDecoder, LoginRejection, MemoryTokenStore, Role};
    use crate::session::fake::{wait_until, FakeBackend};

    const INTERVAL: Duration = Duration::from_secs(240);

    struct Harness {
        manager: Arc<SessionManager>,
        backend: Arc<FakeBackend>,
        store: Arc<MemoryTokenStore>,
        bearer: BearerToken,
    }

    fn harness_with(backend: FakeBackend, store: MemoryTokenStore) -> Harness {
        let backend = Arc::new(backend);
        let store = Arc::new(store);
        let bearer = BearerToken::new();
        let manager = SessionManager::new(
            backend.clone(),
            store.clone(),
            Arc::new(JwtDecoder),
            bearer.clone(),
            SessionSettings {
                refresh_interval: INTERVAL,
            },
        );
        Harness {
            manager,
            backend,
            store,
            bearer,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeBackend::new(), MemoryTokenStore::new())
    }

    fn student_pair(refresh: &str) -> TokenPair {
        TokenPair::new(test_tokens::student("S123", Some("CSE-2024")), refresh)
    }

    fn teacher_pair(refresh: &str) -> TokenPair {
        TokenPair::new(test_tokens::teacher("T0001"), refresh)
    }

    fn creds() -> Credentials {
        Credentials::new("S123", "correct-password")
    }

    #[tokio::test]
    async fn test_initial_state() {
        let h = harness();
        assert_eq!(h.manager.phase(), SessionPhase::Uninitialized);
        assert!(h.manager.current_identity().is_none());
        assert!(h.manager.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_login_student_commits_everything() {
        let h = harness();
        h.backend.set_login(Ok(student_pair("r1")));
        let mut events = h.manager.subscribe();

        let identity = h.manager.login(&creds()).await.unwrap();

        assert_eq!(identity.role, Role::Student);
        assert_eq!(h.manager.current_identity(), Some(identity.clone()));
        assert_eq!(h.manager.phase(), SessionPhase::Authenticated);
        assert!(h.manager.is_confirmed());
        assert!(h.manager.refresh_timer_running());
        assert_eq!(h.bearer.get(), Some(student_pair("r1").access));
        assert_eq!(h.store.load().unwrap(), Some(student_pair("r1")));

        match events.recv().await.unwrap() {
            SessionEvent::LoggedIn { identity: i, landing } => {
                assert_eq!(i, identity);
                assert_eq!(landing, Route::Dashboard);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_teacher_lands_elsewhere() {
        let h = harness();
        h.backend.set_login(Ok(teacher_pair("r1")));
        let mut events = h.manager.subscribe();

        let identity = h.manager.login(&creds()).await.unwrap();
        assert_eq!(identity.role, Role::Teacher);

        match events.recv().await.unwrap() {
            SessionEvent::LoggedIn { landing, .. } => assert_eq!(landing, Route::TeacherProfile),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_login_leaves_state_untouched() {
        let h = harness();
        h.backend.set_login(Ok(student_pair("r1")));
        h.manager.login(&creds()).await.unwrap();
        let before = h.manager.snapshot();

        h.backend.set_login(Err(AuthError::InvalidCredentials(LoginRejection::from_body(
            r#"{"detail": "No active account found with the given credentials"}"#,
        ))));
        let err = h.manager.login(&creds()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
        assert_eq!(h.manager.snapshot(), before);

        h.backend.set_login(Err(AuthError::NetworkFailure("refused".to_string())));
        let err = h.manager.login(&creds()).await.unwrap_err();
        assert!(matches!(err, AuthError::NetworkFailure(_)));
        assert_eq!(h.manager.snapshot(), before);
        assert_eq!(h.store.load().unwrap(), before.tokens);
    }

    #[tokio::test]
    async fn test_login_with_undecodable_token_commits_nothing() {
        let h = harness();
        h.backend.set_login(Ok(TokenPair::new("garbage", "r1")));

        let err = h.manager.login(&creds()).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
        assert!(h.manager.snapshot().is_empty());
        assert!(h.store.raw().is_none());
        assert!(!h.bearer.is_set());
    }

    #[tokio::test]
    async fn test_logout_is_total_and_idempotent() {
        let h = harness();
        h.manager.logout();
        assert!(h.manager.snapshot().is_empty());
        assert_eq!(h.manager.phase(), SessionPhase::Anonymous);

        h.backend.set_login(Ok(student_pair("r1")));
        h.manager.login(&creds()).await.unwrap();
        let mut events = h.manager.subscribe();

        h.manager.logout();
        assert!(h.manager.snapshot().is_empty());
        assert!(h.store.raw().is_none());
        assert!(!h.bearer.is_set());
        assert!(!h.manager.refresh_timer_running());
        match events.recv().await.unwrap() {
            SessionEvent::LoggedOut { reason, redirect } => {
                assert_eq!(reason, LogoutReason::UserRequested);
                assert_eq!(redirect, Route::Login);
            }
            other => panic!("unexpected event {:?}", other),
        }

        h.manager.logout();
        assert!(h.manager.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_restore_valid_pair_without_network() {
        let store = MemoryTokenStore::new();
        store.save(&student_pair("r1")).unwrap();
        let h = harness_with(FakeBackend::new(), store);

        let outcome = h.manager.restore_session();
        let expected = JwtDecoder.decode(&student_pair("r1").access).unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored(expected.clone()));
        assert_eq!(h.manager.phase(), SessionPhase::Authenticated);
        assert_eq!(h.manager.current_identity(), Some(expected));
        assert!(!h.manager.is_confirmed());
        assert!(h.bearer.is_set());
        assert_eq!(h.backend.login_calls(), 0);
        assert_eq!(h.backend.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_restore_empty_store() {
        let h = harness();
        assert_eq!(h.manager.restore_session(), RestoreOutcome::Anonymous);
        assert_eq!(h.manager.phase(), SessionPhase::Anonymous);
        assert!(!h.manager.refresh_timer_running());
        assert_eq!(h.backend.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_restore_malformed_is_anonymous() {
        let h = harness_with(FakeBackend::new(), MemoryTokenStore::with_raw("{broken"));
        assert_eq!(h.manager.restore_session(), RestoreOutcome::Anonymous);
        assert!(h.store.raw().is_none());

        let bad_token = serde_json::to_string(&TokenPair::new("not-a-jwt", "r")).unwrap();
        let h = harness_with(FakeBackend::new(), MemoryTokenStore::with_raw(&bad_token));
        assert_eq!(h.manager.restore_session(), RestoreOutcome::Anonymous);
        assert!(h.manager.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_refreshes_on_first_tick() {
        // The test token expired long ago, so the first tick is immediate.
        let store = MemoryTokenStore::new();
        store.save(&student_pair("r1")).unwrap();
        let h = harness_with(FakeBackend::new(), store);
        h.backend.set_refresh(Ok(student_pair("r2")));

        h.manager.restore_session();
        wait_until(|| h.backend.refresh_calls() == 1).await;
        wait_until(|| h.manager.is_confirmed()).await;
        assert_eq!(h.store.load().unwrap(), Some(student_pair("r2")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_without_refresh_never_calls_backend() {
        let store = MemoryTokenStore::new();
        store.save(&student_pair("r1")).unwrap();
        let h = harness_with(FakeBackend::new(), store);
        h.backend.set_refresh(Ok(student_pair("r2")));

        let outcome = h.manager.restore_session_without_refresh();
        assert!(matches!(outcome, RestoreOutcome::Restored(_)));
        assert_eq!(h.manager.phase(), SessionPhase::Authenticated);
        assert!(h.bearer.is_set());
        assert!(!h.manager.refresh_timer_running());

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(h.backend.refresh_calls(), 0);
        assert_eq!(h.store.load().unwrap(), Some(student_pair("r1")));
    }

    #[tokio::test]
    async fn test_refresh_without_session_is_noop() {
        let h = harness();
        assert_eq!(h.manager.refresh().await, RefreshOutcome::NoSession);
        assert_eq!(h.backend.refresh_calls(), 0);
        assert!(h.manager.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_rotates_pair() {
        let h = harness();
        h.backend.set_login(Ok(student_pair("r1")));
        h.manager.login(&creds()).await.unwrap();

        h.backend.set_refresh(Ok(teacher_pair("r2")));
        assert_eq!(h.manager.refresh().await, RefreshOutcome::Refreshed);

        assert_eq!(h.backend.last_refresh_token().as_deref(), Some("r1"));
        assert_eq!(h.manager.snapshot().tokens, Some(teacher_pair("r2")));
        assert_eq!(h.manager.current_identity().unwrap().role, Role::Teacher);
        assert_eq!(h.store.load().unwrap(), Some(teacher_pair("r2")));
        assert_eq!(h.bearer.get(), Some(teacher_pair("r2").access));
        assert_eq!(h.manager.phase(), SessionPhase::Authenticated);
    }

    #[tokio::test]
    async fn test_refresh_failure_ends_session() {
        let h = harness();
        h.backend.set_login(Ok(student_pair("r1")));
        h.manager.login(&creds()).await.unwrap();
        let mut events = h.manager.subscribe();

        h.backend.set_refresh(Err(AuthError::InvalidCredentials(LoginRejection::from_body(
            r#"{"detail": "Token is blacklisted"}"#,
        ))));
        assert_eq!(h.manager.refresh().await, RefreshOutcome::SessionEnded);

        assert!(h.manager.current_identity().is_none());
        assert!(!h.bearer.is_set());
        assert!(h.store.raw().is_none());
        assert!(!h.manager.refresh_timer_running());
        match events.recv().await.unwrap() {
            SessionEvent::LoggedOut { reason, .. } => assert_eq!(reason, LogoutReason::Expired),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_failure_matches_logout_end_state() {
        let failed = harness();
        failed.backend.set_login(Ok(student_pair("r1")));
        failed.manager.login(&creds()).await.unwrap();
        failed.backend.set_refresh(Err(AuthError::Server("boom".to_string())));
        failed.manager.refresh().await;

        let logged_out = harness();
        logged_out.backend.set_login(Ok(student_pair("r1")));
        logged_out.manager.login(&creds()).await.unwrap();
        logged_out.manager.logout();

        assert_eq!(failed.manager.snapshot(), logged_out.manager.snapshot());
        assert_eq!(failed.manager.phase(), logged_out.manager.phase());
        assert_eq!(failed.store.raw(), logged_out.store.raw());
        assert_eq!(failed.bearer.is_set(), logged_out.bearer.is_set());
    }

    #[tokio::test]
    async fn test_refresh_with_undecodable_token_ends_session() {
        let h = harness();
        h.backend.set_login(Ok(student_pair("r1")));
        h.manager.login(&creds()).await.unwrap();
        h.backend.set_refresh(Ok(TokenPair::new("x.y", "r2")));

        assert_eq!(h.manager.refresh().await, RefreshOutcome::SessionEnded);
        assert!(h.manager.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_skipped() {
        let h = harness_with(FakeBackend::gated(), MemoryTokenStore::new());
        h.backend.set_login(Ok(student_pair("r1")));
        h.manager.login(&creds()).await.unwrap();
        h.backend.set_refresh(Ok(student_pair("r2")));

        let manager = h.manager.clone();
        let first = tokio::spawn(async move { manager.refresh().await });
        wait_until(|| h.backend.refresh_calls() == 1).await;
        assert!(h.manager.refresh_in_flight());

        assert_eq!(h.manager.refresh().await, RefreshOutcome::Skipped);

        h.backend.release(1);
        assert_eq!(first.await.unwrap(), RefreshOutcome::Refreshed);
        assert_eq!(h.backend.refresh_calls(), 1);
        assert_eq!(h.backend.max_concurrent_refreshes(), 1);
        assert!(!h.manager.refresh_in_flight());
    }

    #[tokio::test]
    async fn test_logout_during_refresh_discards_response() {
        let h = harness_with(FakeBackend::gated(), MemoryTokenStore::new());
        h.backend.set_login(Ok(student_pair("r1")));
        h.manager.login(&creds()).await.unwrap();
        h.backend.set_refresh(Ok(student_pair("r2")));

        let manager = h.manager.clone();
        let pending = tokio::spawn(async move { manager.refresh().await });
        wait_until(|| h.backend.refresh_calls() == 1).await;

        h.manager.logout();
        h.backend.release(1);

        assert_eq!(pending.await.unwrap(), RefreshOutcome::Discarded);
        assert!(h.manager.snapshot().is_empty());
        assert!(h.store.raw().is_none());
        assert!(!h.bearer.is_set());
    }

    #[tokio::test]
    async fn test_relogin_during_refresh_discards_response() {
        let h = harness_with(FakeBackend::gated(), MemoryTokenStore::new());
        h.backend.set_login(Ok(student_pair("r1")));
        h.manager.login(&creds()).await.unwrap();
        h.backend.set_refresh(Err(AuthError::Server("late failure".to_string())));

        let manager = h.manager.clone();
        let pending = tokio::spawn(async move { manager.refresh().await });
        wait_until(|| h.backend.refresh_calls() == 1).await;

        h.manager.logout();
        h.backend.set_login(Ok(teacher_pair("t1")));
        h.manager.login(&creds()).await.unwrap();
        h.backend.release(1);

        // The stale failure must not end the new session.
        assert_eq!(pending.await.unwrap(), RefreshOutcome::Discarded);
        assert_eq!(h.manager.current_identity().unwrap().role, Role::Teacher);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_drives_refresh_only_while_authenticated() {
        let h = harness();
        h.backend.set_login(Ok(student_pair("r1")));
        h.backend.set_refresh(Ok(student_pair("r2")));
        h.manager.login(&creds()).await.unwrap();

        tokio::time::sleep(INTERVAL / 2).await;
        assert_eq!(h.backend.refresh_calls(), 0);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(h.backend.refresh_calls(), 1);

        h.manager.logout();
        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(h.backend.refresh_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_failure_tears_down() {
        let h = harness();
        h.backend.set_login(Ok(student_pair("r1")));
        h.backend.set_refresh(Err(AuthError::NetworkFailure("offline".to_string())));
        h.manager.login(&creds()).await.unwrap();

        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
        wait_until(|| !h.manager.is_authenticated()).await;
        assert!(!h.bearer.is_set());
        assert!(!h.manager.refresh_timer_running());
    }

    #[tokio::test]
    async fn test_login_logout_sequences_always_end_empty() {
        let h = harness();
        let pairs = [student_pair("a"), teacher_pair("b"), student_pair("c")];
        for (i, pair) in pairs.iter().enumerate() {
            h.backend.set_login(Ok(pair.clone()));
            for _ in 0..=i {
                h.manager.login(&creds()).await.unwrap();
            }
            let state = h.manager.snapshot();
            assert_eq!(state.tokens.is_some(), state.identity.is_some());
            h.manager.logout();
            assert!(h.manager.snapshot().is_empty());
        }
    }
}

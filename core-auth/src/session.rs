//! Session manager orchestrating login, refresh, and logout.
//!
//! The manager owns the current auth state: an in-memory mirror of the
//! persisted singleton session and user records. All mutations go through
//! the local store first; memory always reflects the last persisted write.

use crate::api::{AuthApi, RegistrationRequest};
use crate::error::Result;
use crate::invalidation::InvalidationHandler;
use crate::types::AuthTokens;
use async_trait::async_trait;
use bridge_traits::time::Clock;
use chrono::Duration;
use core_library::models::UserRecord;
use core_library::repositories::{SessionRepository, UserRepository};
use core_library::store::LocalStore;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Buffer before token expiration that triggers a refresh (5 minutes).
pub const TOKEN_REFRESH_BUFFER_SECS: i64 = 300;

/// Supplies access tokens to collaborators issuing remote calls.
///
/// The gateway depends on this seam rather than on the concrete manager,
/// which keeps it substitutable with fakes in tests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A valid access token, refreshing first when the current one is
    /// within the expiry buffer. `None` when no token can be produced.
    async fn current_token(&self) -> Option<String>;

    /// One refresh-token exchange. Returns `false` on any failure,
    /// leaving the existing tokens untouched.
    async fn refresh(&self) -> bool;
}

#[derive(Default)]
struct SessionState {
    tokens: Option<AuthTokens>,
    user: Option<UserRecord>,
}

/// Owns current auth/session state, token expiry evaluation, and refresh
/// orchestration.
pub struct SessionManager {
    api: AuthApi,
    store: Arc<LocalStore>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    invalidation: Arc<InvalidationHandler>,
    state: RwLock<SessionState>,
    /// Serializes refresh attempts so concurrent callers cannot race two
    /// token exchanges against the same refresh token.
    refresh_gate: Mutex<()>,
    debug_token: Option<String>,
}

impl SessionManager {
    pub fn new(
        api: AuthApi,
        store: Arc<LocalStore>,
        events: EventBus,
        clock: Arc<dyn Clock>,
        invalidation: Arc<InvalidationHandler>,
    ) -> Self {
        Self {
            api,
            store,
            events,
            clock,
            invalidation,
            state: RwLock::new(SessionState::default()),
            refresh_gate: Mutex::new(()),
            debug_token: None,
        }
    }

    /// Configure the static token returned while the stored user has the
    /// `skip_auth` debug flag set.
    pub fn with_debug_token(mut self, token: impl Into<String>) -> Self {
        self.debug_token = Some(token.into());
        self
    }

    /// Hydrate in-memory state from the persisted session and user rows.
    ///
    /// Called once at application start, before any collaborator asks for
    /// a token.
    pub async fn load(&self) -> Result<()> {
        let session = self.store.session().get().await?;
        let user = self.store.users().get().await?;

        let mut state = self.state.write().await;
        state.tokens = session.as_ref().and_then(AuthTokens::from_record);
        state.user = user;

        debug!(
            has_session = state.tokens.is_some(),
            has_user = state.user.is_some(),
            "Session state hydrated from store"
        );
        Ok(())
    }

    /// The current user, if signed in.
    pub async fn current_user(&self) -> Option<UserRecord> {
        self.state.read().await.user.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.read().await.user.is_some()
    }

    /// Expiry predicate: `now >= expires_at - 5min`. A missing session
    /// counts as expired.
    pub async fn is_token_expired(&self) -> bool {
        match &self.state.read().await.tokens {
            Some(tokens) => tokens.is_expired_at(self.clock.now(), TOKEN_REFRESH_BUFFER_SECS),
            None => true,
        }
    }

    /// Authenticate with email and password.
    ///
    /// On success the profile is fetched and user-then-session are
    /// persisted sequentially; each write replaces its singleton row in
    /// its own transaction, so an interruption leaves at worst a user
    /// without a session, which later reads treat as "signed out".
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserRecord> {
        info!("Signing in");

        match self.login_inner(email, password).await {
            Ok(user) => {
                let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SignedIn {
                    user_id: user.id.clone(),
                }));
                info!("Sign-in completed");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Sign-in failed");
                let _ = self.events.emit(CoreEvent::Auth(AuthEvent::AuthError {
                    message: e.to_string(),
                    recoverable: true,
                }));
                Err(e)
            }
        }
    }

    async fn login_inner(&self, email: &str, password: &str) -> Result<UserRecord> {
        let grant = self.api.login(email, password).await?;
        let expires_at = self.clock.now() + Duration::milliseconds(grant.expires_ms());
        let tokens = AuthTokens::new(grant.access_token, grant.refresh_token, expires_at);

        let user = self.api.me(&tokens.access_token).await?;

        self.store.users().replace(&user).await?;
        self.store.session().replace(&tokens.to_record()).await?;

        let mut state = self.state.write().await;
        state.tokens = Some(tokens);
        state.user = Some(user.clone());

        Ok(user)
    }

    /// Register a new account, then sign in with the same credentials.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: RegistrationRequest) -> Result<UserRecord> {
        self.api.register(&registration).await?;
        self.login(&registration.email, &registration.password).await
    }

    /// Request a password-reset mail.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        self.api.request_password_reset(email).await
    }

    /// Complete a password reset with the mailed token.
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<()> {
        self.api.reset_password(token, password).await
    }

    /// Exchange the refresh token for a new token pair.
    ///
    /// Never throws: any failure returns `false` and leaves the existing
    /// tokens untouched so the caller can fall back to re-login. A
    /// credential-rejection failure additionally runs the invalidation
    /// handler, which wipes all local data.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let _guard = self.refresh_gate.lock().await;

        let refresh_token = {
            let state = self.state.read().await;
            state.tokens.as_ref().map(|t| t.refresh_token.clone())
        };
        let Some(refresh_token) = refresh_token else {
            debug!("No refresh token available");
            return false;
        };

        info!("Refreshing access token");
        match self.api.refresh(&refresh_token).await {
            Ok(grant) => {
                let expires_at = self.clock.now() + Duration::milliseconds(grant.expires_ms());
                let tokens =
                    AuthTokens::new(grant.access_token, grant.refresh_token, expires_at);

                if let Err(e) = self.store.session().replace(&tokens.to_record()).await {
                    warn!(error = %e, "Failed to persist refreshed tokens");
                    return false;
                }

                let expires_at_ms = tokens.expires_at.timestamp_millis();
                self.state.write().await.tokens = Some(tokens);

                let _ = self.events.emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                    expires_at: expires_at_ms,
                }));
                info!("Token refreshed");
                true
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                if let Some(remote) = e.remote() {
                    if self.invalidation.inspect(remote).await {
                        let mut state = self.state.write().await;
                        state.tokens = None;
                        state.user = None;
                    }
                }
                false
            }
        }
    }

    /// Sign out: best-effort remote session termination followed by
    /// unconditional local session+user deletion.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let refresh_token = {
            let state = self.state.read().await;
            state.tokens.as_ref().map(|t| t.refresh_token.clone())
        };

        if let Some(refresh_token) = refresh_token {
            if let Err(e) = self.api.logout(&refresh_token).await {
                warn!(error = %e, "Remote logout failed, continuing with local logout");
            }
        }

        self.store.session().clear().await?;
        self.store.users().clear().await?;

        {
            let mut state = self.state.write().await;
            state.tokens = None;
            state.user = None;
        }

        let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SignedOut));
        info!("Sign-out completed");
        Ok(())
    }

    /// Toggle the debug auth bypass, creating a guest user when none is
    /// signed in.
    pub async fn set_skip_auth(&self, skip: bool) -> Result<()> {
        let current = self.state.read().await.user.clone();
        let user = match current {
            Some(mut user) => {
                user.skip_auth = skip;
                user
            }
            None => UserRecord {
                id: "guest".to_string(),
                email: "guest@local".to_string(),
                first_name: None,
                last_name: None,
                role: "guest".to_string(),
                activated: false,
                skip_auth: skip,
            },
        };

        self.store.users().replace(&user).await?;
        self.state.write().await.user = Some(user);
        Ok(())
    }
}

#[async_trait]
impl TokenSource for SessionManager {
    async fn current_token(&self) -> Option<String> {
        {
            let state = self.state.read().await;

            // Debug bypass: the configured static token stands in for a session
            if state.user.as_ref().is_some_and(|u| u.skip_auth) {
                return self.debug_token.clone();
            }

            let tokens = state.tokens.as_ref()?;
            if !tokens.is_expired_at(self.clock.now(), TOKEN_REFRESH_BUFFER_SECS) {
                return Some(tokens.access_token.clone());
            }
        }

        // Within the buffer or past expiry: exactly one refresh attempt
        if self.refresh().await {
            let state = self.state.read().await;
            state.tokens.as_ref().map(|t| t.access_token.clone())
        } else {
            None
        }
    }

    async fn refresh(&self) -> bool {
        SessionManager::refresh(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use bytes::Bytes;
    use chrono::{DateTime, Utc};
    use core_library::models::SessionRecord;
    use core_library::repositories::SongRepository;
    use core_runtime::events::LogoutReason;
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    /// Clock whose time only moves when the test says so.
    struct ManualClock {
        now: std::sync::Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: std::sync::Mutex::new(start),
            }
        }

        fn advance(&self, delta: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += delta;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn login_grant_body() -> &'static str {
        r#"{"data": {"access_token": "at1", "refresh_token": "rt1", "expires": 900000}}"#
    }

    fn refresh_grant_body() -> &'static str {
        r#"{"data": {"access_token": "at2", "refresh_token": "rt2", "expires": 900000}}"#
    }

    fn profile_body() -> &'static str {
        r#"{"data": {"id": "u1", "email": "anna@example.com", "first_name": "Anna", "role": "activated"}}"#
    }

    async fn build_manager(
        http: MockHttpClient,
        clock: Arc<ManualClock>,
    ) -> (Arc<SessionManager>, Arc<LocalStore>, EventBus) {
        let store = Arc::new(LocalStore::open_in_memory().await.unwrap());
        let events = EventBus::new(32);
        let http: Arc<dyn HttpClient> = Arc::new(http);
        let invalidation = Arc::new(InvalidationHandler::new(store.clone(), events.clone()));
        let api = AuthApi::new("https://api.example.com", http);
        let manager = Arc::new(SessionManager::new(
            api,
            store.clone(),
            events.clone(),
            clock,
            invalidation,
        ));
        (manager, store, events)
    }

    /// Mock that dispatches by URL path and counts refresh calls.
    fn scripted_http(refresh_calls: Arc<AtomicUsize>) -> MockHttpClient {
        let mut http = MockHttpClient::new();
        http.expect_execute().returning(move |req| {
            if req.url.ends_with("/auth/login") {
                Ok(json_response(200, login_grant_body()))
            } else if req.url.ends_with("/users/me?fields=id,email,first_name,last_name,role") {
                Ok(json_response(200, profile_body()))
            } else if req.url.ends_with("/auth/refresh") {
                refresh_calls.fetch_add(1, Ordering::SeqCst);
                Ok(json_response(200, refresh_grant_body()))
            } else if req.url.ends_with("/auth/logout") {
                Ok(json_response(204, ""))
            } else {
                panic!("unexpected request to {}", req.url);
            }
        });
        http
    }

    #[tokio::test]
    async fn test_login_persists_session_and_user() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let (manager, store, events) =
            build_manager(scripted_http(refresh_calls.clone()), clock).await;
        let mut rx = events.subscribe();

        let user = manager.login("anna@example.com", "pw").await.unwrap();
        assert_eq!(user.id, "u1");
        assert!(user.activated);

        // Session persisted with expires_at = now + 900000 ms
        let record = store.session().get().await.unwrap().unwrap();
        assert_eq!(record.access_token, "at1");
        assert_eq!(record.refresh_token, "rt1");
        assert_eq!(record.expires_at, start.timestamp_millis() + 900_000);

        // User persisted
        let stored_user = store.users().get().await.unwrap().unwrap();
        assert_eq!(stored_user.email, "anna@example.com");

        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SignedIn {
                user_id: "u1".to_string()
            })
        );
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fresh_token_needs_no_refresh() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let (manager, _store, _events) =
            build_manager(scripted_http(refresh_calls.clone()), clock).await;

        manager.login("anna@example.com", "pw").await.unwrap();

        let token = manager.current_token().await;
        assert_eq!(token.as_deref(), Some("at1"));
        assert_eq!(
            refresh_calls.load(Ordering::SeqCst),
            0,
            "A token outside the buffer must not trigger a refresh"
        );
    }

    #[tokio::test]
    async fn test_expiring_token_triggers_exactly_one_refresh() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let (manager, store, _events) =
            build_manager(scripted_http(refresh_calls.clone()), clock.clone()).await;

        manager.login("anna@example.com", "pw").await.unwrap();

        // Step the simulated clock past expires_at - 5min (15min ttl - 4min
        // leaves 4min of validity, inside the buffer)
        clock.advance(Duration::minutes(11));
        assert!(manager.is_token_expired().await);

        let token = manager.current_token().await;
        assert_eq!(token.as_deref(), Some("at2"));
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);

        // Old refresh token overwritten in the store
        let record = store.session().get().await.unwrap().unwrap();
        assert_eq!(record.refresh_token, "rt2");
        assert_eq!(
            record.expires_at,
            clock.now().timestamp_millis() + 900_000
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_returns_false_and_keeps_tokens() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut http = MockHttpClient::new();
        http.expect_execute().returning(|req| {
            if req.url.ends_with("/auth/refresh") {
                Ok(json_response(503, "service unavailable"))
            } else {
                panic!("unexpected request to {}", req.url);
            }
        });

        let (manager, store, _events) = build_manager(http, clock).await;

        // Seed a persisted session and hydrate
        store
            .session()
            .replace(&SessionRecord::new("at0".into(), "rt0".into(), 0))
            .await
            .unwrap();
        manager.load().await.unwrap();

        assert!(!manager.refresh().await);

        // Existing tokens untouched
        let record = store.session().get().await.unwrap().unwrap();
        assert_eq!(record.access_token, "at0");
        assert_eq!(record.refresh_token, "rt0");
    }

    #[tokio::test]
    async fn test_refresh_rejection_wipes_local_data() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut http = MockHttpClient::new();
        http.expect_execute().returning(|req| {
            if req.url.ends_with("/auth/refresh") {
                Ok(json_response(
                    401,
                    r#"{"errors": [{"extensions": {"code": "INVALID_CREDENTIALS"}}]}"#,
                ))
            } else {
                panic!("unexpected request to {}", req.url);
            }
        });

        let (manager, store, events) = build_manager(http, clock).await;
        let mut rx = events.subscribe();

        store
            .session()
            .replace(&SessionRecord::new("at0".into(), "rt0".into(), 0))
            .await
            .unwrap();
        manager.load().await.unwrap();

        assert!(!manager.refresh().await);

        // Store and memory both emptied
        assert!(store.session().get().await.unwrap().is_none());
        assert_eq!(store.songs().count().await.unwrap(), 0);
        assert!(manager.current_user().await.is_none());
        assert!(!manager.is_logged_in().await);

        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SessionInvalidated {
                reason: LogoutReason::AccountDeleted
            })
        );
    }

    #[tokio::test]
    async fn test_refresh_without_session_returns_false() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let http = MockHttpClient::new();
        let (manager, _store, _events) = build_manager(http, clock).await;

        assert!(!manager.refresh().await);
        assert!(manager.current_token().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_local_even_when_remote_fails() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let mut http = MockHttpClient::new();
        let calls = refresh_calls.clone();
        http.expect_execute().returning(move |req| {
            if req.url.ends_with("/auth/login") {
                Ok(json_response(200, login_grant_body()))
            } else if req.url.ends_with("/users/me?fields=id,email,first_name,last_name,role") {
                Ok(json_response(200, profile_body()))
            } else if req.url.ends_with("/auth/logout") {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BridgeError::OperationFailed("network down".to_string()))
            } else {
                panic!("unexpected request to {}", req.url);
            }
        });

        let (manager, store, events) = build_manager(http, clock).await;
        manager.login("anna@example.com", "pw").await.unwrap();
        let mut rx = events.subscribe();

        manager.logout().await.unwrap();

        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1, "remote logout attempted");
        assert!(store.session().get().await.unwrap().is_none());
        assert!(store.users().get().await.unwrap().is_none());
        assert!(!manager.is_logged_in().await);
        assert_eq!(rx.recv().await.unwrap(), CoreEvent::Auth(AuthEvent::SignedOut));
    }

    #[tokio::test]
    async fn test_load_hydrates_from_store() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let http = MockHttpClient::new();
        let (manager, store, _events) = build_manager(http, clock).await;

        let expires_at = (start + Duration::minutes(30)).timestamp_millis();
        store
            .session()
            .replace(&SessionRecord::new("at9".into(), "rt9".into(), expires_at))
            .await
            .unwrap();
        store
            .users()
            .replace(&UserRecord {
                id: "u9".to_string(),
                email: "u9@example.com".to_string(),
                first_name: None,
                last_name: None,
                role: "user".to_string(),
                activated: false,
                skip_auth: false,
            })
            .await
            .unwrap();

        manager.load().await.unwrap();

        assert!(manager.is_logged_in().await);
        assert!(!manager.is_token_expired().await);
        assert_eq!(manager.current_token().await.as_deref(), Some("at9"));
    }

    #[tokio::test]
    async fn test_skip_auth_returns_debug_token() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let http = MockHttpClient::new();

        let store = Arc::new(LocalStore::open_in_memory().await.unwrap());
        let events = EventBus::new(8);
        let invalidation = Arc::new(InvalidationHandler::new(store.clone(), events.clone()));
        let api = AuthApi::new("https://api.example.com", Arc::new(http) as Arc<dyn HttpClient>);
        let manager = SessionManager::new(api, store.clone(), events, clock, invalidation)
            .with_debug_token("static-debug-token");

        manager.set_skip_auth(true).await.unwrap();

        assert_eq!(
            manager.current_token().await.as_deref(),
            Some("static-debug-token")
        );

        // Guest user was persisted
        let user = store.users().get().await.unwrap().unwrap();
        assert_eq!(user.id, "guest");
        assert!(user.skip_auth);
    }
}

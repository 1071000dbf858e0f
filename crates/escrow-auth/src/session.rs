//! Session management with single-flight token refresh.
//!
//! `SessionManager` owns the identity cache and is the only writer of the
//! [`TokenStore`]. An internal FSM tracks the transient states (resuming,
//! logging in, refreshing, logging out) and drives the state callback.
//!
//! Access token and identity are always committed and cleared together under
//! the identity lock, and [`SessionManager::snapshot`] reads both under that
//! same lock, so observers never see one without the other.

use crate::error::detail_message;
use crate::session_fsm::{
    SessionChangedPayload, SessionMachine, SessionMachineInput, SessionState,
};
use crate::{ApiRequest, ClientError, ClientResult, Transport};
use escrow_storage::TokenStore;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(crate) const LOGIN_PATH: &str = "/auth/login/";
pub(crate) const REFRESH_PATH: &str = "/auth/refresh/";
pub(crate) const LOGOUT_PATH: &str = "/auth/logout/";
pub(crate) const CURRENT_USER_PATH: &str = "/users/me/";

/// Authenticated user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Identity {
    /// Full name when known, email otherwise.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

/// Freshly issued credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    #[serde(default)]
    user: Option<Identity>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Coarse session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Unresolved,
    Authenticated,
    Anonymous,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub user: Option<Identity>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub is_authenticated: bool,
    pub loading: bool,
}

impl SessionSnapshot {
    /// True if the identity holds any of `roles`.
    pub fn has_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        identity_has_role(self.user.as_ref(), roles)
    }

    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Unresolved
        } else if self.is_authenticated {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }
}

fn identity_has_role<S: AsRef<str>>(identity: Option<&Identity>, roles: &[S]) -> bool {
    identity.is_some_and(|user| roles.iter().any(|role| role.as_ref() == user.role))
}

/// Callback type for session state change notifications.
pub type SessionStateCallback = Box<dyn Fn(SessionChangedPayload) + Send + Sync>;

type RefreshFlight = Shared<BoxFuture<'static, Option<String>>>;

/// Which FSM path a refresh run is reported on.
#[derive(Debug, Clone, Copy)]
enum RefreshKind {
    /// Silent resume of a stored session.
    Resume,
    /// Renewal of a rejected access token.
    Renew,
    /// FSM is busy with another operation; run without transitions.
    Untracked,
}

struct SessionInner {
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenStore>,
    identity: RwLock<Option<Identity>>,
    fsm: Mutex<SessionMachine>,
    state_callback: Mutex<Option<SessionStateCallback>>,
    refresh_flight: Mutex<Option<RefreshFlight>>,
    /// Bumped whenever the session is replaced, refreshed or torn down. A
    /// refresh that finishes under a different epoch is discarded, and a failed
    /// login only clears the session it started from.
    epoch: AtomicU64,
    resolved: AtomicBool,
}

/// Session manager. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    /// Create a session manager. The session starts unresolved.
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<TokenStore>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                transport,
                tokens,
                identity: RwLock::new(None),
                fsm: Mutex::new(SessionMachine::new()),
                state_callback: Mutex::new(None),
                refresh_flight: Mutex::new(None),
                epoch: AtomicU64::new(0),
                resolved: AtomicBool::new(false),
            }),
        }
    }

    /// Set a callback to be notified of session state changes.
    pub fn set_state_callback(&self, callback: SessionStateCallback) {
        *self.inner.state_callback.lock() = Some(callback);
    }

    /// Get the current FSM state.
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let user = self.inner.identity.read();
        let access_token = self.inner.tokens.access_token();
        let user = user.clone();
        let is_authenticated = user.is_some() && access_token.is_some();
        SessionSnapshot {
            user,
            access_token,
            is_authenticated,
            loading: !self.inner.resolved.load(Ordering::SeqCst),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.identity.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated
    }

    /// True if the current identity holds any of `roles`. False without an identity.
    pub fn has_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        identity_has_role(self.inner.identity.read().as_ref(), roles)
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub(crate) fn tokens(&self) -> &Arc<TokenStore> {
        &self.inner.tokens
    }

    /// Resolve the session at startup.
    ///
    /// Without a stored refresh token the session becomes anonymous right
    /// away. Otherwise the refresh token is exchanged and the identity
    /// fetched. Returns whether the session ended up authenticated, which
    /// includes a login that overtook the resume.
    pub async fn resolve(&self) -> bool {
        if self.inner.resolved.load(Ordering::SeqCst) {
            return self.is_authenticated();
        }

        if self.inner.tokens.refresh_token().is_none() {
            info!("No stored session found on startup");
            if let Err(e) = self.inner.transition(&SessionMachineInput::NoStoredSession) {
                debug!(error = %e, "Skipping startup transition");
            }
            self.inner.resolved.store(true, Ordering::SeqCst);
            return false;
        }

        info!("Stored session found, resuming");
        self.refresh_session().await;
        self.is_authenticated()
    }

    /// Log in with email and password.
    ///
    /// Accepted in any state. Tokens and identity are only committed once both
    /// are known. On failure the session is left anonymous and the error is
    /// returned, unless another login or refresh replaced the session meanwhile.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Identity> {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        if let Err(e) = self.inner.transition(&SessionMachineInput::LoginAttempt) {
            debug!(error = %e, "Logging in without state tracking");
        }

        debug!(email = %email, "Attempting login");

        match self.inner.authenticate(email, password).await {
            Ok((tokens, identity)) => {
                self.inner.commit(&tokens, &identity);
                self.inner.resolved.store(true, Ordering::SeqCst);
                self.inner.settle(&SessionMachineInput::LoginSuccess);
                info!(user_id = identity.id, role = %identity.role, "Login successful");
                Ok(identity)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                let kept = !self.inner.drop_access_since(epoch);
                self.inner.resolved.store(true, Ordering::SeqCst);
                // A session established meanwhile survives the failed attempt.
                if kept && self.is_authenticated() {
                    debug!("Session changed during login, keeping it");
                    self.inner.settle(&SessionMachineInput::LoginSuccess);
                } else {
                    self.inner.settle(&SessionMachineInput::LoginFailed);
                }
                Err(e)
            }
        }
    }

    /// Log out.
    ///
    /// Local tokens and identity are always purged. Revoking the refresh token
    /// server-side is best effort; its failures are logged and never returned.
    pub async fn logout(&self) {
        self.inner.settle(&SessionMachineInput::LogoutRequested);

        let refresh = self.inner.tokens.refresh_token();
        let access = self.inner.tokens.access_token();
        self.inner.purge();

        if let Some(refresh) = refresh {
            let mut request = ApiRequest::post(LOGOUT_PATH).with_json(json!({ "refresh": refresh }));
            request.bearer = access;

            match self.inner.transport.send(request).await {
                Ok(response) if response.is_success() => {
                    debug!(status = response.status, "Refresh token revoked");
                }
                Ok(response) => {
                    warn!(status = response.status, "Server-side logout rejected");
                }
                Err(e) => {
                    warn!(error = %e, "Server-side logout failed");
                }
            }
        }

        self.inner.resolved.store(true, Ordering::SeqCst);
        self.inner.settle(&SessionMachineInput::LogoutComplete);

        info!("Logged out");
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Concurrent callers share one in-flight exchange and all receive its
    /// result. Returns `None` when there is no refresh token or the exchange
    /// fails; in both cases the session has been purged.
    pub async fn refresh_session(&self) -> Option<String> {
        let flight = {
            let mut slot = self.inner.refresh_flight.lock();
            match slot.as_ref() {
                Some(flight) => {
                    debug!("Joining in-flight session refresh");
                    flight.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let flight = async move {
                        let token = inner.run_refresh().await;
                        *inner.refresh_flight.lock() = None;
                        token
                    }
                    .boxed()
                    .shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }
}

impl SessionInner {
    fn state(&self) -> SessionState {
        SessionState::from(self.fsm.lock().state())
    }

    /// Transition the FSM and notify the callback if the state changed.
    ///
    /// Never call while holding the identity lock: the callback reads it.
    fn transition(&self, input: &SessionMachineInput) -> ClientResult<SessionState> {
        let mut fsm = self.fsm.lock();
        let old_state = SessionState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            ClientError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input, old_state
            ))
        })?;

        let new_state = SessionState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Session state transition"
            );
            self.notify_state_change(new_state);
        }

        Ok(new_state)
    }

    /// Apply a completion transition the FSM may no longer accept because a
    /// concurrent operation moved it on.
    fn settle(&self, input: &SessionMachineInput) {
        if let Err(e) = self.transition(input) {
            debug!(error = %e, "Skipping session transition");
        }
    }

    fn notify_state_change(&self, state: SessionState) {
        let callback = self.state_callback.lock();
        if let Some(callback) = callback.as_ref() {
            let identity = self.identity.read().clone();
            callback(SessionChangedPayload {
                state,
                user_id: identity.as_ref().map(|u| u.id.to_string()),
                email: identity.as_ref().map(|u| u.email.clone()),
                role: identity.map(|u| u.role),
            });
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> ClientResult<(TokenPair, Identity)> {
        let request = ApiRequest::post(LOGIN_PATH)
            .with_json(json!({ "email": email, "password": password }));
        let response = self.transport.send(request).await?;

        if matches!(response.status, 400 | 401) {
            return Err(ClientError::InvalidCredentials(detail_message(
                &response.body,
            )));
        }

        let data: LoginResponse = response.error_for_status()?.json()?;
        let identity = match data.user {
            Some(user) => user,
            None => self.fetch_identity(&data.access).await?,
        };

        Ok((
            TokenPair {
                access_token: data.access,
                refresh_token: data.refresh,
            },
            identity,
        ))
    }

    async fn fetch_identity(&self, access_token: &str) -> ClientResult<Identity> {
        debug!("Fetching current user");
        let request = ApiRequest::get(CURRENT_USER_PATH).with_bearer(access_token);
        self.transport.send(request).await?.error_for_status()?.json()
    }

    fn commit(&self, tokens: &TokenPair, identity: &Identity) {
        let mut current = self.identity.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .set_tokens(&tokens.access_token, &tokens.refresh_token);
        *current = Some(identity.clone());
    }

    /// Clear access token and identity, keep the stored refresh token.
    /// Does nothing if the session changed after `epoch`; returns whether it cleared.
    fn drop_access_since(&self, epoch: u64) -> bool {
        let mut current = self.identity.write();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return false;
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.tokens.set_access_token(None);
        *current = None;
        true
    }

    /// Clear everything, including the stored refresh token.
    fn purge(&self) {
        let mut current = self.identity.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.tokens.clear();
        *current = None;
    }

    async fn run_refresh(&self) -> Option<String> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let kind = self.begin_refresh();

        let outcome = match self.tokens.refresh_token() {
            Some(refresh) => self.exchange(refresh).await,
            None => {
                debug!("No refresh token available");
                Err(ClientError::Unauthorized(None))
            }
        };

        match outcome {
            Ok((data, identity)) => {
                let committed = {
                    let mut current = self.identity.write();
                    if self.epoch.load(Ordering::SeqCst) == epoch {
                        self.epoch.fetch_add(1, Ordering::SeqCst);
                        self.tokens.set_access_token(Some(data.access.clone()));
                        if let Some(refresh) = data.refresh {
                            self.tokens.set_refresh_token(Some(refresh));
                        }
                        if identity.is_some() {
                            *current = identity;
                        }
                        true
                    } else {
                        false
                    }
                };

                if committed {
                    self.finish_refresh(kind, true);
                    info!("Session refreshed");
                    Some(data.access)
                } else {
                    debug!("Session changed during refresh, discarding result");
                    self.finish_refresh(kind, false);
                    None
                }
            }
            Err(e) => {
                let purged = {
                    let mut current = self.identity.write();
                    if self.epoch.load(Ordering::SeqCst) == epoch {
                        self.epoch.fetch_add(1, Ordering::SeqCst);
                        self.tokens.clear();
                        *current = None;
                        true
                    } else {
                        false
                    }
                };
                if purged {
                    warn!(error = %e, "Session refresh failed, session cleared");
                }
                self.finish_refresh(kind, false);
                None
            }
        }
    }

    /// POST the refresh token; fetch the identity too when none is cached.
    async fn exchange(&self, refresh: String) -> ClientResult<(RefreshResponse, Option<Identity>)> {
        let request = ApiRequest::post(REFRESH_PATH).with_json(json!({ "refresh": refresh }));
        let data: RefreshResponse = self
            .transport
            .send(request)
            .await?
            .error_for_status()?
            .json()?;

        let needs_identity = self.identity.read().is_none();
        let identity = if needs_identity {
            Some(self.fetch_identity(&data.access).await?)
        } else {
            None
        };

        Ok((data, identity))
    }

    fn begin_refresh(&self) -> RefreshKind {
        let (input, kind) = match self.state() {
            SessionState::Unresolved | SessionState::Anonymous => {
                (SessionMachineInput::ResumeStarted, RefreshKind::Resume)
            }
            SessionState::Authenticated => (SessionMachineInput::TokenExpired, RefreshKind::Renew),
            _ => return RefreshKind::Untracked,
        };

        match self.transition(&input) {
            Ok(_) => kind,
            Err(e) => {
                debug!(error = %e, "Refreshing without state tracking");
                RefreshKind::Untracked
            }
        }
    }

    fn finish_refresh(&self, kind: RefreshKind, succeeded: bool) {
        let input = match (kind, succeeded) {
            (RefreshKind::Resume, true) => SessionMachineInput::Resumed,
            (RefreshKind::Resume, false) => SessionMachineInput::ResumeFailed,
            (RefreshKind::Renew, true) => SessionMachineInput::RefreshSuccess,
            (RefreshKind::Renew, false) => SessionMachineInput::RefreshFailed,
            (RefreshKind::Untracked, _) => {
                self.resolved.store(true, Ordering::SeqCst);
                return;
            }
        };

        self.resolved.store(true, Ordering::SeqCst);
        self.settle(&input);
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{broker_user, default_route, json_response, shared, ScriptedTransport};
    use crate::{ApiResponse, RequestBody};
    use escrow_storage::MemoryStorage;
    use serde_json::Value;
    use std::time::Duration;

    fn create_test_manager(transport: Arc<ScriptedTransport>) -> (SessionManager, Arc<TokenStore>) {
        let tokens = Arc::new(TokenStore::new(Box::new(MemoryStorage::new())));
        let manager = SessionManager::new(transport, Arc::clone(&tokens));
        (manager, tokens)
    }

    fn json_body(request: &ApiRequest) -> Value {
        match &request.body {
            RequestBody::Json(value) => value.clone(),
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[test]
    fn test_initial_snapshot_is_loading() {
        let (manager, _) = create_test_manager(shared(ScriptedTransport::new(default_route)));

        let snapshot = manager.snapshot();
        assert!(snapshot.loading);
        assert!(!snapshot.is_authenticated);
        assert_eq!(snapshot.phase(), SessionPhase::Unresolved);
        assert_eq!(manager.state(), SessionState::Unresolved);
    }

    #[tokio::test]
    async fn test_login_with_embedded_user() {
        let transport = shared(ScriptedTransport::new(default_route));
        let (manager, tokens) = create_test_manager(Arc::clone(&transport));

        let identity = manager.login("a@b.com", "x").await.unwrap();
        assert_eq!(identity.id, 1);
        assert_eq!(identity.role, "BROKER");

        let snapshot = manager.snapshot();
        assert!(snapshot.is_authenticated);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.access_token.as_deref(), Some("t1"));
        assert!(manager.has_role(&["BROKER"]));
        assert!(!manager.has_role(&["ADMIN"]));
        assert_eq!(manager.state(), SessionState::Authenticated);

        assert_eq!(tokens.refresh_token().as_deref(), Some("r1"));
        assert_eq!(transport.calls(CURRENT_USER_PATH), 0);
        assert_eq!(
            json_body(&transport.requests(LOGIN_PATH)[0]),
            json!({"email": "a@b.com", "password": "x"})
        );
    }

    #[tokio::test]
    async fn test_login_fetches_identity_when_missing() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            LOGIN_PATH => json_response(200, json!({"access": "t1", "refresh": "r1"})),
            _ => default_route(req),
        }));
        let (manager, _) = create_test_manager(Arc::clone(&transport));

        let identity = manager.login("a@b.com", "x").await.unwrap();
        assert_eq!(identity.email, "a@b.com");

        let me = transport.requests(CURRENT_USER_PATH);
        assert_eq!(me.len(), 1);
        assert_eq!(me[0].bearer.as_deref(), Some("t1"));
        assert!(manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_anonymous() {
        let (manager, tokens) = create_test_manager(shared(ScriptedTransport::new(default_route)));

        let err = manager.login("a@b.com", "wrong").await.unwrap_err();
        match err {
            ClientError::InvalidCredentials(message) => {
                assert!(message.contains("No active account"))
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let snapshot = manager.snapshot();
        assert!(snapshot.user.is_none());
        assert!(snapshot.access_token.is_none());
        assert!(!snapshot.is_authenticated);
        assert_eq!(tokens.refresh_token(), None);
        assert_eq!(manager.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_identity_fetch_failure_commits_nothing() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            LOGIN_PATH => json_response(200, json!({"access": "t1", "refresh": "r1"})),
            CURRENT_USER_PATH => json_response(500, json!({"detail": "boom"})),
            _ => default_route(req),
        }));
        let (manager, tokens) = create_test_manager(transport);

        let err = manager.login("a@b.com", "x").await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 500, .. }));

        let snapshot = manager.snapshot();
        assert!(snapshot.user.is_none());
        assert!(snapshot.access_token.is_none());
        assert_eq!(tokens.refresh_token(), None);
    }

    #[tokio::test]
    async fn test_resolve_without_stored_session() {
        let transport = shared(ScriptedTransport::new(default_route));
        let (manager, _) = create_test_manager(Arc::clone(&transport));

        assert!(!manager.resolve().await);

        let snapshot = manager.snapshot();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.phase(), SessionPhase::Anonymous);
        assert_eq!(manager.state(), SessionState::Anonymous);
        assert_eq!(transport.calls(REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_resolve_resumes_stored_session() {
        let transport = shared(ScriptedTransport::new(default_route));
        let (manager, tokens) = create_test_manager(Arc::clone(&transport));
        tokens.set_refresh_token(Some("r0".to_string()));

        assert!(manager.resolve().await);

        assert_eq!(
            json_body(&transport.requests(REFRESH_PATH)[0]),
            json!({"refresh": "r0"})
        );
        let me = transport.requests(CURRENT_USER_PATH);
        assert_eq!(me[0].bearer.as_deref(), Some("t2"));

        let snapshot = manager.snapshot();
        assert!(snapshot.is_authenticated);
        assert!(!snapshot.loading);
        assert_eq!(manager.state(), SessionState::Authenticated);
        assert_eq!(tokens.refresh_token().as_deref(), Some("r0"));
    }

    #[tokio::test]
    async fn test_resolve_with_rejected_refresh_token() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            REFRESH_PATH => json_response(401, json!({"detail": "Token is blacklisted"})),
            _ => default_route(req),
        }));
        let (manager, tokens) = create_test_manager(transport);
        tokens.set_refresh_token(Some("r0".to_string()));

        assert!(!manager.resolve().await);
        assert_eq!(tokens.refresh_token(), None);
        assert_eq!(manager.snapshot().phase(), SessionPhase::Anonymous);
    }

    #[tokio::test]
    async fn test_refresh_failure_purges_tokens() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            REFRESH_PATH => json_response(401, json!({"detail": "Token is invalid or expired"})),
            _ => default_route(req),
        }));
        let (manager, tokens) = create_test_manager(transport);
        manager.login("a@b.com", "x").await.unwrap();

        assert_eq!(manager.refresh_session().await, None);

        assert_eq!(tokens.access_token(), None);
        assert_eq!(tokens.refresh_token(), None);
        assert!(manager.identity().is_none());
        assert_eq!(manager.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_refresh_keeps_identity_and_stores_rotated_token() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            REFRESH_PATH => json_response(200, json!({"access": "t2", "refresh": "r2"})),
            _ => default_route(req),
        }));
        let (manager, tokens) = create_test_manager(Arc::clone(&transport));
        manager.login("a@b.com", "x").await.unwrap();

        assert_eq!(manager.refresh_session().await.as_deref(), Some("t2"));

        assert_eq!(tokens.access_token().as_deref(), Some("t2"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("r2"));
        assert_eq!(manager.identity().unwrap().role, "BROKER");
        assert_eq!(transport.calls(CURRENT_USER_PATH), 0);
        assert_eq!(manager.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_request() {
        let transport = shared(
            ScriptedTransport::new(default_route)
                .with_delay(REFRESH_PATH, Duration::from_millis(20)),
        );
        let (manager, _) = create_test_manager(Arc::clone(&transport));
        manager.login("a@b.com", "x").await.unwrap();

        let results =
            futures::future::join_all((0..5).map(|_| manager.refresh_session())).await;

        assert!(results.iter().all(|token| token.as_deref() == Some("t2")));
        assert_eq!(transport.calls(REFRESH_PATH), 1);

        // The slot is cleared once settled, so a later refresh issues a new call.
        manager.refresh_session().await;
        assert_eq!(transport.calls(REFRESH_PATH), 2);
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_clears_session() {
        let transport = shared(ScriptedTransport::new(default_route));
        let (manager, tokens) = create_test_manager(Arc::clone(&transport));
        manager.login("a@b.com", "x").await.unwrap();
        tokens.set_refresh_token(None);

        assert_eq!(manager.refresh_session().await, None);
        assert_eq!(transport.calls(REFRESH_PATH), 0);
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_revokes_and_clears() {
        let transport = shared(ScriptedTransport::new(default_route));
        let (manager, tokens) = create_test_manager(Arc::clone(&transport));
        manager.login("a@b.com", "x").await.unwrap();

        manager.logout().await;

        let revoke = transport.requests(LOGOUT_PATH);
        assert_eq!(revoke.len(), 1);
        assert_eq!(json_body(&revoke[0]), json!({"refresh": "r1"}));
        assert_eq!(revoke[0].bearer.as_deref(), Some("t1"));

        assert_eq!(tokens.access_token(), None);
        assert_eq!(tokens.refresh_token(), None);
        assert!(manager.identity().is_none());
        assert_eq!(manager.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_logout_when_logged_out_is_noop() {
        let transport = shared(ScriptedTransport::new(default_route));
        let (manager, _) = create_test_manager(Arc::clone(&transport));

        manager.logout().await;
        manager.logout().await;

        assert_eq!(transport.calls(LOGOUT_PATH), 0);
        assert_eq!(manager.state(), SessionState::Anonymous);
        assert!(!manager.snapshot().loading);
    }

    #[tokio::test]
    async fn test_logout_swallows_server_failures() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            LOGOUT_PATH => None,
            _ => default_route(req),
        }));
        let (manager, tokens) = create_test_manager(transport);
        manager.login("a@b.com", "x").await.unwrap();

        manager.logout().await;

        assert_eq!(tokens.refresh_token(), None);
        assert!(!manager.is_authenticated());
        assert_eq!(manager.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_logout_during_refresh_wins() {
        let transport = shared(
            ScriptedTransport::new(default_route)
                .with_delay(REFRESH_PATH, Duration::from_millis(30)),
        );
        let (manager, tokens) = create_test_manager(transport);
        manager.login("a@b.com", "x").await.unwrap();

        let (token, ()) = tokio::join!(manager.refresh_session(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            manager.logout().await;
        });

        assert_eq!(token, None);
        assert_eq!(tokens.access_token(), None);
        assert_eq!(tokens.refresh_token(), None);
        assert!(manager.identity().is_none());
        assert_eq!(manager.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_login_during_startup_resume() {
        let transport = shared(
            ScriptedTransport::new(default_route)
                .with_delay(REFRESH_PATH, Duration::from_millis(30)),
        );
        let (manager, tokens) = create_test_manager(Arc::clone(&transport));
        tokens.set_refresh_token(Some("r0".to_string()));

        let (resumed, login) = tokio::join!(manager.resolve(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            manager.login("a@b.com", "x").await
        });

        assert_eq!(login.unwrap().id, 1);
        assert!(resumed);
        assert_eq!(transport.calls(LOGIN_PATH), 1);
        // The older resume lands after the login and is discarded.
        assert_eq!(tokens.access_token().as_deref(), Some("t1"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("r1"));
        assert_eq!(manager.state(), SessionState::Authenticated);
        assert!(!manager.snapshot().loading);
    }

    #[tokio::test]
    async fn test_login_during_token_refresh() {
        let transport = shared(
            ScriptedTransport::new(default_route)
                .with_delay(REFRESH_PATH, Duration::from_millis(30)),
        );
        let (manager, tokens) = create_test_manager(Arc::clone(&transport));
        manager.login("a@b.com", "x").await.unwrap();

        let (token, login) = tokio::join!(manager.refresh_session(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            manager.login("a@b.com", "x").await
        });

        assert!(login.is_ok());
        assert_eq!(token, None);
        assert_eq!(transport.calls(LOGIN_PATH), 2);
        assert_eq!(tokens.access_token().as_deref(), Some("t1"));
        assert!(manager.is_authenticated());
        assert_eq!(manager.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_overlapping_logins_both_reach_the_backend() {
        let transport = shared(
            ScriptedTransport::new(default_route)
                .with_delay(LOGIN_PATH, Duration::from_millis(20)),
        );
        let (manager, _) = create_test_manager(Arc::clone(&transport));

        let (first, second) = tokio::join!(
            manager.login("a@b.com", "x"),
            manager.login("a@b.com", "x")
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(transport.calls(LOGIN_PATH), 2);
        assert!(manager.is_authenticated());
        assert_eq!(manager.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_failed_login_keeps_session_refreshed_meanwhile() {
        let transport = shared(
            ScriptedTransport::new(default_route)
                .with_delay(REFRESH_PATH, Duration::from_millis(10))
                .with_delay(LOGIN_PATH, Duration::from_millis(30)),
        );
        let (manager, tokens) = create_test_manager(Arc::clone(&transport));
        manager.login("a@b.com", "x").await.unwrap();

        let (token, login) = tokio::join!(
            manager.refresh_session(),
            manager.login("a@b.com", "wrong")
        );

        assert_eq!(token.as_deref(), Some("t2"));
        assert!(matches!(login, Err(ClientError::InvalidCredentials(_))));
        assert_eq!(tokens.access_token().as_deref(), Some("t2"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("r1"));
        assert!(manager.is_authenticated());
        assert_eq!(manager.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_state_callback_reports_transitions() {
        let (manager, _) = create_test_manager(shared(ScriptedTransport::new(default_route)));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.set_state_callback(Box::new(move |payload| sink.lock().push(payload)));

        manager.login("a@b.com", "x").await.unwrap();
        manager.logout().await;

        let seen = seen.lock();
        let states: Vec<_> = seen.iter().map(|p| p.state).collect();
        assert_eq!(
            states,
            vec![
                SessionState::LoggingIn,
                SessionState::Authenticated,
                SessionState::LoggingOut,
                SessionState::Anonymous,
            ]
        );
        assert_eq!(seen[1].user_id.as_deref(), Some("1"));
        assert_eq!(seen[1].role.as_deref(), Some("BROKER"));
        assert_eq!(seen[3].user_id, None);
    }

    #[test]
    fn test_has_role() {
        let (manager, _) = create_test_manager(shared(ScriptedTransport::new(default_route)));
        assert!(!manager.has_role(&["ADMIN"]));

        let broker: Identity = serde_json::from_value(broker_user()).unwrap();
        let admin = Identity {
            role: "ADMIN".to_string(),
            ..broker.clone()
        };

        assert!(!identity_has_role(Some(&broker), &["ADMIN"]));
        assert!(identity_has_role(Some(&admin), &["ADMIN"]));
        assert!(identity_has_role(Some(&broker), &["ADMIN", "BROKER"]));
        assert!(!identity_has_role::<&str>(Some(&admin), &[]));
    }

    #[test]
    fn test_identity_display_name() {
        let broker: Identity = serde_json::from_value(broker_user()).unwrap();
        assert_eq!(broker.display_name(), "Ada");

        let bare = Identity {
            first_name: None,
            ..broker
        };
        assert_eq!(bare.display_name(), "a@b.com");
    }

    #[test]
    fn test_snapshot_never_serializes_access_token() {
        let snapshot = SessionSnapshot {
            user: None,
            access_token: Some("t1".to_string()),
            is_authenticated: false,
            loading: false,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("t1"));
    }

    #[tokio::test]
    async fn test_network_failure_on_login_is_returned() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            LOGIN_PATH => None,
            _ => Some(ApiResponse::new(200, "{}")),
        }));
        let (manager, _) = create_test_manager(transport);

        let err = manager.login("a@b.com", "x").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(manager.state(), SessionState::Anonymous);
    }
}

//! Session lifecycle: `checking` at startup, then `anonymous` or `authenticated`.
//!
//! [`SessionHandle`] is the shared in-memory state. The gateway holds a clone
//! so a 401 from any endpoint can close the session; [`SessionStore`] owns the
//! operations that move it between phases. Only the token is persisted, through
//! the [`TokenStore`].

use std::sync::Arc;
use tokio::sync::watch;

use crate::api::client::{ApiError, Gateway};
use crate::api::models::User;
use crate::api::resources::AuthApi;
use crate::storage::StorageError;
use crate::storage::token::TokenStore;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Checking,
    Anonymous,
    Authenticated,
}

impl Session {
    fn checking(token: Option<String>) -> Self {
        Self {
            user: None,
            token,
            is_loading: true,
        }
    }

    fn anonymous() -> Self {
        Self {
            user: None,
            token: None,
            is_loading: false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Checking
        } else if self.user.is_some() && self.token.is_some() {
            Phase::Authenticated
        } else {
            Phase::Anonymous
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("not signed in")]
    NotAuthenticated,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("could not persist session: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<Session>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::checking(None));
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.tx.borrow().phase()
    }

    pub fn set_checking(&self, token: Option<String>) {
        self.tx.send_replace(Session::checking(token));
    }

    pub fn set_authenticated(&self, user: User, token: String) {
        log::info!("signed in as {}", user.email);
        self.tx.send_replace(Session {
            user: Some(user),
            token: Some(token),
            is_loading: false,
        });
    }

    pub fn set_anonymous(&self) {
        self.tx.send_replace(Session::anonymous());
    }

    /// Forced teardown after a 401. Subscribers treat the transition to
    /// anonymous as "go to the login screen".
    pub fn expire(&self) {
        let was = self.tx.send_replace(Session::anonymous());
        if was.phase() == Phase::Authenticated {
            log::info!("session expired; returning to login");
        }
    }

    /// Route guard: the signed-in user, or `NotAuthenticated`.
    pub fn require_user(&self) -> Result<User, SessionError> {
        let session = self.tx.borrow();
        match (&session.user, &session.token, session.is_loading) {
            (Some(user), Some(_), false) => Ok(user.clone()),
            _ => Err(SessionError::NotAuthenticated),
        }
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SessionStore {
    auth: AuthApi,
    tokens: Arc<dyn TokenStore>,
    handle: SessionHandle,
}

impl SessionStore {
    pub fn new(gateway: Arc<Gateway>, tokens: Arc<dyn TokenStore>, handle: SessionHandle) -> Self {
        Self {
            auth: AuthApi::new(gateway),
            tokens,
            handle,
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Signs in. The token reaches durable storage only when the backend accepts the credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, SessionError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }
        let resp = match self.auth.login(email.trim(), password).await {
            Ok(resp) => resp,
            Err(e) => {
                log::info!("login rejected for {}: {}", email.trim(), e);
                self.handle.set_anonymous();
                return Err(e.into());
            }
        };
        if let Err(e) = self.tokens.save(&resp.token) {
            self.handle.set_anonymous();
            return Err(e.into());
        }
        self.handle.set_authenticated(resp.user.clone(), resp.token);
        Ok(resp.user)
    }

    pub fn logout(&self) {
        self.tokens.clear();
        self.handle.set_anonymous();
        log::info!("signed out");
    }

    /// Validates the stored token, if any. The only path that purges a stale
    /// token at startup: any failure clears it.
    pub async fn check_auth(&self) -> Phase {
        let Some(token) = self.tokens.load() else {
            self.handle.set_anonymous();
            return Phase::Anonymous;
        };
        self.handle.set_checking(Some(token.clone()));
        match self.auth.me().await {
            Ok(user) => {
                self.handle.set_authenticated(user, token);
                Phase::Authenticated
            }
            Err(e) => {
                log::info!("stored session rejected: {}", e);
                self.tokens.clear();
                self.handle.set_anonymous();
                Phase::Anonymous
            }
        }
    }

    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), SessionError> {
        self.handle.require_user()?;
        if current.is_empty() || new.is_empty() {
            return Err(SessionError::MissingCredentials);
        }
        self.auth.change_password(current, new).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::token::MemoryTokenStore;
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    fn store(transport: Arc<ScriptedTransport>, tokens: Arc<MemoryTokenStore>) -> SessionStore {
        let handle = SessionHandle::new();
        let gateway = Arc::new(Gateway::new(transport, tokens.clone(), handle.clone()));
        SessionStore::new(gateway, tokens, handle)
    }

    fn user_json() -> serde_json::Value {
        json!({"_id": "u1", "email": "admin@site.uz", "name": "Admin"})
    }

    #[test]
    fn starts_in_checking_phase() {
        let handle = SessionHandle::new();
        assert_eq!(handle.phase(), Phase::Checking);
        assert!(handle.snapshot().is_loading);
        assert!(handle.require_user().is_err());
    }

    #[tokio::test]
    async fn check_auth_without_token_skips_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = store(transport.clone(), Arc::new(MemoryTokenStore::new()));

        assert_eq!(store.check_auth().await, Phase::Anonymous);
        let session = store.handle().snapshot();
        assert_eq!(session.user, None);
        assert!(!session.is_loading);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn check_auth_with_valid_token_authenticates() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(200, json!({"data": user_json()}));
        let tokens = Arc::new(MemoryTokenStore::with_token("good"));
        let store = store(transport, tokens.clone());

        assert_eq!(store.check_auth().await, Phase::Authenticated);
        let session = store.handle().snapshot();
        assert_eq!(session.token.as_deref(), Some("good"));
        assert_eq!(session.user.unwrap().email, "admin@site.uz");
    }

    #[tokio::test]
    async fn check_auth_with_rejected_token_purges_it() {
        for status in [401, 500] {
            let transport = Arc::new(ScriptedTransport::new());
            transport.respond(status, json!({"message": "nope"}));
            let tokens = Arc::new(MemoryTokenStore::with_token("stale"));
            let store = store(transport, tokens.clone());

            assert_eq!(store.check_auth().await, Phase::Anonymous);
            let session = store.handle().snapshot();
            assert_eq!(session.user, None);
            assert_eq!(session.token, None);
            assert_eq!(tokens.load(), None);
        }
    }

    #[tokio::test]
    async fn check_auth_with_network_failure_purges_token() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail_network("connection refused");
        let tokens = Arc::new(MemoryTokenStore::with_token("tok"));
        let store = store(transport, tokens.clone());
        assert_eq!(store.check_auth().await, Phase::Anonymous);
        assert_eq!(tokens.load(), None);
    }

    #[tokio::test]
    async fn login_success_persists_token() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(200, json!({"data": {"token": "fresh", "user": user_json()}}));
        let tokens = Arc::new(MemoryTokenStore::new());
        let store = store(transport.clone(), tokens.clone());

        let user = store.login("admin@site.uz", "secret").await.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(tokens.load().as_deref(), Some("fresh"));
        assert_eq!(store.handle().phase(), Phase::Authenticated);

        let body = match &transport.requests()[0].body {
            crate::api::transport::RequestBody::Json(v) => v.clone(),
            other => panic!("unexpected body {other:?}"),
        };
        assert_eq!(body, json!({"email": "admin@site.uz", "password": "secret"}));
    }

    #[tokio::test]
    async fn login_with_wrong_password_leaves_storage_untouched() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(400, json!({"message": "Invalid credentials"}));
        let tokens = Arc::new(MemoryTokenStore::new());
        let store = store(transport, tokens.clone());
        store.handle().set_anonymous();

        let err = store.login("admin@site.uz", "wrong").await.unwrap_err();
        assert!(matches!(err, SessionError::Api(ApiError::Status { status: 400, .. })));
        let session = store.handle().snapshot();
        assert_eq!(session.user, None);
        assert_eq!(session.token, None);
        assert_eq!(tokens.load(), None);
    }

    #[tokio::test]
    async fn login_requires_both_fields_without_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = store(transport.clone(), Arc::new(MemoryTokenStore::new()));
        assert!(matches!(
            store.login("  ", "x").await,
            Err(SessionError::MissingCredentials)
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let transport = Arc::new(ScriptedTransport::new());
        let tokens = Arc::new(MemoryTokenStore::with_token("tok"));
        let store = store(transport, tokens.clone());
        store.logout();
        assert_eq!(tokens.load(), None);
        assert_eq!(store.handle().phase(), Phase::Anonymous);
    }

    #[tokio::test]
    async fn change_password_is_gated_on_session() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = store(transport.clone(), Arc::new(MemoryTokenStore::new()));
        assert!(matches!(
            store.change_password("old", "new").await,
            Err(SessionError::NotAuthenticated)
        ));
        assert!(transport.requests().is_empty());
    }
}

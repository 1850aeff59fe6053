//! services/app/src/web/state.rs
//!
//! Defines the application's shared state and the per-browser sessions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use rainfall_core::domain::AuthProvider;
use rainfall_core::ports::{BlobStorage, IdentityService, RainfallStore};
use rainfall_core::state::AppState as ClientState;

/// How long a browser session stays valid.
pub const SESSION_TTL_DAYS: i64 = 30;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RainfallStore>,
    pub identity: Arc<dyn IdentityService>,
    pub storage: Arc<dyn BlobStorage>,
    pub config: Arc<Config>,
    pub sessions: Sessions,
}

//=========================================================================================
// Sessions (One Entry Per Signed-In Browser)
//=========================================================================================

/// One signed-in browser: the mirrored client state plus what sign-out needs
/// to revoke the credential with the provider.
#[derive(Clone)]
pub struct SessionEntry {
    pub app: ClientState,
    pub provider: AuthProvider,
    pub credential: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn new(app: ClientState, provider: AuthProvider, credential: String) -> Self {
        Self {
            app,
            provider,
            credential,
            expires_at: Utc::now() + Duration::days(SESSION_TTL_DAYS),
        }
    }
}

/// The in-memory session table, keyed by the cookie value.
///
/// This is the only shared mutable state in the service; everything durable
/// lives in the hosted database.
#[derive(Clone, Default)]
pub struct Sessions {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl Sessions {
    /// Stores a new session and returns its cookie value.
    pub async fn create(&self, entry: SessionEntry) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.inner
            .write()
            .await
            .insert(session_id.clone(), entry);
        session_id
    }

    /// Looks up a live session. Expired entries are dropped on access.
    pub async fn get(&self, session_id: &str) -> Option<SessionEntry> {
        let mut sessions = self.inner.write().await;
        let expired = sessions
            .get(session_id)
            .is_some_and(|entry| entry.expires_at <= Utc::now());
        if expired {
            sessions.remove(session_id);
            return None;
        }
        sessions.get(session_id).cloned()
    }

    /// Applies a state transition to a live session and returns the new
    /// client state.
    pub async fn update_app<F>(&self, session_id: &str, transition: F) -> Option<ClientState>
    where
        F: FnOnce(ClientState) -> ClientState,
    {
        let mut sessions = self.inner.write().await;
        let expired = sessions
            .get(session_id)
            .is_some_and(|entry| entry.expires_at <= Utc::now());
        if expired {
            sessions.remove(session_id);
            return None;
        }
        let entry = sessions.get_mut(session_id)?;
        entry.app = transition(entry.app.clone());
        Some(entry.app.clone())
    }

    /// Drops a session, returning its entry if it existed.
    pub async fn remove(&self, session_id: &str) -> Option<SessionEntry> {
        self.inner.write().await.remove(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rainfall_core::domain::{ExternalUser, User};
    use rainfall_core::state::{reduce, Action, Panel};

    fn entry() -> SessionEntry {
        let user = User::from_external(&ExternalUser {
            id: "u1".to_string(),
            username: None,
            email: None,
            phone: None,
        });
        let app = reduce(ClientState::default(), Action::SignedIn(user));
        SessionEntry::new(app, AuthProvider::Google, "tok".to_string())
    }

    #[tokio::test]
    async fn created_sessions_can_be_read_back() {
        let sessions = Sessions::default();
        let id = sessions.create(entry()).await;
        let stored = sessions.get(&id).await.unwrap();
        assert_eq!(stored.app.user.as_ref().unwrap().id, "u1");
    }

    #[tokio::test]
    async fn expired_sessions_disappear_on_access() {
        let sessions = Sessions::default();
        let mut expired = entry();
        expired.expires_at = Utc::now() - Duration::minutes(1);
        let id = sessions.create(expired).await;
        assert!(sessions.get(&id).await.is_none());
        // A second read hits the removed entry path.
        assert!(sessions.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn transitions_persist_in_the_session() {
        let sessions = Sessions::default();
        let id = sessions.create(entry()).await;

        let state = sessions
            .update_app(&id, |app| reduce(app, Action::RequestUpload))
            .await
            .unwrap();
        assert_eq!(state.panel, Panel::RegistrationForm);

        let stored = sessions.get(&id).await.unwrap();
        assert_eq!(stored.app.panel, Panel::RegistrationForm);
    }

    #[tokio::test]
    async fn removed_sessions_are_gone() {
        let sessions = Sessions::default();
        let id = sessions.create(entry()).await;
        assert!(sessions.remove(&id).await.is_some());
        assert!(sessions.get(&id).await.is_none());
    }
}

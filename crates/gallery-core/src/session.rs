//! Session store: the single source of truth for credentials.
//!
//! # Design
//! - Identity and token change together under one write lock, so no reader
//!   ever observes a user without a token or the reverse.
//! - Every mutation is persisted before the lock is released; persistence
//!   failures are logged and the in-memory state stays authoritative.
//! - Rehydration never fails: absent or unusable blobs yield the signed-out
//!   default.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::model::{Session, User};
use crate::storage::{
    KeyValueStore, MemoryStore, SESSION_KEY, decode_blob, load_logged, persist_logged,
};

/// On-disk session shape.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    is_authenticated: bool,
    #[serde(default)]
    signed_in_at: Option<DateTime<Utc>>,
}

impl PersistedSession {
    fn from_session(session: &Session) -> Self {
        Self {
            user: session.user.clone(),
            access_token: session.token.clone(),
            is_authenticated: session.is_authenticated(),
            signed_in_at: session.signed_in_at,
        }
    }

    /// Convert to a live session, rejecting anything that breaks the invariant.
    fn into_session(self) -> Result<Session, &'static str> {
        if !self.is_authenticated {
            return Ok(Session::default());
        }
        let user = self.user.ok_or("authenticated without user")?;
        if user.id.trim().is_empty() {
            return Err("empty user id");
        }
        let token = self
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or("authenticated without token")?;
        Ok(Session {
            user: Some(user),
            token: Some(token),
            signed_in_at: self.signed_in_at,
        })
    }
}

struct Inner {
    state: RwLock<Session>,
    storage: Arc<dyn KeyValueStore>,
}

/// Cheaply clonable handle to the shared session state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Rehydrate from `storage`, falling back to the signed-out default.
    #[must_use]
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let session = load_logged(storage.as_ref(), SESSION_KEY)
            .map_or_else(Session::default, |raw| rehydrate(&raw));
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(session),
                storage,
            }),
        }
    }

    /// Signed-out store backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryStore::new()))
    }

    /// Atomically replace identity and token and mark the session authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyUserId`] or [`SessionError::EmptyToken`]
    /// when the inputs would produce a partially set session; state is left
    /// unchanged in that case.
    pub fn set_session(&self, user: User, token: impl Into<String>) -> Result<(), SessionError> {
        let token = token.into();
        if user.id.trim().is_empty() {
            return Err(SessionError::EmptyUserId);
        }
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        let user_id = user.id.clone();
        self.mutate(|session| {
            *session = Session {
                user: Some(user),
                token: Some(token),
                signed_in_at: Some(Utc::now()),
            };
        });
        tracing::info!(user_id = %user_id, "session established");
        Ok(())
    }

    /// Replace the token only, leaving identity untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] when no session exists and
    /// [`SessionError::EmptyToken`] for an empty token.
    pub fn refresh_token(&self, token: impl Into<String>) -> Result<(), SessionError> {
        let token = token.into();
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        let mut state = self.write();
        if !state.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        state.token = Some(token);
        persist_logged(
            self.inner.storage.as_ref(),
            SESSION_KEY,
            &PersistedSession::from_session(&state),
        );
        drop(state);
        tracing::debug!("session token refreshed");
        Ok(())
    }

    /// Reset to the signed-out state. Returns whether a session was cleared.
    pub fn clear_session(&self) -> bool {
        let mut was_authenticated = false;
        self.mutate(|session| {
            was_authenticated = session.is_authenticated();
            *session = Session::default();
        });
        if was_authenticated {
            tracing::info!("session cleared");
        }
        was_authenticated
    }

    /// Bearer token, when authenticated.
    #[must_use]
    pub fn current_token(&self) -> Option<String> {
        self.read().token.clone()
    }

    /// Whether both identity and token are present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    /// Signed-in user, when authenticated.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.read().user.clone()
    }

    /// Consistent copy of the whole session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    fn mutate(&self, apply: impl FnOnce(&mut Session)) {
        let mut state = self.write();
        apply(&mut state);
        persist_logged(
            self.inner.storage.as_ref(),
            SESSION_KEY,
            &PersistedSession::from_session(&state),
        );
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        formatter
            .debug_struct("SessionStore")
            .field("authenticated", &state.is_authenticated())
            .field("user_id", &state.user.as_ref().map(|user| user.id.as_str()))
            .finish_non_exhaustive()
    }
}

fn rehydrate(raw: &str) -> Session {
    match decode_blob::<PersistedSession>(raw) {
        Ok(persisted) => persisted.into_session().unwrap_or_else(|reason| {
            tracing::warn!(reason, "persisted session violates invariants; starting signed out");
            Session::default()
        }),
        Err(defect) => {
            tracing::warn!(defect = %defect.describe(), "persisted session unreadable; starting signed out");
            Session::default()
        }
    }
}

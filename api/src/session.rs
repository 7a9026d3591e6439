//! Session state shared by the HTTP client, the auth service and the stores
//!
//! A [`SessionContext`] is created once, hydrated from durable storage, and
//! handed to the [`HttpClient`](crate::HttpClient). The interceptor reads the
//! token from it; login writes it; logout and any 401 clear it. Every change
//! is published on a `watch` channel so state stores can mirror it.

use crate::storage::SessionStorage;
use chrono::{DateTime, Utc};
use geotech_core::environment::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Server-assigned user identity
///
/// The API sends it either as a number or a string; it is always held and
/// persisted as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawUserId", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a user id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUserId {
    Number(i64),
    Text(String),
}

impl From<RawUserId> for UserId {
    fn from(raw: RawUserId) -> Self {
        match raw {
            RawUserId::Number(n) => Self(n.to_string()),
            RawUserId::Text(s) => Self(s),
        }
    }
}

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Token sent as `Authorization: Token <token>`
    pub token: String,
    /// Identity of the signed-in user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Name the user signed in with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// When the server stops honoring the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session for a token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: None,
            username: None,
            expires_at: None,
        }
    }

    /// Attach the user identity
    #[must_use]
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attach the user name
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Attach an expiry
    #[must_use]
    pub const fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the session has expired at `now`
    ///
    /// Sessions without an expiry never expire client-side.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// The single owner of the current session
///
/// Clones share state. Persistence failures are logged and never fail the
/// operation that caused them.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

struct Inner {
    key: String,
    storage: Arc<dyn SessionStorage>,
    current: watch::Sender<Option<Session>>,
}

impl SessionContext {
    /// Restore the session persisted under `key`
    ///
    /// A record that cannot be parsed, or whose expiry has passed according
    /// to `clock`, is removed from storage and the context starts signed out.
    pub fn hydrate(
        storage: Arc<dyn SessionStorage>,
        key: impl Into<String>,
        clock: &dyn Clock,
    ) -> Self {
        let key = key.into();
        let session = match storage.get(&key) {
            Ok(Some(record)) => match serde_json::from_str::<Session>(&record) {
                Ok(session) if session.is_expired(clock.now()) => {
                    tracing::info!(key = %key, "Persisted session expired, discarding");
                    discard(storage.as_ref(), &key);
                    None
                }
                Ok(session) => Some(session),
                Err(error) => {
                    tracing::warn!(
                        key = %key,
                        error = %error,
                        "Persisted session unreadable, discarding"
                    );
                    discard(storage.as_ref(), &key);
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "Session storage unavailable");
                None
            }
        };

        let (current, _) = watch::channel(session);
        Self {
            inner: Arc::new(Inner {
                key,
                storage,
                current,
            }),
        }
    }

    /// A signed-out context over fresh in-memory storage
    #[must_use]
    pub fn in_memory() -> Self {
        Self::hydrate(
            Arc::new(crate::storage::MemoryStorage::new()),
            crate::config::DEFAULT_SESSION_KEY,
            &geotech_core::environment::SystemClock,
        )
    }

    /// The current session, if signed in
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.inner.current.borrow().clone()
    }

    /// The current token, if signed in
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map(|session| session.token.clone())
    }

    /// Whether a session is held
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.current.borrow().is_some()
    }

    /// Hold and persist a new session
    ///
    /// The storage write runs on the blocking pool and has finished when
    /// this returns.
    pub async fn establish(&self, session: Session) {
        match serde_json::to_string(&session) {
            Ok(record) => self.persist(Some(record)).await,
            Err(error) => tracing::warn!(error = %error, "Failed to encode session"),
        }

        tracing::debug!(user_id = ?session.user_id, "Session established");
        self.inner.current.send_replace(Some(session));
    }

    /// Drop the session from memory and storage
    pub async fn invalidate(&self) {
        let previous = self.inner.current.send_replace(None);
        if previous.is_some() {
            tracing::debug!("Session invalidated");
        }
        self.persist(None).await;
    }

    async fn persist(&self, record: Option<String>) {
        let storage = Arc::clone(&self.inner.storage);
        let key = self.inner.key.clone();
        let written = tokio::task::spawn_blocking(move || match record {
            Some(record) => storage.set(&key, &record),
            None => storage.remove(&key),
        })
        .await;

        match written {
            Ok(Ok(())) => {}
            Ok(Err(error)) => tracing::warn!(error = %error, "Failed to persist session"),
            Err(error) => tracing::warn!(error = %error, "Session storage task failed"),
        }
    }

    /// Observe session changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.current.subscribe()
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("key", &self.inner.key)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

fn discard(storage: &dyn SessionStorage, key: &str) {
    if let Err(error) = storage.remove(key) {
        tracing::warn!(key = %key, error = %error, "Failed to remove persisted session");
    }
}

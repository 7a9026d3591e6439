//! Mock authentication provider for testing.

use super::Shared;
use crate::providers::AuthProvider;
use geotech_api::models::AuthResponse;
use geotech_api::{DomainError, Session, SessionContext, UserId};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::watch;

/// Token handed out on every successful login.
pub const MOCK_TOKEN: &str = "mock-token";

#[derive(Debug)]
struct Accounts {
    users: HashMap<String, (String, UserId)>,
    next_user: u64,
}

/// Mock auth provider.
///
/// Knows one account, `test@example.com` / `password123` (user `123`), and
/// keeps its session in a real [`SessionContext`] so persistence and
/// invalidation behave as in production.
#[derive(Debug, Clone)]
pub struct MockAuthProvider {
    accounts: Shared<Accounts>,
    session: SessionContext,
}

impl MockAuthProvider {
    /// Create a provider over a fresh in-memory session.
    #[must_use]
    pub fn new() -> Self {
        Self::with_session(SessionContext::in_memory())
    }

    /// Create a provider writing to `session`.
    #[must_use]
    pub fn with_session(session: SessionContext) -> Self {
        let mut users = HashMap::new();
        users.insert(
            "test@example.com".to_string(),
            ("password123".to_string(), UserId::new("123")),
        );

        Self {
            accounts: Shared::new(Accounts {
                users,
                next_user: 124,
            }),
            session,
        }
    }

    /// Session the provider writes to.
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: DomainError) {
        self.accounts.fail_next(error);
    }

    /// Number of login/register calls served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.accounts.calls()
    }
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for MockAuthProvider {
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthResponse, DomainError>> + Send {
        let result = self.accounts.call(|accounts| {
            match accounts.users.get(username) {
                Some((expected, user_id)) if expected == password => Ok(AuthResponse {
                    token: Some(MOCK_TOKEN.to_string()),
                    user_id: Some(user_id.clone()),
                    extra: serde_json::Map::new(),
                }),
                _ => Err(DomainError::new("Invalid credentials").with_status(400)),
            }
        });

        let session = result
            .as_ref()
            .ok()
            .and_then(|response| response.session(Some(username)));
        let context = self.session.clone();
        async move {
            if let Some(session) = session {
                context.establish(session).await;
            }
            result
        }
    }

    fn register(
        &self,
        email: &str,
        password: &str,
        _full_name: &str,
    ) -> impl Future<Output = Result<AuthResponse, DomainError>> + Send {
        let result = self.accounts.call(|accounts| {
            if accounts.users.contains_key(email) {
                let error = DomainError::new("User with this email already exists");
                return Err(error.with_status(400));
            }

            let user_id = UserId::new(accounts.next_user.to_string());
            accounts.next_user += 1;
            accounts
                .users
                .insert(email.to_string(), (password.to_string(), user_id.clone()));

            let mut extra = serde_json::Map::new();
            extra.insert("message".to_string(), "User created successfully".into());
            Ok(AuthResponse {
                token: None,
                user_id: Some(user_id),
                extra,
            })
        });

        std::future::ready(result)
    }

    fn logout(&self) -> impl Future<Output = ()> + Send {
        let context = self.session.clone();
        async move { context.invalidate().await }
    }

    fn current_session(&self) -> Option<Session> {
        self.session.current()
    }

    fn session_updates(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}

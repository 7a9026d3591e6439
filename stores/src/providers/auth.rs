//! Authentication provider trait.

use geotech_api::models::AuthResponse;
use geotech_api::{AuthService, DomainError, Session};
use std::future::Future;
use tokio::sync::watch;

/// Sign-in, registration and the session they produce.
pub trait AuthProvider: Send + Sync {
    /// Sign in; a successful response has already been persisted as the session.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the credentials are rejected or the call fails.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthResponse, DomainError>> + Send;

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the registration is rejected or the call fails.
    fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> impl Future<Output = Result<AuthResponse, DomainError>> + Send;

    /// Drop the current session.
    fn logout(&self) -> impl Future<Output = ()> + Send;

    /// The session held right now.
    fn current_session(&self) -> Option<Session>;

    /// Observe session changes, including invalidation after a 401.
    fn session_updates(&self) -> watch::Receiver<Option<Session>>;
}

impl AuthProvider for AuthService {
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthResponse, DomainError>> + Send {
        Self::login(self, username, password)
    }

    fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> impl Future<Output = Result<AuthResponse, DomainError>> + Send {
        Self::register(self, email, password, full_name)
    }

    fn logout(&self) -> impl Future<Output = ()> + Send {
        Self::logout(self)
    }

    fn current_session(&self) -> Option<Session> {
        Self::current_session(self)
    }

    fn session_updates(&self) -> watch::Receiver<Option<Session>> {
        Self::session_updates(self)
    }
}

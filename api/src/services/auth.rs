//! Authentication endpoints

use super::Normalize;
use crate::client::HttpClient;
use crate::error::DomainError;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};
use crate::session::Session;

/// Login, registration and session access
#[derive(Debug, Clone)]
pub struct AuthService {
    client: HttpClient,
}

impl AuthService {
    /// Create the service
    #[must_use]
    pub const fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Ask the server to set the CSRF cookie
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_csrf_token(&self) -> Result<(), DomainError> {
        self.client
            .get_json::<serde_json::Value>("/csrf/")
            .await
            .normalize("Failed to fetch CSRF token")
            .map(|_| ())
    }

    /// Sign in
    ///
    /// Bootstraps the CSRF cookie first. A response carrying a token is
    /// persisted as the current session.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the CSRF bootstrap or the login fails.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, DomainError> {
        self.fetch_csrf_token().await?;

        let response: AuthResponse = self
            .client
            .post_json("/login/", &LoginRequest { username, password })
            .await
            .normalize("Login failed")?;

        self.remember(&response, username).await;
        Ok(response)
    }

    /// Create an account
    ///
    /// Bootstraps the CSRF cookie first. If the server signs the new user in
    /// right away, the session is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the CSRF bootstrap or the registration fails.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthResponse, DomainError> {
        self.fetch_csrf_token().await?;

        let response: AuthResponse = self
            .client
            .post_json(
                "/register/",
                &RegisterRequest {
                    email,
                    password,
                    full_name,
                },
            )
            .await
            .normalize("Registration failed")?;

        self.remember(&response, email).await;
        Ok(response)
    }

    /// Drop the current session
    pub async fn logout(&self) {
        self.client.session().invalidate().await;
    }

    /// The current session, if signed in
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.client.session().current()
    }

    /// Whether a session is held
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.client.session().is_authenticated()
    }

    /// Observe session changes, including invalidation after a 401
    #[must_use]
    pub fn session_updates(&self) -> tokio::sync::watch::Receiver<Option<Session>> {
        self.client.session().subscribe()
    }

    async fn remember(&self, response: &AuthResponse, username: &str) {
        if let Some(session) = response.session(Some(username)) {
            self.client.session().establish(session).await;
        }
    }
}

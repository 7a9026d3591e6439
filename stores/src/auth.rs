//! Authentication store
//!
//! Mirrors the session held by the API client and runs login, registration
//! and logout. The mirror follows the client's [`SessionContext`] through a
//! watch channel, so a 401 observed by any other store signs this one out
//! too.
//!
//! [`SessionContext`]: geotech_api::SessionContext

use crate::error::Result;
use crate::providers::AuthProvider;
use crate::request::{RequestId, Terminal, await_outcome};
use geotech_api::models::AuthResponse;
use geotech_api::{DomainError, Navigator, Route, Session, UserId};
use geotech_core::effect::Effect;
use geotech_core::reducer::Reducer;
use geotech_core::{SmallVec, smallvec};
use geotech_runtime::Store;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::task::AbortHandle;

/// State of the authentication store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// The signed-in session, if any
    pub session: Option<Session>,
    /// A request is in flight
    pub loading: bool,
    /// Message of the last failed request
    pub error: Option<String>,
}

impl AuthState {
    /// Whether a session is held
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Identity of the signed-in user
    #[must_use]
    pub fn current_user(&self) -> Option<&UserId> {
        self.session.as_ref().and_then(|s| s.user_id.as_ref())
    }
}

/// Login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login name
    pub username: String,
    /// Password
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account details for registration
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    /// E-mail address
    pub email: String,
    /// Password
    pub password: String,
    /// Display name
    pub full_name: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Actions of the authentication store
#[derive(Debug, Clone)]
pub enum AuthAction {
    /// Sign in
    Login {
        /// Correlation id
        request: RequestId,
        /// Credentials to sign in with
        credentials: Credentials,
    },
    /// Create an account
    Register {
        /// Correlation id
        request: RequestId,
        /// Account details
        registration: Registration,
    },
    /// Sign out
    Logout,
    /// The client's session changed (login elsewhere, logout, 401)
    SessionChanged {
        /// The new session
        session: Option<Session>,
    },
    /// Login succeeded
    LoggedIn {
        /// Correlation id
        request: RequestId,
        /// Server response
        response: AuthResponse,
        /// Session the client now holds
        session: Option<Session>,
    },
    /// Registration succeeded
    Registered {
        /// Correlation id
        request: RequestId,
        /// Server response
        response: AuthResponse,
        /// Session the client now holds
        session: Option<Session>,
    },
    /// A request failed
    RequestFailed {
        /// Correlation id
        request: RequestId,
        /// Normalized failure
        error: DomainError,
    },
}

/// Dependencies of the authentication store
#[derive(Clone)]
pub struct AuthEnvironment<P> {
    /// Authentication provider
    pub auth: P,
    /// Receives the workspace route after login
    pub navigator: Arc<dyn Navigator>,
}

impl<P> AuthEnvironment<P> {
    /// Create an environment
    pub fn new(auth: P, navigator: Arc<dyn Navigator>) -> Self {
        Self { auth, navigator }
    }
}

/// Reducer of the authentication store
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthReducer<P> {
    _provider: PhantomData<fn() -> P>,
}

impl<P> AuthReducer<P> {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _provider: PhantomData,
        }
    }
}

impl<P> Reducer for AuthReducer<P>
where
    P: AuthProvider + Clone + 'static,
{
    type State = AuthState;
    type Action = AuthAction;
    type Environment = AuthEnvironment<P>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AuthAction::Login {
                request,
                credentials,
            } => {
                state.loading = true;
                state.error = None;

                let auth = env.auth.clone();
                let navigator = Arc::clone(&env.navigator);
                smallvec![Effect::task(async move {
                    match auth.login(&credentials.username, &credentials.password).await {
                        Ok(response) => {
                            if let Some(user_id) = response.user_id.clone() {
                                navigator.navigate(Route::Workspace { user_id });
                            }
                            AuthAction::LoggedIn {
                                request,
                                response,
                                session: auth.current_session(),
                            }
                        }
                        Err(error) => AuthAction::RequestFailed { request, error },
                    }
                })]
            }

            AuthAction::Register {
                request,
                registration,
            } => {
                state.loading = true;
                state.error = None;

                let auth = env.auth.clone();
                smallvec![Effect::task(async move {
                    match auth
                        .register(
                            &registration.email,
                            &registration.password,
                            &registration.full_name,
                        )
                        .await
                    {
                        Ok(response) => AuthAction::Registered {
                            request,
                            response,
                            session: auth.current_session(),
                        },
                        Err(error) => AuthAction::RequestFailed { request, error },
                    }
                })]
            }

            AuthAction::Logout => {
                state.session = None;
                state.error = None;

                let auth = env.auth.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    auth.logout().await;
                    None
                }))]
            }

            AuthAction::SessionChanged { session } => {
                if state.session.is_some() && session.is_none() {
                    tracing::info!("Session ended");
                }
                state.session = session;
                smallvec![Effect::None]
            }

            AuthAction::LoggedIn { session, .. } | AuthAction::Registered { session, .. } => {
                state.loading = false;
                if session.is_some() {
                    state.session = session;
                }
                smallvec![Effect::None]
            }

            AuthAction::RequestFailed { error, .. } => {
                tracing::warn!(error = %error, "Authentication request failed");
                state.loading = false;
                state.error = Some(error.message);
                smallvec![Effect::None]
            }
        }
    }
}

impl Terminal for AuthAction {
    fn completes(&self) -> Option<RequestId> {
        match self {
            Self::LoggedIn { request, .. }
            | Self::Registered { request, .. }
            | Self::RequestFailed { request, .. } => Some(*request),
            _ => None,
        }
    }

    fn into_outcome(self) -> std::result::Result<Self, DomainError> {
        match self {
            Self::RequestFailed { error, .. } => Err(error),
            other => Ok(other),
        }
    }
}

/// Store type behind [`AuthStore`]
pub type AuthRuntime<P> = Store<AuthState, AuthAction, AuthEnvironment<P>, AuthReducer<P>>;

/// Aborts the session forwarding task when the last store handle drops.
#[derive(Debug)]
struct SessionWatcher(AbortHandle);

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Authentication store
///
/// Must be created inside a tokio runtime: construction spawns the task that
/// follows the client's session.
pub struct AuthStore<P>
where
    P: AuthProvider + Clone + 'static,
{
    store: AuthRuntime<P>,
    _watcher: Arc<SessionWatcher>,
}

impl<P> Clone for AuthStore<P>
where
    P: AuthProvider + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _watcher: Arc::clone(&self._watcher),
        }
    }
}

impl<P> AuthStore<P>
where
    P: AuthProvider + Clone + 'static,
{
    /// Create the store, starting from the provider's current session
    ///
    /// Spawns the task that mirrors session changes into the store, so this
    /// must be called from within a tokio runtime.
    #[must_use]
    pub fn new(env: AuthEnvironment<P>) -> Self {
        let state = AuthState {
            session: env.auth.current_session(),
            ..AuthState::default()
        };
        let mut updates = env.auth.session_updates();
        let store = Store::new(state, AuthReducer::new(), env).with_name("auth");

        let forward = store.clone();
        let task = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let session = updates.borrow_and_update().clone();
                if forward
                    .send(AuthAction::SessionChanged { session })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        Self {
            store,
            _watcher: Arc::new(SessionWatcher(task.abort_handle())),
        }
    }

    /// Sign in and navigate to the user's workspace
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<AuthResponse> {
        let request = RequestId::next();
        let action = AuthAction::Login {
            request,
            credentials: Credentials {
                username: username.into(),
                password: password.into(),
            },
        };

        await_outcome(&self.store, action, request, |a| match a {
            AuthAction::LoggedIn { response, .. } => Some(response),
            _ => None,
        })
        .await
    }

    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn register(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Result<AuthResponse> {
        let request = RequestId::next();
        let action = AuthAction::Register {
            request,
            registration: Registration {
                email: email.into(),
                password: password.into(),
                full_name: full_name.into(),
            },
        };

        await_outcome(&self.store, action, request, |a| match a {
            AuthAction::Registered { response, .. } => Some(response),
            _ => None,
        })
        .await
    }

    /// Sign out, clearing the persisted session
    ///
    /// # Errors
    ///
    /// Returns an error if the store is shutting down.
    pub async fn logout(&self) -> Result<()> {
        let mut handle = self.store.send(AuthAction::Logout).await?;
        handle.wait().await;
        Ok(())
    }

    /// Whether a session is held
    pub async fn is_authenticated(&self) -> bool {
        self.store.state(AuthState::is_authenticated).await
    }

    /// Identity of the signed-in user
    pub async fn current_user(&self) -> Option<UserId> {
        self.store.state(|s| s.current_user().cloned()).await
    }

    /// Snapshot of the state
    pub async fn snapshot(&self) -> AuthState {
        self.store.state(Clone::clone).await
    }

    /// The underlying store
    #[must_use]
    pub const fn runtime(&self) -> &AuthRuntime<P> {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockAuthProvider;
    use geotech_api::RecordingNavigator;
    use geotech_testing::{ReducerTest, assertions};

    fn env() -> (AuthEnvironment<MockAuthProvider>, RecordingNavigator) {
        let navigator = RecordingNavigator::new();
        (
            AuthEnvironment::new(MockAuthProvider::new(), Arc::new(navigator.clone())),
            navigator,
        )
    }

    fn credentials(password: &str) -> Credentials {
        Credentials {
            username: "test@example.com".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_login_starts_loading() {
        let (env, _) = env();
        ReducerTest::new(AuthReducer::new())
            .with_env(env)
            .given_state(AuthState {
                error: Some("old".to_string()),
                ..AuthState::default()
            })
            .when_action(AuthAction::Login {
                request: RequestId::next(),
                credentials: credentials("password123"),
            })
            .then_state(|state| {
                assert!(state.loading);
                assert_eq!(state.error, None);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_failure_sets_error_and_stops_loading() {
        let (env, _) = env();
        ReducerTest::new(AuthReducer::new())
            .with_env(env)
            .given_state(AuthState {
                loading: true,
                ..AuthState::default()
            })
            .when_action(AuthAction::RequestFailed {
                request: RequestId::next(),
                error: DomainError::new("Invalid credentials"),
            })
            .then_state(|state| {
                assert!(!state.loading);
                assert_eq!(state.error.as_deref(), Some("Invalid credentials"));
                assert!(!state.is_authenticated());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_session_changed_mirrors_session() {
        let (env, _) = env();
        let session = Session::new("t").with_user_id(UserId::new("5"));
        ReducerTest::new(AuthReducer::new())
            .with_env(env)
            .given_state(AuthState::default())
            .when_action(AuthAction::SessionChanged {
                session: Some(session),
            })
            .then_state(|state| {
                assert_eq!(state.current_user(), Some(&UserId::new("5")));
            })
            .run();
    }

    #[test]
    fn test_session_invalidation_clears_mirror() {
        let (env, _) = env();
        ReducerTest::new(AuthReducer::new())
            .with_env(env)
            .given_state(AuthState {
                session: Some(Session::new("t")),
                ..AuthState::default()
            })
            .when_action(AuthAction::SessionChanged { session: None })
            .then_state(|state| assert!(!state.is_authenticated()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", credentials("password123"));
        assert!(!debug.contains("password123"));
        assert!(debug.contains("test@example.com"));
    }

    #[test]
    fn test_login_effect_navigates_to_workspace() {
        let (env, navigator) = env();
        let request = RequestId::next();

        ReducerTest::new(AuthReducer::new())
            .with_env(env)
            .given_state(AuthState::default())
            .when_action(AuthAction::Login {
                request,
                credentials: credentials("password123"),
            })
            .with_feedback()
            .then_state(|state| {
                assert!(!state.loading);
                assert!(state.is_authenticated());
            })
            .then_actions(move |actions| {
                assert!(matches!(
                    actions,
                    [AuthAction::LoggedIn { request: r, session: Some(_), .. }] if *r == request
                ));
            })
            .run();

        assert_eq!(
            navigator.last(),
            Some(Route::Workspace {
                user_id: UserId::new("123")
            })
        );
    }
}

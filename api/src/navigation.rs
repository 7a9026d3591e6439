//! Navigation requests raised by the client

use crate::session::UserId;
use std::sync::{Arc, Mutex};

/// A place the application can be sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The login entry point
    Login,
    /// A signed-in user's workspace
    Workspace {
        /// Owner of the workspace
        user_id: UserId,
    },
}

impl Route {
    /// Application path of the route
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Login => "/login".to_string(),
            Self::Workspace { user_id } => format!("/geotechnical/{user_id}"),
        }
    }
}

/// Receives navigation requests
///
/// Called from the HTTP client after a 401 and from the auth store after a
/// successful login.
pub trait Navigator: Send + Sync {
    /// Move the application to `route`
    fn navigate(&self, route: Route);
}

/// Navigator that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(path = %route.path(), "Navigation requested");
    }
}

/// Navigator that remembers every route it was sent to
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<Route>>>,
}

impl RecordingNavigator {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All routes navigated to, oldest first
    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        self.routes
            .lock()
            .map(|routes| routes.clone())
            .unwrap_or_default()
    }

    /// The most recent route
    #[must_use]
    pub fn last(&self) -> Option<Route> {
        self.routes
            .lock()
            .ok()
            .and_then(|routes| routes.last().cloned())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Login.path(), "/login");
        assert_eq!(
            Route::Workspace {
                user_id: UserId::new("123")
            }
            .path(),
            "/geotechnical/123"
        );
    }

    #[test]
    fn test_recording_navigator() {
        let navigator = RecordingNavigator::new();
        assert_eq!(navigator.last(), None);

        navigator.navigate(Route::Login);
        navigator.clone().navigate(Route::Workspace {
            user_id: UserId::new("9"),
        });

        assert_eq!(navigator.routes().len(), 2);
        assert_eq!(
            navigator.last(),
            Some(Route::Workspace {
                user_id: UserId::new("9")
            })
        );
    }
}

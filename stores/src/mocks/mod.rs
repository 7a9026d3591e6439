//! Mock provider implementations for testing.
//!
//! In-memory stand-ins for the remote API. Each mock can be told to fail its
//! next call and counts the calls it served.

pub mod auth;
pub mod cpt;
pub mod model;
pub mod projects;
pub mod soil;

pub use auth::MockAuthProvider;
pub use cpt::MockCptProvider;
pub use model::MockModelProvider;
pub use projects::MockProjectProvider;
pub use soil::MockSoilLayerProvider;

use chrono::{DateTime, Utc};
use geotech_api::DomainError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// State shared between clones of a mock, plus failure injection.
#[derive(Debug)]
struct Shared<T> {
    state: Arc<Mutex<T>>,
    failure: Arc<Mutex<Option<DomainError>>>,
    calls: Arc<AtomicUsize>,
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            failure: Arc::clone(&self.failure),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Shared<T> {
    fn new(state: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            failure: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn fail_next(&self, error: DomainError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(error);
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Serve one call: an armed failure wins, otherwise `f` runs on the state.
    fn call<R>(&self, f: impl FnOnce(&mut T) -> Result<R, DomainError>) -> Result<R, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let armed = self
            .failure
            .lock()
            .map_err(|_| poisoned())?
            .take();
        if let Some(error) = armed {
            return Err(error);
        }

        let mut state = self.state.lock().map_err(|_| poisoned())?;
        f(&mut state)
    }
}

fn poisoned() -> DomainError {
    DomainError::new("Mock lock poisoned")
}

fn not_found() -> DomainError {
    DomainError::new("Not found.").with_status(404)
}

/// Deterministic timestamp: 2025-01-01 plus `tick` minutes.
fn timestamp(tick: i64) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089) + chrono::Duration::minutes(tick)
}

//! Correlation ids for store requests

use crate::error::Result;
use geotech_api::DomainError;
use geotech_core::reducer::Reducer;
use geotech_runtime::Store;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

/// Identifies one dispatched request and the action that answers it
///
/// Every remote action carries one so a caller waiting on a result picks up
/// its own answer even when requests overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// A fresh id, unique within the process
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_REQUEST.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// An action type whose results answer a [`RequestId`]
pub trait Terminal: Sized {
    /// The request this action completes, if it is a result
    fn completes(&self) -> Option<RequestId>;

    /// Split a failure result off from a success
    ///
    /// # Errors
    ///
    /// Returns the carried [`DomainError`] when the action reports a failure.
    fn into_outcome(self) -> std::result::Result<Self, DomainError>;
}

/// Send `action` and wait for the result answering `request`
///
/// A failure result becomes [`StoreActionError::Domain`]; a success result is
/// handed to `success`, whose `None` keeps waiting.
///
/// [`StoreActionError::Domain`]: crate::error::StoreActionError::Domain
pub(crate) async fn await_outcome<S, A, E, R, T, F>(
    store: &Store<S, A, E, R>,
    action: A,
    request: RequestId,
    mut success: F,
) -> Result<T>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Terminal + Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: FnMut(A) -> Option<T> + Send + 'static,
    T: Send + 'static,
{
    let outcome = store
        .send_and_wait_map(action, move |a| {
            if a.completes() != Some(request) {
                return None;
            }
            match a.into_outcome() {
                Ok(done) => success(done).map(Ok),
                Err(error) => Some(Err(error)),
            }
        })
        .await?;
    Ok(outcome?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let first = RequestId::next();
        let second = RequestId::next();
        assert_ne!(first, second);
        assert!(second > first);
        assert!(first.to_string().starts_with("req-"));
    }
}

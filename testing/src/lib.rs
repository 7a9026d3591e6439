//! # Geotech Testing
//!
//! Testing utilities for the geotech client stores.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given/When/Then builder for reducer transitions
//! - [`assertions`]: effect assertions
//! - [`resolve_effects`]: drive the futures a reducer returned and collect
//!   the actions they produce, without a Store
//! - [`FixedClock`] / [`test_clock`]: deterministic time
//!
//! ## Example
//!
//! ```ignore
//! use geotech_testing::{ReducerTest, assertions};
//!
//! ReducerTest::new(ProjectReducer::new())
//!     .with_env(env)
//!     .given_state(ProjectState::default())
//!     .when_action(ProjectAction::FetchProjects { request })
//!     .then_state(|state| assert!(state.loading))
//!     .then_effects(assertions::assert_has_future_effect)
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use geotech_core::effect::Effect;
use geotech_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// ```
    /// use geotech_testing::mocks::FixedClock;
    /// use geotech_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

pub use mocks::{FixedClock, test_clock};

/// Execute effects outside a Store and collect the actions they produce.
///
/// Parallel effects are resolved in declaration order. Actions are not fed
/// back into any reducer; tests apply them explicitly when they need to.
pub async fn resolve_effects<A, I>(effects: I) -> Vec<A>
where
    I: IntoIterator<Item = Effect<A>>,
    A: Send + 'static,
{
    let mut actions = Vec::new();
    for effect in effects {
        resolve_into(effect, &mut actions).await;
    }
    actions
}

fn resolve_into<'a, A>(
    effect: Effect<A>,
    out: &'a mut Vec<A>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>>
where
    A: Send + 'static,
{
    Box::pin(async move {
        match effect {
            Effect::None => {},
            Effect::Future(fut) => {
                if let Some(action) = fut.await {
                    out.push(action);
                }
            }
            Effect::Parallel(effects) | Effect::Sequential(effects) => {
                for effect in effects {
                    resolve_into(effect, out).await;
                }
            }
        }
    })
}

//! # Geotech Runtime
//!
//! The Store runtime that coordinates reducer execution and effect handling
//! for the geotech client stores.
//!
//! ## Core Components
//!
//! - **Store**: owns a store's state, runs its reducer and executes effects
//! - **Effect execution**: futures are spawned on tokio; the action each one
//!   produces is reduced and then broadcast to observers
//! - **Request/response**: [`Store::send_and_wait`] lets a caller dispatch a
//!   request action and await the terminal action that answers it
//!
//! ## Example
//!
//! ```ignore
//! use geotech_runtime::Store;
//!
//! let store = Store::new(ProjectState::default(), ProjectReducer::new(), env)
//!     .with_name("projects");
//!
//! let request = RequestId::next();
//! let projects = store
//!     .send_and_wait_map(ProjectAction::FetchProjects { request }, |a| match a {
//!         ProjectAction::ProjectsLoaded { request: r, projects } if r == request => {
//!             Some(projects)
//!         },
//!         _ => None,
//!     })
//!     .await?;
//!
//! let count = store.state(|s| s.projects.len()).await;
//! ```

use geotech_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, oneshot, watch};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` is called after shutdown was initiated.
        /// Effects already in flight still complete and feed back.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a terminal action
        ///
        /// Returned by [`Store::send_and_wait_for`](crate::Store::send_and_wait_for)
        /// when the timeout expires before a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// The store was dropped before the awaited answer arrived
        #[error("Store dropped before answering")]
        ChannelClosed,
    }
}

pub use error::StoreError;
pub use store::Store;

/// Default capacity of the action broadcast channel.
///
/// Only observers read this channel; callers of the `send_and_wait*`
/// methods get their answers through their own waiter, which never lags.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] so callers can wait until the effects
/// spawned by that action (including their feedback reduction) are done.
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of effects still running for this handle
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires first.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop,
/// even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - the runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DEFAULT_BROADCAST_CAPACITY,
        DecrementGuard, Duration, Effect, EffectHandle, EffectTracking, Mutex, Ordering,
        Reducer, RwLock, StoreError, oneshot,
    };
    use tokio::sync::broadcast;

    /// A caller waiting for the action that answers its request.
    ///
    /// Offered every applied result; returns `true` once it is finished with,
    /// either because it took its answer or because its caller went away.
    type Waiter<A> = Box<dyn FnMut(&A) -> bool + Send>;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; only the reducer writes it)
    /// 2. Reducer (the store's transitions)
    /// 3. Environment (services, navigator, clock)
    /// 4. Effect execution with result feedback
    ///
    /// Cloning a Store is cheap and yields a handle to the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        name: &'static str,
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Every action produced by an effect is broadcast here after the
        /// reducer has applied it.
        action_broadcast: broadcast::Sender<A>,
        /// Pending `send_and_wait*` callers, answered in place so a burst of
        /// results can never push an answer out of a bounded channel.
        waiters: Arc<Mutex<Vec<Waiter<A>>>>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// The action broadcast capacity is [`DEFAULT_BROADCAST_CAPACITY`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(
                initial_state,
                reducer,
                environment,
                DEFAULT_BROADCAST_CAPACITY,
            )
        }

        /// Create a store with a custom action broadcast capacity
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));

            Self {
                name: "store",
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
                waiters: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Set the name used in logs and metric labels
        #[must_use]
        pub const fn with_name(mut self, name: &'static str) -> Self {
            self.name = name;
            self
        }

        /// The name used in logs and metric labels
        #[must_use]
        pub const fn name(&self) -> &'static str {
            self.name
        }

        /// Access the environment the reducer runs with
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.environment
        }

        /// Send an action to the store
        ///
        /// Runs the reducer under the state write lock, then spawns the
        /// returned effects. Returns once the state transition is applied;
        /// the returned [`EffectHandle`] can be awaited for the effects.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send", fields(store = self.name))]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::warn!("Rejecting action, store is shutting down");
                return Err(StoreError::ShutdownInProgress);
            }

            Ok(self.dispatch(action).await)
        }

        /// Send an action and wait for a matching result action
        ///
        /// The waiter is registered before sending, so a result produced
        /// immediately cannot be missed. The matching action has already been
        /// applied to state when it is returned.
        ///
        /// # Errors
        ///
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        /// - [`StoreError::ChannelClosed`]: the store was dropped first
        pub async fn send_and_wait<F>(&self, action: A, predicate: F) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool + Send + 'static,
        {
            self.send_and_wait_map(action, move |a| predicate(&a).then_some(a))
                .await
        }

        /// Send an action and wait for the first result `extract` accepts
        ///
        /// `extract` sees every action produced by effects after the send and
        /// returns `Some` for the one that answers this request. Use it to
        /// pull the payload out of the answering action in one step.
        ///
        /// Any number of callers may wait at once; each is answered directly
        /// and none depends on the broadcast capacity.
        ///
        /// # Errors
        ///
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        /// - [`StoreError::ChannelClosed`]: the store was dropped first
        pub async fn send_and_wait_map<F, T>(&self, action: A, extract: F) -> Result<T, StoreError>
        where
            F: FnMut(A) -> Option<T> + Send + 'static,
            T: Send + 'static,
        {
            let answer = self.register_waiter(extract).await;
            self.send(action).await?;
            answer.await.map_err(|_| StoreError::ChannelClosed)
        }

        /// Like [`send_and_wait`](Self::send_and_wait), bounded by `timeout`
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action before the timeout
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        /// - [`StoreError::ChannelClosed`]: the store was dropped first
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool + Send + 'static,
        {
            let answer = self
                .register_waiter(move |a| predicate(&a).then_some(a))
                .await;
            self.send(action).await?;

            tokio::time::timeout(timeout, answer)
                .await
                .map_err(|_| StoreError::Timeout)?
                .map_err(|_| StoreError::ChannelClosed)
        }

        /// Subscribe to every action produced by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read the current state through a closure
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Number of effects currently executing
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::SeqCst)
        }

        /// Stop accepting new actions and wait for in-flight effects
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still
        /// running when `timeout` elapses.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            self.shutdown.store(true, Ordering::SeqCst);
            tracing::info!(store = self.name, "Store shutdown initiated");

            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let pending = self.pending_effects.load(Ordering::SeqCst);
                if pending == 0 {
                    tracing::info!(store = self.name, "Store shutdown complete");
                    return Ok(());
                }
                if tokio::time::Instant::now() >= deadline {
                    tracing::warn!(store = self.name, pending, "Store shutdown timed out");
                    return Err(StoreError::ShutdownTimeout(pending));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        /// Queue a waiter that resolves with the first result `extract` accepts.
        async fn register_waiter<F, T>(&self, mut extract: F) -> oneshot::Receiver<T>
        where
            F: FnMut(A) -> Option<T> + Send + 'static,
            T: Send + 'static,
        {
            let (tx, rx) = oneshot::channel();
            let mut tx = Some(tx);
            let waiter: Waiter<A> = Box::new(move |action: &A| {
                match tx.as_ref() {
                    Some(sender) if !sender.is_closed() => {}
                    _ => return true,
                }
                let Some(answer) = extract(action.clone()) else {
                    return false;
                };
                if let Some(sender) = tx.take() {
                    let _ = sender.send(answer);
                }
                true
            });

            self.waiters.lock().await.push(waiter);
            rx
        }

        /// Reduce an action and start its effects.
        ///
        /// Bypasses the shutdown check so results of in-flight effects are
        /// still applied while the store drains.
        async fn dispatch(&self, action: A) -> EffectHandle {
            metrics::counter!("store.actions.dispatched", "store" => self.name).increment(1);

            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut *state, action, &self.environment)
            };

            let (handle, tracking) = EffectHandle::new();
            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }
            handle
        }

        /// Apply an effect's result, then publish it to observers.
        async fn feed_back(&self, action: A) {
            let _ = self.dispatch(action.clone()).await;
            self.waiters.lock().await.retain_mut(|waiter| !waiter(&action));
            // No receivers is fine: nobody is waiting on this store
            let _ = self.action_broadcast.send(action);
        }

        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                }
                Effect::Future(fut) => {
                    tracing::trace!(store = self.name, "Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking);
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            store.feed_back(action).await;
                        }
                    });
                }
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect(effect, tracking.clone());
                    }
                }
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential")
                        .increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking);
                        let _pending_guard = pending_guard;

                        for effect in effects {
                            let (mut handle, sub_tracking) = EffectHandle::new();
                            store.execute_effect(effect, sub_tracking);
                            handle.wait().await;
                        }
                    });
                }
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                name: self.name,
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
                waiters: Arc::clone(&self.waiters),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use geotech_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Increment,
        Load { request: u64 },
        Loaded { request: u64, value: u32 },
        Steps,
        Step(u32),
    }

    #[derive(Debug, Default)]
    struct TestState {
        count: u32,
        loading: bool,
        steps: Vec<u32>,
    }

    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = u32;

        fn reduce(
            &self,
            state: &mut TestState,
            action: TestAction,
            env: &u32,
        ) -> SmallVec<[Effect<TestAction>; 4]> {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                    smallvec![Effect::None]
                }
                TestAction::Load { request } => {
                    state.loading = true;
                    let value = *env;
                    smallvec![Effect::task(async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        TestAction::Loaded { request, value }
                    })]
                }
                TestAction::Loaded { value, .. } => {
                    state.loading = false;
                    state.count = value;
                    smallvec![Effect::None]
                }
                TestAction::Steps => smallvec![Effect::chain(vec![
                    Effect::task(async {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        TestAction::Step(1)
                    }),
                    Effect::task(async { TestAction::Step(2) }),
                ])],
                TestAction::Step(n) => {
                    state.steps.push(n);
                    smallvec![Effect::None]
                }
            }
        }
    }

    #[tokio::test]
    async fn send_applies_reducer() {
        let store = Store::new(TestState::default(), TestReducer, 0);
        store.send(TestAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.count).await, 1);
    }

    #[tokio::test]
    async fn send_and_wait_sees_applied_result() {
        let store = Store::new(TestState::default(), TestReducer, 42).with_name("test");

        let result = store
            .send_and_wait(TestAction::Load { request: 1 }, |a| {
                matches!(a, TestAction::Loaded { request: 1, .. })
            })
            .await
            .unwrap();

        assert_eq!(result, TestAction::Loaded { request: 1, value: 42 });
        // The result was reduced before it was broadcast
        assert!(!store.state(|s| s.loading).await);
        assert_eq!(store.state(|s| s.count).await, 42);
    }

    #[tokio::test]
    async fn sequential_effects_run_in_order() {
        let store = Store::new(TestState::default(), TestReducer, 0);
        let mut handle = store.send(TestAction::Steps).await.unwrap();
        handle.wait().await;
        assert_eq!(store.state(|s| s.steps.clone()).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn wait_for_times_out_without_match() {
        let store = Store::new(TestState::default(), TestReducer, 0);
        let result = store
            .send_and_wait_for(TestAction::Increment, |_| true, Duration::from_millis(20))
            .await;
        assert_eq!(result, Err(StoreError::Timeout));
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = Store::new(TestState::default(), TestReducer, 0);
        store.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(
            store.send(TestAction::Increment).await.unwrap_err(),
            StoreError::ShutdownInProgress
        );
    }

    #[tokio::test]
    async fn completed_handle_does_not_block() {
        let mut handle = EffectHandle::completed();
        assert_eq!(handle.pending(), 0);
        handle.wait_with_timeout(Duration::from_millis(10)).await.unwrap();
    }
}

//! CPT test store

use crate::error::Result;
use crate::providers::CptProvider;
use crate::request::{RequestId, Terminal, await_outcome};
use geotech_api::DomainError;
use geotech_api::models::{CptTest, CptTestId, CptTestPayload, CptUpload, ProjectId};
use geotech_core::effect::Effect;
use geotech_core::reducer::Reducer;
use geotech_core::{SmallVec, smallvec};
use geotech_runtime::Store;
use std::marker::PhantomData;

/// State of the CPT test store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CptState {
    /// Tests of the last fetched project, plus local additions
    pub tests: Vec<CptTest>,
    /// A request is in flight
    pub loading: bool,
    /// Message of the last failed request
    pub error: Option<String>,
}

impl CptState {
    /// Tests belonging to `project`
    #[must_use]
    pub fn tests_by_project(&self, project: ProjectId) -> Vec<&CptTest> {
        self.tests
            .iter()
            .filter(|test| test.project_id == project)
            .collect()
    }

    /// Find a test by id
    #[must_use]
    pub fn test_by_id(&self, id: CptTestId) -> Option<&CptTest> {
        self.tests.iter().find(|test| test.id == id)
    }

    fn replace(&mut self, test: CptTest) {
        if let Some(slot) = self.tests.iter_mut().find(|t| t.id == test.id) {
            *slot = test;
        }
    }
}

/// Actions of the CPT test store
#[derive(Debug, Clone)]
pub enum CptAction {
    /// Load the tests of a project, replacing the collection
    FetchTests {
        /// Correlation id
        request: RequestId,
        /// Owning project
        project: ProjectId,
    },
    /// Create a test
    CreateTest {
        /// Correlation id
        request: RequestId,
        /// Owning project
        project: ProjectId,
        /// Test fields
        payload: CptTestPayload,
    },
    /// Update a test
    UpdateTest {
        /// Correlation id
        request: RequestId,
        /// Owning project
        project: ProjectId,
        /// Test to update
        id: CptTestId,
        /// Changed fields
        payload: CptTestPayload,
    },
    /// Delete a test
    DeleteTest {
        /// Correlation id
        request: RequestId,
        /// Owning project
        project: ProjectId,
        /// Test to delete
        id: CptTestId,
    },
    /// Upload a data file into a test
    ImportData {
        /// Correlation id
        request: RequestId,
        /// Owning project
        project: ProjectId,
        /// Target test
        id: CptTestId,
        /// File to upload
        upload: CptUpload,
    },
    /// Download a test's data
    ExportData {
        /// Correlation id
        request: RequestId,
        /// Owning project
        project: ProjectId,
        /// Test to export
        id: CptTestId,
    },

    /// Tests loaded
    TestsLoaded {
        /// Correlation id
        request: RequestId,
        /// The full collection
        tests: Vec<CptTest>,
    },
    /// Test created
    TestCreated {
        /// Correlation id
        request: RequestId,
        /// The test as stored
        test: CptTest,
    },
    /// Test updated, either directly or by an import
    TestUpdated {
        /// Correlation id
        request: RequestId,
        /// The test as stored
        test: CptTest,
    },
    /// Test deleted
    TestDeleted {
        /// Correlation id
        request: RequestId,
        /// The deleted test
        id: CptTestId,
    },
    /// Export saved
    DataExported {
        /// Correlation id
        request: RequestId,
        /// The exported test
        id: CptTestId,
    },
    /// A request failed
    RequestFailed {
        /// Correlation id
        request: RequestId,
        /// Normalized failure
        error: DomainError,
    },
}

impl Terminal for CptAction {
    fn completes(&self) -> Option<RequestId> {
        match self {
            Self::TestsLoaded { request, .. }
            | Self::TestCreated { request, .. }
            | Self::TestUpdated { request, .. }
            | Self::TestDeleted { request, .. }
            | Self::DataExported { request, .. }
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

/// Dependencies of the CPT test store
#[derive(Debug, Clone)]
pub struct CptEnvironment<P> {
    /// CPT provider
    pub tests: P,
}

impl<P> CptEnvironment<P> {
    /// Create an environment
    pub const fn new(tests: P) -> Self {
        Self { tests }
    }
}

/// Reducer of the CPT test store
#[derive(Debug, Clone, Copy, Default)]
pub struct CptReducer<P> {
    _provider: PhantomData<fn() -> P>,
}

impl<P> CptReducer<P> {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _provider: PhantomData,
        }
    }
}

impl<P> Reducer for CptReducer<P>
where
    P: CptProvider + Clone + 'static,
{
    type State = CptState;
    type Action = CptAction;
    type Environment = CptEnvironment<P>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let tests = env.tests.clone();

        match action {
            CptAction::FetchTests { request, project } => {
                state.loading = true;
                state.error = None;
                smallvec![Effect::task(async move {
                    let result = tests.list(project).await;
                    settle(request, result.map(|tests| CptAction::TestsLoaded { request, tests }))
                })]
            }

            CptAction::CreateTest {
                request,
                project,
                payload,
            } => {
                state.loading = true;
                state.error = None;
                smallvec![Effect::task(async move {
                    let result = tests.create(project, &payload).await;
                    settle(request, result.map(|test| CptAction::TestCreated { request, test }))
                })]
            }

            CptAction::UpdateTest {
                request,
                project,
                id,
                payload,
            } => {
                state.loading = true;
                state.error = None;
                smallvec![Effect::task(async move {
                    let result = tests.update(project, id, &payload).await;
                    settle(request, result.map(|test| CptAction::TestUpdated { request, test }))
                })]
            }

            CptAction::DeleteTest {
                request,
                project,
                id,
            } => {
                state.loading = true;
                state.error = None;
                smallvec![Effect::task(async move {
                    let result = tests.delete(project, id).await;
                    settle(request, result.map(|()| CptAction::TestDeleted { request, id }))
                })]
            }

            CptAction::ImportData {
                request,
                project,
                id,
                upload,
            } => {
                state.loading = true;
                state.error = None;
                smallvec![Effect::task(async move {
                    let result = tests.import(project, id, upload).await;
                    settle(request, result.map(|test| CptAction::TestUpdated { request, test }))
                })]
            }

            CptAction::ExportData {
                request,
                project,
                id,
            } => {
                state.loading = true;
                state.error = None;
                smallvec![Effect::task(async move {
                    let result = tests.export(project, id).await;
                    settle(request, result.map(|()| CptAction::DataExported { request, id }))
                })]
            }

            CptAction::TestsLoaded { tests, .. } => {
                state.loading = false;
                state.tests = tests;
                smallvec![Effect::None]
            }

            CptAction::TestCreated { test, .. } => {
                state.loading = false;
                state.tests.push(test);
                smallvec![Effect::None]
            }

            CptAction::TestUpdated { test, .. } => {
                state.loading = false;
                state.replace(test);
                smallvec![Effect::None]
            }

            CptAction::TestDeleted { id, .. } => {
                state.loading = false;
                state.tests.retain(|t| t.id != id);
                smallvec![Effect::None]
            }

            CptAction::DataExported { id, .. } => {
                tracing::debug!(test = %id, "CPT data exported");
                state.loading = false;
                smallvec![Effect::None]
            }

            CptAction::RequestFailed { error, .. } => {
                tracing::warn!(error = %error, "CPT request failed");
                state.loading = false;
                state.error = Some(error.message);
                smallvec![Effect::None]
            }
        }
    }
}

/// Store type behind [`CptStore`]
pub type CptRuntime<P> = Store<CptState, CptAction, CptEnvironment<P>, CptReducer<P>>;

/// CPT test store
pub struct CptStore<P>
where
    P: CptProvider + Clone + 'static,
{
    store: CptRuntime<P>,
}

impl<P> Clone for CptStore<P>
where
    P: CptProvider + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<P> CptStore<P>
where
    P: CptProvider + Clone + 'static,
{
    /// Create the store
    #[must_use]
    pub fn new(env: CptEnvironment<P>) -> Self {
        Self {
            store: Store::new(CptState::default(), CptReducer::new(), env).with_name("cpt"),
        }
    }

    /// Load the tests of a project, replacing the collection
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn fetch_tests(&self, project: ProjectId) -> Result<Vec<CptTest>> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            CptAction::FetchTests { request, project },
            request,
            |a| match a {
                CptAction::TestsLoaded { tests, .. } => Some(tests),
                _ => None,
            },
        )
        .await
    }

    /// Create a test and append it
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn create_test(
        &self,
        project: ProjectId,
        payload: CptTestPayload,
    ) -> Result<CptTest> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            CptAction::CreateTest {
                request,
                project,
                payload,
            },
            request,
            updated_or_created,
        )
        .await
    }

    /// Update a test in place
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn update_test(
        &self,
        project: ProjectId,
        id: CptTestId,
        payload: CptTestPayload,
    ) -> Result<CptTest> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            CptAction::UpdateTest {
                request,
                project,
                id,
                payload,
            },
            request,
            updated_or_created,
        )
        .await
    }

    /// Delete a test
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn delete_test(&self, project: ProjectId, id: CptTestId) -> Result<()> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            CptAction::DeleteTest {
                request,
                project,
                id,
            },
            request,
            |a| matches!(a, CptAction::TestDeleted { .. }).then_some(()),
        )
        .await
    }

    /// Upload a data file into a test, replacing it with the server's copy
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn import_data(
        &self,
        project: ProjectId,
        id: CptTestId,
        upload: CptUpload,
    ) -> Result<CptTest> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            CptAction::ImportData {
                request,
                project,
                id,
                upload,
            },
            request,
            updated_or_created,
        )
        .await
    }

    /// Download a test's data to the provider's download destination
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn export_data(&self, project: ProjectId, id: CptTestId) -> Result<()> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            CptAction::ExportData {
                request,
                project,
                id,
            },
            request,
            |a| matches!(a, CptAction::DataExported { .. }).then_some(()),
        )
        .await
    }

    /// Tests belonging to `project`
    pub async fn tests_by_project(&self, project: ProjectId) -> Vec<CptTest> {
        self.store
            .state(|s| s.tests_by_project(project).into_iter().cloned().collect())
            .await
    }

    /// Find a test by id
    pub async fn test_by_id(&self, id: CptTestId) -> Option<CptTest> {
        self.store.state(|s| s.test_by_id(id).cloned()).await
    }

    /// Snapshot of the state
    pub async fn snapshot(&self) -> CptState {
        self.store.state(Clone::clone).await
    }

    /// The underlying store
    #[must_use]
    pub const fn runtime(&self) -> &CptRuntime<P> {
        &self.store
    }
}

fn settle(request: RequestId, result: std::result::Result<CptAction, DomainError>) -> CptAction {
    result.unwrap_or_else(|error| CptAction::RequestFailed { request, error })
}

fn updated_or_created(action: CptAction) -> Option<CptTest> {
    match action {
        CptAction::TestCreated { test, .. } | CptAction::TestUpdated { test, .. } => Some(test),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockCptProvider;
    use geotech_api::models::CptReading;
    use geotech_testing::{ReducerTest, assertions};

    fn test(id: i64, project: i64, readings: u32) -> CptTest {
        CptTest {
            id: CptTestId::new(id),
            project_id: ProjectId::new(project),
            name: Some(format!("CPT {id}")),
            created_at: None,
            data: (0..readings)
                .map(|i| CptReading::new(f64::from(i), 1.0, 0.1, 0.0))
                .collect(),
        }
    }

    fn env() -> CptEnvironment<MockCptProvider> {
        CptEnvironment::new(MockCptProvider::new())
    }

    #[test]
    fn test_import_result_replaces_test_by_id() {
        ReducerTest::new(CptReducer::new())
            .with_env(env())
            .given_state(CptState {
                tests: vec![test(1, 1, 0), test(2, 1, 0)],
                loading: true,
                ..CptState::default()
            })
            .when_action(CptAction::TestUpdated {
                request: RequestId::next(),
                test: test(2, 1, 3),
            })
            .then_state(|state| {
                assert_eq!(state.tests.len(), 2);
                assert_eq!(state.test_by_id(CptTestId::new(2)).unwrap().data.len(), 3);
                assert!(!state.loading);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_export_starts_loading() {
        ReducerTest::new(CptReducer::new())
            .with_env(env())
            .given_state(CptState::default())
            .when_action(CptAction::ExportData {
                request: RequestId::next(),
                project: ProjectId::new(1),
                id: CptTestId::new(1),
            })
            .then_state(|state| assert!(state.loading))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_tests_by_project() {
        let state = CptState {
            tests: vec![test(1, 1, 0), test(2, 2, 0), test(3, 1, 0)],
            ..CptState::default()
        };
        let ids: Vec<_> = state
            .tests_by_project(ProjectId::new(1))
            .iter()
            .map(|t| t.id.get())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_import_then_export_round_trip_through_mock() {
        let provider = MockCptProvider::new();
        let store = CptStore::new(CptEnvironment::new(provider.clone()));
        let project = ProjectId::new(1);

        let created = store
            .create_test(project, CptTestPayload::named("CPT A"))
            .await
            .unwrap();
        let imported = store
            .import_data(
                project,
                created.id,
                CptUpload::new("a.csv", "depth,qc,fs,u\n1.0,2.0,0.1,0.0\n2.0,3.5,0.2,0.0\n"),
            )
            .await
            .unwrap();
        assert_eq!(imported.data.len(), 2);
        assert_eq!(
            store.test_by_id(created.id).await.unwrap().data,
            imported.data
        );

        store.export_data(project, created.id).await.unwrap();
        let files = provider.downloads().files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, format!("cpt-test-{}.csv", created.id));
    }
}

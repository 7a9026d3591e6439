//! Project store
//!
//! Holds the project list, the project being viewed and the last fetched
//! statistics. Every remote command carries a [`RequestId`]; the terminal
//! action echoes it so the facade can hand each caller its own result.

use crate::error::Result;
use crate::providers::ProjectProvider;
use crate::request::{RequestId, Terminal, await_outcome};
use geotech_api::DomainError;
use geotech_api::models::{Project, ProjectId, ProjectPayload, ProjectStats};
use geotech_core::effect::Effect;
use geotech_core::reducer::Reducer;
use geotech_core::{SmallVec, smallvec};
use geotech_runtime::Store;
use std::marker::PhantomData;

/// Number of projects returned by [`ProjectState::recent_projects`]
pub const RECENT_PROJECTS_LIMIT: usize = 5;

/// State of the project store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectState {
    /// Projects, in server order
    pub projects: Vec<Project>,
    /// The project being viewed
    pub current_project: Option<Project>,
    /// Last statistics fetched with `fetch_stats`
    pub stats: Option<ProjectStats>,
    /// A request is in flight
    pub loading: bool,
    /// Message of the last failed request
    pub error: Option<String>,
}

impl ProjectState {
    /// Find a project by id
    #[must_use]
    pub fn project_by_id(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// The most recently updated projects, newest first
    ///
    /// Projects without `updated_at` sort last.
    #[must_use]
    pub fn recent_projects(&self) -> Vec<&Project> {
        let mut recent: Vec<&Project> = self.projects.iter().collect();
        recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        recent.truncate(RECENT_PROJECTS_LIMIT);
        recent
    }

    fn upsert_current(&mut self, project: &Project) {
        if self.current_project.as_ref().is_some_and(|c| c.id == project.id) {
            self.current_project = Some(project.clone());
        }
    }
}

/// Actions of the project store
#[derive(Debug, Clone)]
pub enum ProjectAction {
    /// Load every project
    FetchProjects {
        /// Correlation id
        request: RequestId,
    },
    /// Load one project and make it current
    FetchProject {
        /// Correlation id
        request: RequestId,
        /// Project to load
        id: ProjectId,
    },
    /// Create a project
    CreateProject {
        /// Correlation id
        request: RequestId,
        /// New project fields
        payload: ProjectPayload,
    },
    /// Update a project
    UpdateProject {
        /// Correlation id
        request: RequestId,
        /// Project to update
        id: ProjectId,
        /// Changed fields
        payload: ProjectPayload,
    },
    /// Delete a project, then refresh the global statistics
    DeleteProject {
        /// Correlation id
        request: RequestId,
        /// Project to delete
        id: ProjectId,
    },
    /// Load statistics for one project or all of them
    FetchStats {
        /// Correlation id
        request: RequestId,
        /// Project, or `None` for global statistics
        project_id: Option<ProjectId>,
        /// Keep the result in `stats`
        retain: bool,
    },

    /// Projects loaded
    ProjectsLoaded {
        /// Correlation id
        request: RequestId,
        /// The full collection
        projects: Vec<Project>,
    },
    /// One project loaded
    ProjectLoaded {
        /// Correlation id
        request: RequestId,
        /// The project
        project: Project,
    },
    /// Project created
    ProjectCreated {
        /// Correlation id
        request: RequestId,
        /// The project as stored
        project: Project,
    },
    /// Project updated
    ProjectUpdated {
        /// Correlation id
        request: RequestId,
        /// The project as stored
        project: Project,
    },
    /// Project deleted; `stats` is the outcome of the follow-up refresh
    ProjectDeleted {
        /// Correlation id
        request: RequestId,
        /// The deleted project
        id: ProjectId,
        /// Refreshed global statistics
        stats: std::result::Result<ProjectStats, DomainError>,
    },
    /// Statistics loaded
    StatsLoaded {
        /// Correlation id
        request: RequestId,
        /// The statistics
        stats: ProjectStats,
        /// Keep the result in `stats`
        retain: bool,
    },
    /// A request failed
    RequestFailed {
        /// Correlation id
        request: RequestId,
        /// Normalized failure
        error: DomainError,
    },
}

/// Dependencies of the project store
#[derive(Debug, Clone)]
pub struct ProjectEnvironment<P> {
    /// Project provider
    pub projects: P,
}

impl<P> ProjectEnvironment<P> {
    /// Create an environment
    pub const fn new(projects: P) -> Self {
        Self { projects }
    }
}

/// Reducer of the project store
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectReducer<P> {
    _provider: PhantomData<fn() -> P>,
}

impl<P> ProjectReducer<P> {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _provider: PhantomData,
        }
    }
}

fn begin(state: &mut ProjectState) {
    state.loading = true;
    state.error = None;
}

impl<P> Reducer for ProjectReducer<P>
where
    P: ProjectProvider + Clone + 'static,
{
    type State = ProjectState;
    type Action = ProjectAction;
    type Environment = ProjectEnvironment<P>;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ProjectAction::FetchProjects { request } => {
                begin(state);
                let projects = env.projects.clone();
                smallvec![Effect::task(async move {
                    match projects.list().await {
                        Ok(projects) => ProjectAction::ProjectsLoaded { request, projects },
                        Err(error) => ProjectAction::RequestFailed { request, error },
                    }
                })]
            }

            ProjectAction::FetchProject { request, id } => {
                begin(state);
                let projects = env.projects.clone();
                smallvec![Effect::task(async move {
                    match projects.get(id).await {
                        Ok(project) => ProjectAction::ProjectLoaded { request, project },
                        Err(error) => ProjectAction::RequestFailed { request, error },
                    }
                })]
            }

            ProjectAction::CreateProject { request, payload } => {
                begin(state);
                let projects = env.projects.clone();
                smallvec![Effect::task(async move {
                    match projects.create(&payload).await {
                        Ok(project) => ProjectAction::ProjectCreated { request, project },
                        Err(error) => ProjectAction::RequestFailed { request, error },
                    }
                })]
            }

            ProjectAction::UpdateProject {
                request,
                id,
                payload,
            } => {
                begin(state);
                let projects = env.projects.clone();
                smallvec![Effect::task(async move {
                    match projects.update(id, &payload).await {
                        Ok(project) => ProjectAction::ProjectUpdated { request, project },
                        Err(error) => ProjectAction::RequestFailed { request, error },
                    }
                })]
            }

            ProjectAction::DeleteProject { request, id } => {
                begin(state);
                let projects = env.projects.clone();
                smallvec![Effect::task(async move {
                    match projects.delete(id).await {
                        Ok(()) => ProjectAction::ProjectDeleted {
                            request,
                            id,
                            stats: projects.stats(None).await,
                        },
                        Err(error) => ProjectAction::RequestFailed { request, error },
                    }
                })]
            }

            ProjectAction::FetchStats {
                request,
                project_id,
                retain,
            } => {
                begin(state);
                let projects = env.projects.clone();
                smallvec![Effect::task(async move {
                    match projects.stats(project_id).await {
                        Ok(stats) => ProjectAction::StatsLoaded {
                            request,
                            stats,
                            retain,
                        },
                        Err(error) => ProjectAction::RequestFailed { request, error },
                    }
                })]
            }

            ProjectAction::ProjectsLoaded { projects, .. } => {
                state.loading = false;
                state.projects = projects;
                smallvec![Effect::None]
            }

            ProjectAction::ProjectLoaded { project, .. } => {
                state.loading = false;
                state.current_project = Some(project);
                smallvec![Effect::None]
            }

            ProjectAction::ProjectCreated { project, .. } => {
                state.loading = false;
                state.projects.push(project);
                smallvec![Effect::None]
            }

            ProjectAction::ProjectUpdated { project, .. } => {
                state.loading = false;
                if let Some(slot) = state.projects.iter_mut().find(|p| p.id == project.id) {
                    *slot = project.clone();
                }
                state.upsert_current(&project);
                smallvec![Effect::None]
            }

            ProjectAction::ProjectDeleted { id, stats, .. } => {
                state.loading = false;
                state.projects.retain(|p| p.id != id);
                if state.current_project.as_ref().is_some_and(|p| p.id == id) {
                    state.current_project = None;
                }
                match stats {
                    Ok(stats) => state.stats = Some(stats),
                    Err(error) => {
                        tracing::warn!(error = %error, "Statistics refresh after delete failed");
                        state.error = Some(error.message);
                    }
                }
                smallvec![Effect::None]
            }

            ProjectAction::StatsLoaded { stats, retain, .. } => {
                state.loading = false;
                if retain {
                    state.stats = Some(stats);
                }
                smallvec![Effect::None]
            }

            ProjectAction::RequestFailed { error, .. } => {
                tracing::warn!(error = %error, "Project request failed");
                state.loading = false;
                state.error = Some(error.message);
                smallvec![Effect::None]
            }
        }
    }
}

/// Store type behind [`ProjectStore`]
pub type ProjectRuntime<P> =
    Store<ProjectState, ProjectAction, ProjectEnvironment<P>, ProjectReducer<P>>;

/// Project store
pub struct ProjectStore<P>
where
    P: ProjectProvider + Clone + 'static,
{
    store: ProjectRuntime<P>,
}

impl<P> Clone for ProjectStore<P>
where
    P: ProjectProvider + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl Terminal for ProjectAction {
    fn completes(&self) -> Option<RequestId> {
        match self {
            Self::ProjectsLoaded { request, .. }
            | Self::ProjectLoaded { request, .. }
            | Self::ProjectCreated { request, .. }
            | Self::ProjectUpdated { request, .. }
            | Self::ProjectDeleted { request, .. }
            | Self::StatsLoaded { request, .. }
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

impl<P> ProjectStore<P>
where
    P: ProjectProvider + Clone + 'static,
{
    /// Create the store
    #[must_use]
    pub fn new(env: ProjectEnvironment<P>) -> Self {
        Self {
            store: Store::new(ProjectState::default(), ProjectReducer::new(), env)
                .with_name("projects"),
        }
    }

    /// Load every project, replacing the collection
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn fetch_projects(&self) -> Result<Vec<Project>> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            ProjectAction::FetchProjects { request },
            request,
            |a| match a {
                ProjectAction::ProjectsLoaded { projects, .. } => Some(projects),
                _ => None,
            },
        )
        .await
    }

    /// Load one project and make it current
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn fetch_project(&self, id: ProjectId) -> Result<Project> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            ProjectAction::FetchProject { request, id },
            request,
            |a| match a {
                ProjectAction::ProjectLoaded { project, .. } => Some(project),
                _ => None,
            },
        )
        .await
    }

    /// Create a project and append it to the collection
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn create_project(&self, payload: ProjectPayload) -> Result<Project> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            ProjectAction::CreateProject { request, payload },
            request,
            |a| match a {
                ProjectAction::ProjectCreated { project, .. } => Some(project),
                _ => None,
            },
        )
        .await
    }

    /// Update a project, refreshing `current_project` when it matches
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn update_project(&self, id: ProjectId, payload: ProjectPayload) -> Result<Project> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            ProjectAction::UpdateProject {
                request,
                id,
                payload,
            },
            request,
            |a| match a {
                ProjectAction::ProjectUpdated { project, .. } => Some(project),
                _ => None,
            },
        )
        .await
    }

    /// Delete a project, then refresh the global statistics
    ///
    /// # Errors
    ///
    /// Returns the normalized failure of the delete, or of the statistics
    /// refresh once the project is gone.
    pub async fn delete_project(&self, id: ProjectId) -> Result<()> {
        let request = RequestId::next();
        let refreshed = await_outcome(
            &self.store,
            ProjectAction::DeleteProject { request, id },
            request,
            |a| match a {
                ProjectAction::ProjectDeleted { stats, .. } => Some(stats),
                _ => None,
            },
        )
        .await?;
        refreshed.map(|_| ()).map_err(Into::into)
    }

    /// Load statistics for one project, or globally, and keep them in `stats`
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn fetch_stats(&self, project_id: Option<ProjectId>) -> Result<ProjectStats> {
        self.stats(project_id, true).await
    }

    /// Statistics of one project, returned without touching `stats`
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn project_statistics(&self, id: ProjectId) -> Result<ProjectStats> {
        self.stats(Some(id), false).await
    }

    async fn stats(&self, project_id: Option<ProjectId>, retain: bool) -> Result<ProjectStats> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            ProjectAction::FetchStats {
                request,
                project_id,
                retain,
            },
            request,
            |a| match a {
                ProjectAction::StatsLoaded { stats, .. } => Some(stats),
                _ => None,
            },
        )
        .await
    }

    /// Find a project by id
    pub async fn project_by_id(&self, id: ProjectId) -> Option<Project> {
        self.store.state(|s| s.project_by_id(id).cloned()).await
    }

    /// The most recently updated projects, newest first
    pub async fn recent_projects(&self) -> Vec<Project> {
        self.store
            .state(|s| s.recent_projects().into_iter().cloned().collect())
            .await
    }

    /// Snapshot of the state
    pub async fn snapshot(&self) -> ProjectState {
        self.store.state(Clone::clone).await
    }

    /// The underlying store
    #[must_use]
    pub const fn runtime(&self) -> &ProjectRuntime<P> {
        &self.store
    }
}

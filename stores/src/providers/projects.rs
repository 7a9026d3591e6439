//! Project provider trait.

use geotech_api::models::{Project, ProjectId, ProjectPayload, ProjectStats};
use geotech_api::{DomainError, ProjectService};
use std::future::Future;

/// Remote project collection.
pub trait ProjectProvider: Send + Sync {
    /// All projects.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn list(&self) -> impl Future<Output = Result<Vec<Project>, DomainError>> + Send;

    /// One project.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn get(&self, id: ProjectId) -> impl Future<Output = Result<Project, DomainError>> + Send;

    /// Create a project.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn create(
        &self,
        payload: &ProjectPayload,
    ) -> impl Future<Output = Result<Project, DomainError>> + Send;

    /// Update a project.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn update(
        &self,
        id: ProjectId,
        payload: &ProjectPayload,
    ) -> impl Future<Output = Result<Project, DomainError>> + Send;

    /// Delete a project.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn delete(&self, id: ProjectId) -> impl Future<Output = Result<(), DomainError>> + Send;

    /// Statistics for one project, or all of them.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn stats(
        &self,
        id: Option<ProjectId>,
    ) -> impl Future<Output = Result<ProjectStats, DomainError>> + Send;
}

impl ProjectProvider for ProjectService {
    fn list(&self) -> impl Future<Output = Result<Vec<Project>, DomainError>> + Send {
        Self::list(self)
    }

    fn get(&self, id: ProjectId) -> impl Future<Output = Result<Project, DomainError>> + Send {
        Self::get(self, id)
    }

    fn create(
        &self,
        payload: &ProjectPayload,
    ) -> impl Future<Output = Result<Project, DomainError>> + Send {
        Self::create(self, payload)
    }

    fn update(
        &self,
        id: ProjectId,
        payload: &ProjectPayload,
    ) -> impl Future<Output = Result<Project, DomainError>> + Send {
        Self::update(self, id, payload)
    }

    fn delete(&self, id: ProjectId) -> impl Future<Output = Result<(), DomainError>> + Send {
        Self::delete(self, id)
    }

    fn stats(
        &self,
        id: Option<ProjectId>,
    ) -> impl Future<Output = Result<ProjectStats, DomainError>> + Send {
        Self::stats(self, id)
    }
}

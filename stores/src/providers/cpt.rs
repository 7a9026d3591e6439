//! CPT test provider trait.

use geotech_api::models::{CptTest, CptTestId, CptTestPayload, CptUpload, ProjectId};
use geotech_api::{CptService, DomainError};
use std::future::Future;

/// Remote CPT tests, scoped by project.
pub trait CptProvider: Send + Sync {
    /// Tests of a project.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn list(
        &self,
        project: ProjectId,
    ) -> impl Future<Output = Result<Vec<CptTest>, DomainError>> + Send;

    /// Add a test.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn create(
        &self,
        project: ProjectId,
        payload: &CptTestPayload,
    ) -> impl Future<Output = Result<CptTest, DomainError>> + Send;

    /// Update a test.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn update(
        &self,
        project: ProjectId,
        id: CptTestId,
        payload: &CptTestPayload,
    ) -> impl Future<Output = Result<CptTest, DomainError>> + Send;

    /// Delete a test.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn delete(
        &self,
        project: ProjectId,
        id: CptTestId,
    ) -> impl Future<Output = Result<(), DomainError>> + Send;

    /// Upload a data file into a test and return the stored test.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn import(
        &self,
        project: ProjectId,
        id: CptTestId,
        upload: CptUpload,
    ) -> impl Future<Output = Result<CptTest, DomainError>> + Send;

    /// Download a test's data to the configured destination.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails or the file cannot be saved.
    fn export(
        &self,
        project: ProjectId,
        id: CptTestId,
    ) -> impl Future<Output = Result<(), DomainError>> + Send;
}

impl CptProvider for CptService {
    fn list(
        &self,
        project: ProjectId,
    ) -> impl Future<Output = Result<Vec<CptTest>, DomainError>> + Send {
        Self::list(self, project)
    }

    fn create(
        &self,
        project: ProjectId,
        payload: &CptTestPayload,
    ) -> impl Future<Output = Result<CptTest, DomainError>> + Send {
        Self::create(self, project, payload)
    }

    fn update(
        &self,
        project: ProjectId,
        id: CptTestId,
        payload: &CptTestPayload,
    ) -> impl Future<Output = Result<CptTest, DomainError>> + Send {
        Self::update(self, project, id, payload)
    }

    fn delete(
        &self,
        project: ProjectId,
        id: CptTestId,
    ) -> impl Future<Output = Result<(), DomainError>> + Send {
        Self::delete(self, project, id)
    }

    fn import(
        &self,
        project: ProjectId,
        id: CptTestId,
        upload: CptUpload,
    ) -> impl Future<Output = Result<CptTest, DomainError>> + Send {
        Self::import(self, project, id, upload)
    }

    fn export(
        &self,
        project: ProjectId,
        id: CptTestId,
    ) -> impl Future<Output = Result<(), DomainError>> + Send {
        Self::export(self, project, id)
    }
}

//! Soil layer provider trait.

use geotech_api::models::{ProjectId, SoilLayer, SoilLayerId, SoilLayerPayload};
use geotech_api::{DomainError, SoilLayerService};
use std::future::Future;

/// Remote soil layers, scoped by project.
pub trait SoilLayerProvider: Send + Sync {
    /// Layers of a project.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn list(
        &self,
        project: ProjectId,
    ) -> impl Future<Output = Result<Vec<SoilLayer>, DomainError>> + Send;

    /// Add a layer.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn create(
        &self,
        project: ProjectId,
        payload: &SoilLayerPayload,
    ) -> impl Future<Output = Result<SoilLayer, DomainError>> + Send;

    /// Update a layer.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn update(
        &self,
        project: ProjectId,
        id: SoilLayerId,
        payload: &SoilLayerPayload,
    ) -> impl Future<Output = Result<SoilLayer, DomainError>> + Send;

    /// Delete a layer.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn delete(
        &self,
        project: ProjectId,
        id: SoilLayerId,
    ) -> impl Future<Output = Result<(), DomainError>> + Send;
}

impl SoilLayerProvider for SoilLayerService {
    fn list(
        &self,
        project: ProjectId,
    ) -> impl Future<Output = Result<Vec<SoilLayer>, DomainError>> + Send {
        Self::list(self, project)
    }

    fn create(
        &self,
        project: ProjectId,
        payload: &SoilLayerPayload,
    ) -> impl Future<Output = Result<SoilLayer, DomainError>> + Send {
        Self::create(self, project, payload)
    }

    fn update(
        &self,
        project: ProjectId,
        id: SoilLayerId,
        payload: &SoilLayerPayload,
    ) -> impl Future<Output = Result<SoilLayer, DomainError>> + Send {
        Self::update(self, project, id, payload)
    }

    fn delete(
        &self,
        project: ProjectId,
        id: SoilLayerId,
    ) -> impl Future<Output = Result<(), DomainError>> + Send {
        Self::delete(self, project, id)
    }
}

//! Soil layer endpoints

use super::Normalize;
use crate::client::HttpClient;
use crate::error::DomainError;
use crate::models::{ProjectId, SoilLayer, SoilLayerId, SoilLayerPayload};

/// CRUD for the soil layers of a project
#[derive(Debug, Clone)]
pub struct SoilLayerService {
    client: HttpClient,
}

impl SoilLayerService {
    /// Create the service
    #[must_use]
    pub const fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Layers of a project
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn list(&self, project: ProjectId) -> Result<Vec<SoilLayer>, DomainError> {
        self.client
            .get_json(&collection(project))
            .await
            .normalize("Failed to fetch soil layers")
    }

    /// One layer
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn get(&self, project: ProjectId, id: SoilLayerId) -> Result<SoilLayer, DomainError> {
        self.client
            .get_json(&member(project, id))
            .await
            .normalize("Failed to fetch soil layer")
    }

    /// Add a layer to a project
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn create(
        &self,
        project: ProjectId,
        payload: &SoilLayerPayload,
    ) -> Result<SoilLayer, DomainError> {
        self.client
            .post_json(&collection(project), payload)
            .await
            .normalize("Failed to create soil layer")
    }

    /// Update a layer
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn update(
        &self,
        project: ProjectId,
        id: SoilLayerId,
        payload: &SoilLayerPayload,
    ) -> Result<SoilLayer, DomainError> {
        self.client
            .put_json(&member(project, id), payload)
            .await
            .normalize("Failed to update soil layer")
    }

    /// Delete a layer
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn delete(&self, project: ProjectId, id: SoilLayerId) -> Result<(), DomainError> {
        self.client
            .delete(&member(project, id))
            .await
            .normalize("Failed to delete soil layer")
    }
}

fn collection(project: ProjectId) -> String {
    format!("/projects/{project}/soil-layers/")
}

fn member(project: ProjectId, id: SoilLayerId) -> String {
    format!("/projects/{project}/soil-layers/{id}/")
}

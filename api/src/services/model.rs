//! Geotechnical model endpoints

use super::Normalize;
use crate::client::HttpClient;
use crate::error::DomainError;
use crate::models::{
    CptSheet, GeotechnicalModel, ModelId, ModelLayer, SaveCptRequest, SaveLayersRequest,
};

/// Loading and saving a model with its layers, CPT sheets and groundwater
#[derive(Debug, Clone)]
pub struct ModelService {
    client: HttpClient,
}

impl ModelService {
    /// Create the service
    #[must_use]
    pub const fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// A model with its layers and sheets
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn fetch(&self, id: ModelId) -> Result<GeotechnicalModel, DomainError> {
        self.client
            .get_json(&format!("/get_layers/{id}/"))
            .await
            .normalize("Failed to fetch layers")
    }

    /// Replace the model's layers
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn save_layers(
        &self,
        id: ModelId,
        layers: &[ModelLayer],
    ) -> Result<GeotechnicalModel, DomainError> {
        self.client
            .post_json(&format!("/save_layers/{id}/"), &SaveLayersRequest { layers })
            .await
            .normalize("Failed to save layers")
    }

    /// Write the whole model, creating it if the server has none with `id`
    ///
    /// Carries the groundwater levels along with layers and sheets.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn save_model(
        &self,
        id: ModelId,
        model: &GeotechnicalModel,
    ) -> Result<GeotechnicalModel, DomainError> {
        self.client
            .post_json(&format!("/model_detail/{id}/"), model)
            .await
            .normalize("Failed to save model")
    }

    /// Replace the model's CPT sheets
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn save_cpt(
        &self,
        id: ModelId,
        sheets: &[CptSheet],
    ) -> Result<GeotechnicalModel, DomainError> {
        self.client
            .post_json(&format!("/save_cpt/{id}/"), &SaveCptRequest { cpt_tests: sheets })
            .await
            .normalize("Failed to save CPT data")
    }
}

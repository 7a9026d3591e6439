//! Geotechnical model provider trait.

use geotech_api::models::{CptSheet, GeotechnicalModel, ModelId, ModelLayer};
use geotech_api::{DomainError, ModelService};
use std::future::Future;

/// Remote persistence of models, their layers and CPT sheets.
pub trait ModelProvider: Send + Sync {
    /// Load a model.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn fetch(
        &self,
        id: ModelId,
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send;

    /// Replace a model's layers.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn save_layers(
        &self,
        id: ModelId,
        layers: &[ModelLayer],
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send;

    /// Write a whole model, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn save_model(
        &self,
        id: ModelId,
        model: &GeotechnicalModel,
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send;

    /// Replace a model's CPT sheets.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the call fails.
    fn save_cpt(
        &self,
        id: ModelId,
        sheets: &[CptSheet],
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send;
}

impl ModelProvider for ModelService {
    fn fetch(
        &self,
        id: ModelId,
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send {
        Self::fetch(self, id)
    }

    fn save_layers(
        &self,
        id: ModelId,
        layers: &[ModelLayer],
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send {
        Self::save_layers(self, id, layers)
    }

    fn save_model(
        &self,
        id: ModelId,
        model: &GeotechnicalModel,
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send {
        Self::save_model(self, id, model)
    }

    fn save_cpt(
        &self,
        id: ModelId,
        sheets: &[CptSheet],
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send {
        Self::save_cpt(self, id, sheets)
    }
}

//! Mock geotechnical model provider for testing.

use super::{Shared, not_found};
use crate::providers::ModelProvider;
use geotech_api::DomainError;
use geotech_api::models::{CptSheet, GeotechnicalModel, ModelId, ModelLayer};
use std::collections::BTreeMap;
use std::future::{Future, ready};

/// Mock model provider.
///
/// Saving assigns ids to new layers and sheets, as the server does.
#[derive(Debug, Clone, Default)]
pub struct MockModelProvider {
    models: Shared<(BTreeMap<ModelId, GeotechnicalModel>, i64)>,
}

impl MockModelProvider {
    /// Create a provider holding `models`.
    #[must_use]
    pub fn with_models(models: impl IntoIterator<Item = GeotechnicalModel>) -> Self {
        let models = models.into_iter().map(|m| (m.id, m)).collect();
        Self {
            models: Shared::new((models, 0)),
        }
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: DomainError) {
        self.models.fail_next(error);
    }

    /// Number of calls served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.models.calls()
    }
}

/// An empty model with the given id.
#[must_use]
pub fn sample_model(id: i64) -> GeotechnicalModel {
    GeotechnicalModel {
        id: ModelId::new(id),
        name: format!("Model {id}"),
        project: None,
        npv: 0.0,
        npv_max: 0.0,
        layers: Vec::new(),
        cpt_tests: Vec::new(),
    }
}

impl ModelProvider for MockModelProvider {
    fn fetch(
        &self,
        id: ModelId,
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send {
        ready(
            self.models
                .call(|(models, _)| models.get(&id).cloned().ok_or_else(not_found)),
        )
    }

    fn save_layers(
        &self,
        id: ModelId,
        layers: &[ModelLayer],
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send {
        ready(self.models.call(|(models, next_id)| {
            let model = models.get_mut(&id).ok_or_else(not_found)?;
            model.layers = layers.to_vec();
            assign_ids(model, next_id);
            Ok(model.clone())
        }))
    }

    fn save_model(
        &self,
        id: ModelId,
        model: &GeotechnicalModel,
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send {
        ready(self.models.call(|(models, next_id)| {
            let mut stored = GeotechnicalModel {
                id,
                ..model.clone()
            };
            assign_ids(&mut stored, next_id);
            models.insert(id, stored.clone());
            Ok(stored)
        }))
    }

    fn save_cpt(
        &self,
        id: ModelId,
        sheets: &[CptSheet],
    ) -> impl Future<Output = Result<GeotechnicalModel, DomainError>> + Send {
        ready(self.models.call(|(models, next_id)| {
            let model = models.get_mut(&id).ok_or_else(not_found)?;
            model.cpt_tests = sheets.to_vec();
            assign_ids(model, next_id);
            Ok(model.clone())
        }))
    }
}

fn assign_ids(model: &mut GeotechnicalModel, next_id: &mut i64) {
    let layer_ids = model.layers.iter_mut().map(|layer| &mut layer.id);
    let sheet_ids = model.cpt_tests.iter_mut().map(|sheet| &mut sheet.id);
    for id in layer_ids.chain(sheet_ids).filter(|id| id.is_none()) {
        *next_id += 1;
        *id = Some(*next_id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_model_upserts() {
        let provider = MockModelProvider::default();
        let model = GeotechnicalModel {
            npv: 2.0,
            layers: vec![ModelLayer::new("Fill", 1.0)],
            ..sample_model(4)
        };

        let created = provider.save_model(ModelId::new(4), &model).await.unwrap();
        assert_eq!(created.layers[0].id, Some(1));

        let raised = GeotechnicalModel {
            npv: 3.5,
            ..created.clone()
        };
        provider.save_model(ModelId::new(4), &raised).await.unwrap();

        let stored = provider.fetch(ModelId::new(4)).await.unwrap();
        assert!((stored.npv - 3.5).abs() < f64::EPSILON);
        assert_eq!(stored.layers, created.layers);
    }
}

//! Mock soil layer provider for testing.

use super::{Shared, not_found};
use crate::providers::SoilLayerProvider;
use geotech_api::DomainError;
use geotech_api::models::{ProjectId, SoilLayer, SoilLayerId, SoilLayerPayload};
use std::collections::BTreeMap;
use std::future::{Future, ready};

#[derive(Debug, Default)]
struct Layers {
    records: BTreeMap<SoilLayerId, SoilLayer>,
    next_id: i64,
}

/// Mock soil layer provider.
///
/// Rejects layers whose bottom lies above their top, as the server does.
#[derive(Debug, Clone, Default)]
pub struct MockSoilLayerProvider {
    layers: Shared<Layers>,
}

impl MockSoilLayerProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: DomainError) {
        self.layers.fail_next(error);
    }

    /// Number of calls served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.layers.calls()
    }
}

fn invalid_depths() -> DomainError {
    DomainError::new("bottomDepth: Bottom depth must be greater than top depth.").with_status(400)
}

impl SoilLayerProvider for MockSoilLayerProvider {
    fn list(
        &self,
        project: ProjectId,
    ) -> impl Future<Output = Result<Vec<SoilLayer>, DomainError>> + Send {
        ready(self.layers.call(|layers| {
            Ok(layers
                .records
                .values()
                .filter(|layer| layer.project_id == project)
                .cloned()
                .collect())
        }))
    }

    fn create(
        &self,
        project: ProjectId,
        payload: &SoilLayerPayload,
    ) -> impl Future<Output = Result<SoilLayer, DomainError>> + Send {
        ready(self.layers.call(|layers| {
            if !payload.has_valid_depths() {
                return Err(invalid_depths());
            }
            layers.next_id += 1;
            let layer = payload
                .clone()
                .into_layer(SoilLayerId::new(layers.next_id), project);
            layers.records.insert(layer.id, layer.clone());
            Ok(layer)
        }))
    }

    fn update(
        &self,
        project: ProjectId,
        id: SoilLayerId,
        payload: &SoilLayerPayload,
    ) -> impl Future<Output = Result<SoilLayer, DomainError>> + Send {
        ready(self.layers.call(|layers| {
            let layer = layers
                .records
                .get_mut(&id)
                .filter(|layer| layer.project_id == project)
                .ok_or_else(not_found)?;

            let mut updated = layer.clone();
            payload.apply_to(&mut updated);
            if !updated.has_valid_depths() {
                return Err(invalid_depths());
            }
            *layer = updated.clone();
            Ok(updated)
        }))
    }

    fn delete(
        &self,
        project: ProjectId,
        id: SoilLayerId,
    ) -> impl Future<Output = Result<(), DomainError>> + Send {
        ready(self.layers.call(|layers| {
            match layers.records.get(&id) {
                Some(layer) if layer.project_id == project => {
                    layers.records.remove(&id);
                    Ok(())
                }
                _ => Err(not_found()),
            }
        }))
    }
}

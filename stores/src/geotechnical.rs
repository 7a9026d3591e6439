//! Geotechnical model store
//!
//! Working copy of one model: its layers, CPT sheets and groundwater levels,
//! edited locally and written back through the model endpoints. A read-through
//! cache of CPT readings keyed by model sits beside it; callers fill and clear
//! it explicitly and nothing is evicted.

use crate::error::Result;
use crate::providers::ModelProvider;
use crate::request::{RequestId, Terminal, await_outcome};
use geotech_api::DomainError;
use geotech_api::models::{CptReading, CptSheet, GeotechnicalModel, ModelId, ModelLayer, ProjectId};
use geotech_core::effect::Effect;
use geotech_core::reducer::Reducer;
use geotech_core::{SmallVec, smallvec};
use geotech_runtime::Store;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Groundwater levels of a model
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Groundwater {
    /// Groundwater level (m)
    pub npv: f64,
    /// Highest groundwater level (m)
    pub npv_max: f64,
}

/// Fields to merge into one layer; absent fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerPatch {
    /// Layer name
    pub name: Option<String>,
    /// Depth of the layer bottom (m)
    pub depth: Option<f64>,
    /// Unit weight (kN/m³)
    pub unit_weight: Option<f64>,
    /// Cohesion (kPa)
    pub cohesion: Option<f64>,
    /// Friction angle (°)
    pub friction_angle: Option<f64>,
    /// Compressibility
    pub compressibility: Option<f64>,
    /// Permeability
    pub permeability: Option<f64>,
    /// Name of the CPT sheet the layer was derived from
    pub cpt_data: Option<String>,
}

impl LayerPatch {
    /// Shallow-merge the present fields into `layer`
    pub fn apply_to(&self, layer: &mut ModelLayer) {
        if let Some(name) = &self.name {
            layer.name.clone_from(name);
        }
        if let Some(depth) = self.depth {
            layer.depth = depth;
        }
        if let Some(unit_weight) = self.unit_weight {
            layer.unit_weight = unit_weight;
        }
        if let Some(cohesion) = self.cohesion {
            layer.cohesion = cohesion;
        }
        if let Some(friction_angle) = self.friction_angle {
            layer.friction_angle = friction_angle;
        }
        if let Some(compressibility) = self.compressibility {
            layer.compressibility = compressibility;
        }
        if self.permeability.is_some() {
            layer.permeability = self.permeability;
        }
        if self.cpt_data.is_some() {
            layer.cpt_data.clone_from(&self.cpt_data);
        }
    }
}

/// State of the geotechnical store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeotechState {
    /// Project the working copy belongs to
    pub current_project_id: Option<ProjectId>,
    /// Name of the loaded model
    pub model_name: String,
    /// Layers, ordered by depth
    pub layers: Vec<ModelLayer>,
    /// CPT sheets
    pub cpt_sheets: Vec<CptSheet>,
    /// Groundwater levels
    pub groundwater: Groundwater,
    /// CPT readings cached per model
    pub cpt_cache: HashMap<ModelId, Vec<CptReading>>,
    /// A request is in flight
    pub loading: bool,
    /// Message of the last failed request
    pub error: Option<String>,
}

impl GeotechState {
    /// Cached readings of a model
    #[must_use]
    pub fn cached_cpt_data(&self, model: ModelId) -> Option<&[CptReading]> {
        self.cpt_cache.get(&model).map(Vec::as_slice)
    }

    /// The working copy as a model to be written back as `id`
    #[must_use]
    pub fn to_model(&self, id: ModelId) -> GeotechnicalModel {
        GeotechnicalModel {
            id,
            name: self.model_name.clone(),
            project: self.current_project_id,
            npv: self.groundwater.npv,
            npv_max: self.groundwater.npv_max,
            layers: self.layers.clone(),
            cpt_tests: self.cpt_sheets.clone(),
        }
    }

    fn apply_model(&mut self, model: GeotechnicalModel) {
        if model.project.is_some() {
            self.current_project_id = model.project;
        }
        self.model_name = model.name;
        self.layers = model.layers;
        self.cpt_sheets = model.cpt_tests;
        self.groundwater = Groundwater {
            npv: model.npv,
            npv_max: model.npv_max,
        };
    }
}

/// Actions of the geotechnical store
#[derive(Debug, Clone)]
pub enum GeotechAction {
    /// Select the project being modelled
    SetCurrentProject {
        /// The project, or none
        project: Option<ProjectId>,
    },
    /// Replace every layer
    UpdateLayers {
        /// New layers
        layers: Vec<ModelLayer>,
    },
    /// Merge fields into the layer at `index`; out of range does nothing
    UpdateLayer {
        /// Position in `layers`
        index: usize,
        /// Fields to merge
        patch: LayerPatch,
    },
    /// Replace every CPT sheet
    UpdateCptSheets {
        /// New sheets
        sheets: Vec<CptSheet>,
    },
    /// Replace the groundwater levels
    UpdateGroundwater {
        /// New levels
        groundwater: Groundwater,
    },
    /// Cache readings for a model
    CacheCptData {
        /// Owning model
        model: ModelId,
        /// Readings to keep
        readings: Vec<CptReading>,
    },
    /// Drop one model's cached readings, or all of them
    ClearCptCache {
        /// Model to drop, or `None` for everything
        model: Option<ModelId>,
    },

    /// Load a model into the working copy
    LoadModel {
        /// Correlation id
        request: RequestId,
        /// Model to load
        model: ModelId,
    },
    /// Write the working copy's layers to a model
    SaveLayers {
        /// Correlation id
        request: RequestId,
        /// Target model
        model: ModelId,
    },
    /// Write the whole working copy, groundwater included, to a model
    SaveModel {
        /// Correlation id
        request: RequestId,
        /// Target model
        model: ModelId,
    },
    /// Write the working copy's CPT sheets to a model
    SaveCpt {
        /// Correlation id
        request: RequestId,
        /// Target model
        model: ModelId,
    },

    /// Model loaded
    ModelLoaded {
        /// Correlation id
        request: RequestId,
        /// The model
        model: GeotechnicalModel,
    },
    /// Layers saved; the server's copy replaces the local one
    LayersSaved {
        /// Correlation id
        request: RequestId,
        /// The model as stored
        model: GeotechnicalModel,
    },
    /// Model saved; the server's copy replaces the working copy
    ModelSaved {
        /// Correlation id
        request: RequestId,
        /// The model as stored
        model: GeotechnicalModel,
    },
    /// CPT sheets saved; the server's copy replaces the local one
    CptSaved {
        /// Correlation id
        request: RequestId,
        /// The model as stored
        model: GeotechnicalModel,
    },
    /// A request failed
    RequestFailed {
        /// Correlation id
        request: RequestId,
        /// Normalized failure
        error: DomainError,
    },
}

impl Terminal for GeotechAction {
    fn completes(&self) -> Option<RequestId> {
        match self {
            Self::ModelLoaded { request, .. }
            | Self::LayersSaved { request, .. }
            | Self::ModelSaved { request, .. }
            | Self::CptSaved { request, .. }
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

/// Dependencies of the geotechnical store
#[derive(Debug, Clone)]
pub struct GeotechEnvironment<P> {
    /// Model provider
    pub models: P,
}

impl<P> GeotechEnvironment<P> {
    /// Create an environment
    pub const fn new(models: P) -> Self {
        Self { models }
    }
}

/// Reducer of the geotechnical store
#[derive(Debug, Clone, Copy, Default)]
pub struct GeotechReducer<P> {
    _provider: PhantomData<fn() -> P>,
}

impl<P> GeotechReducer<P> {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _provider: PhantomData,
        }
    }
}

impl<P> Reducer for GeotechReducer<P>
where
    P: ModelProvider + Clone + 'static,
{
    type State = GeotechState;
    type Action = GeotechAction;
    type Environment = GeotechEnvironment<P>;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            GeotechAction::SetCurrentProject { project } => {
                state.current_project_id = project;
                smallvec![Effect::None]
            }

            GeotechAction::UpdateLayers { layers } => {
                state.layers = layers;
                smallvec![Effect::None]
            }

            GeotechAction::UpdateLayer { index, patch } => {
                match state.layers.get_mut(index) {
                    Some(layer) => patch.apply_to(layer),
                    None => tracing::debug!(index, "Layer index out of range"),
                }
                smallvec![Effect::None]
            }

            GeotechAction::UpdateCptSheets { sheets } => {
                state.cpt_sheets = sheets;
                smallvec![Effect::None]
            }

            GeotechAction::UpdateGroundwater { groundwater } => {
                state.groundwater = groundwater;
                smallvec![Effect::None]
            }

            GeotechAction::CacheCptData { model, readings } => {
                state.cpt_cache.insert(model, readings);
                smallvec![Effect::None]
            }

            GeotechAction::ClearCptCache { model: Some(model) } => {
                state.cpt_cache.remove(&model);
                smallvec![Effect::None]
            }

            GeotechAction::ClearCptCache { model: None } => {
                state.cpt_cache.clear();
                smallvec![Effect::None]
            }

            GeotechAction::LoadModel { request, model } => {
                state.loading = true;
                state.error = None;
                let models = env.models.clone();
                smallvec![Effect::task(async move {
                    match models.fetch(model).await {
                        Ok(model) => GeotechAction::ModelLoaded { request, model },
                        Err(error) => GeotechAction::RequestFailed { request, error },
                    }
                })]
            }

            GeotechAction::SaveLayers { request, model } => {
                state.loading = true;
                state.error = None;
                let models = env.models.clone();
                let layers = state.layers.clone();
                smallvec![Effect::task(async move {
                    match models.save_layers(model, &layers).await {
                        Ok(model) => GeotechAction::LayersSaved { request, model },
                        Err(error) => GeotechAction::RequestFailed { request, error },
                    }
                })]
            }

            GeotechAction::SaveModel { request, model } => {
                state.loading = true;
                state.error = None;
                let models = env.models.clone();
                let working_copy = state.to_model(model);
                smallvec![Effect::task(async move {
                    match models.save_model(model, &working_copy).await {
                        Ok(model) => GeotechAction::ModelSaved { request, model },
                        Err(error) => GeotechAction::RequestFailed { request, error },
                    }
                })]
            }

            GeotechAction::SaveCpt { request, model } => {
                state.loading = true;
                state.error = None;
                let models = env.models.clone();
                let sheets = state.cpt_sheets.clone();
                smallvec![Effect::task(async move {
                    match models.save_cpt(model, &sheets).await {
                        Ok(model) => GeotechAction::CptSaved { request, model },
                        Err(error) => GeotechAction::RequestFailed { request, error },
                    }
                })]
            }

            GeotechAction::ModelLoaded { model, .. } => {
                state.loading = false;
                state.apply_model(model);
                smallvec![Effect::None]
            }

            GeotechAction::ModelSaved { model, .. } => {
                state.loading = false;
                state.apply_model(model);
                smallvec![Effect::None]
            }

            GeotechAction::LayersSaved { model, .. } => {
                state.loading = false;
                state.layers = model.layers;
                smallvec![Effect::None]
            }

            GeotechAction::CptSaved { model, .. } => {
                state.loading = false;
                state.cpt_sheets = model.cpt_tests;
                smallvec![Effect::None]
            }

            GeotechAction::RequestFailed { error, .. } => {
                tracing::warn!(error = %error, "Model request failed");
                state.loading = false;
                state.error = Some(error.message);
                smallvec![Effect::None]
            }
        }
    }
}

/// Store type behind [`GeotechnicalStore`]
pub type GeotechRuntime<P> =
    Store<GeotechState, GeotechAction, GeotechEnvironment<P>, GeotechReducer<P>>;

/// Geotechnical model store
pub struct GeotechnicalStore<P>
where
    P: ModelProvider + Clone + 'static,
{
    store: GeotechRuntime<P>,
}

impl<P> Clone for GeotechnicalStore<P>
where
    P: ModelProvider + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<P> GeotechnicalStore<P>
where
    P: ModelProvider + Clone + 'static,
{
    /// Create the store with an empty working copy
    #[must_use]
    pub fn new(env: GeotechEnvironment<P>) -> Self {
        Self {
            store: Store::new(GeotechState::default(), GeotechReducer::new(), env)
                .with_name("geotechnical"),
        }
    }

    async fn apply(&self, action: GeotechAction) -> Result<()> {
        self.store.send(action).await?;
        Ok(())
    }

    /// Select the project being modelled
    ///
    /// # Errors
    ///
    /// Returns an error if the store is shutting down.
    pub async fn set_current_project(&self, project: Option<ProjectId>) -> Result<()> {
        self.apply(GeotechAction::SetCurrentProject { project }).await
    }

    /// Replace every layer
    ///
    /// # Errors
    ///
    /// Returns an error if the store is shutting down.
    pub async fn update_layers(&self, layers: Vec<ModelLayer>) -> Result<()> {
        self.apply(GeotechAction::UpdateLayers { layers }).await
    }

    /// Merge `patch` into the layer at `index`; out of range does nothing
    ///
    /// # Errors
    ///
    /// Returns an error if the store is shutting down.
    pub async fn update_layer(&self, index: usize, patch: LayerPatch) -> Result<()> {
        self.apply(GeotechAction::UpdateLayer { index, patch }).await
    }

    /// Replace every CPT sheet
    ///
    /// # Errors
    ///
    /// Returns an error if the store is shutting down.
    pub async fn update_cpt_sheets(&self, sheets: Vec<CptSheet>) -> Result<()> {
        self.apply(GeotechAction::UpdateCptSheets { sheets }).await
    }

    /// Replace the groundwater levels
    ///
    /// # Errors
    ///
    /// Returns an error if the store is shutting down.
    pub async fn update_groundwater(&self, groundwater: Groundwater) -> Result<()> {
        self.apply(GeotechAction::UpdateGroundwater { groundwater }).await
    }

    /// Cache readings for a model, replacing any earlier entry
    ///
    /// # Errors
    ///
    /// Returns an error if the store is shutting down.
    pub async fn cache_cpt_data(&self, model: ModelId, readings: Vec<CptReading>) -> Result<()> {
        self.apply(GeotechAction::CacheCptData { model, readings }).await
    }

    /// Cached readings of a model
    pub async fn cached_cpt_data(&self, model: ModelId) -> Option<Vec<CptReading>> {
        self.store
            .state(|s| s.cached_cpt_data(model).map(<[CptReading]>::to_vec))
            .await
    }

    /// Drop one model's cached readings, or all of them
    ///
    /// # Errors
    ///
    /// Returns an error if the store is shutting down.
    pub async fn clear_cpt_cache(&self, model: Option<ModelId>) -> Result<()> {
        self.apply(GeotechAction::ClearCptCache { model }).await
    }

    /// Load a model into the working copy
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn load_model(&self, model: ModelId) -> Result<GeotechnicalModel> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            GeotechAction::LoadModel { request, model },
            request,
            |a| match a {
                GeotechAction::ModelLoaded { model, .. } => Some(model),
                _ => None,
            },
        )
        .await
    }

    /// Write the working copy's layers to `model`
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn save_layers(&self, model: ModelId) -> Result<Vec<ModelLayer>> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            GeotechAction::SaveLayers { request, model },
            request,
            |a| match a {
                GeotechAction::LayersSaved { model, .. } => Some(model.layers),
                _ => None,
            },
        )
        .await
    }

    /// Write the whole working copy to `model`, creating it when absent
    ///
    /// Unlike [`save_layers`](Self::save_layers) and
    /// [`save_cpt`](Self::save_cpt) this also stores the groundwater levels.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn save_model(&self, model: ModelId) -> Result<GeotechnicalModel> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            GeotechAction::SaveModel { request, model },
            request,
            |a| match a {
                GeotechAction::ModelSaved { model, .. } => Some(model),
                _ => None,
            },
        )
        .await
    }

    /// Write the working copy's CPT sheets to `model`
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn save_cpt(&self, model: ModelId) -> Result<Vec<CptSheet>> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            GeotechAction::SaveCpt { request, model },
            request,
            |a| match a {
                GeotechAction::CptSaved { model, .. } => Some(model.cpt_tests),
                _ => None,
            },
        )
        .await
    }

    /// Snapshot of the state
    pub async fn snapshot(&self) -> GeotechState {
        self.store.state(Clone::clone).await
    }

    /// The underlying store
    #[must_use]
    pub const fn runtime(&self) -> &GeotechRuntime<P> {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mocks::MockModelProvider;
    use crate::mocks::model::sample_model;
    use geotech_testing::{ReducerTest, assertions};

    fn env() -> GeotechEnvironment<MockModelProvider> {
        GeotechEnvironment::new(MockModelProvider::default())
    }

    fn two_layers() -> Vec<ModelLayer> {
        vec![ModelLayer::new("Fill", 2.5), ModelLayer::new("Clay", 5.0)]
    }

    #[test]
    fn test_update_layer_merges_only_given_fields() {
        ReducerTest::new(GeotechReducer::new())
            .with_env(env())
            .given_state(GeotechState {
                layers: two_layers(),
                ..GeotechState::default()
            })
            .when_action(GeotechAction::UpdateLayer {
                index: 1,
                patch: LayerPatch {
                    cohesion: Some(12.0),
                    ..LayerPatch::default()
                },
            })
            .then_state(|state| {
                let clay = &state.layers[1];
                assert!((clay.cohesion - 12.0).abs() < f64::EPSILON);
                assert_eq!(clay.name, "Clay");
                assert!((clay.depth - 5.0).abs() < f64::EPSILON);
                assert_eq!(state.layers[0], ModelLayer::new("Fill", 2.5));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_update_layer_out_of_range_is_noop() {
        ReducerTest::new(GeotechReducer::new())
            .with_env(env())
            .given_state(GeotechState {
                layers: two_layers(),
                ..GeotechState::default()
            })
            .when_action(GeotechAction::UpdateLayer {
                index: 7,
                patch: LayerPatch {
                    name: Some("Sand".to_string()),
                    ..LayerPatch::default()
                },
            })
            .then_state(|state| assert_eq!(state.layers, two_layers()))
            .run();
    }

    #[test]
    fn test_cache_set_get_and_clear() {
        let readings = vec![CptReading::new(0.0, 1.0, 0.1, 50.0)];
        let expected = readings.clone();

        ReducerTest::new(GeotechReducer::new())
            .with_env(env())
            .given_state(GeotechState::default())
            .when_action(GeotechAction::CacheCptData {
                model: ModelId::new(1),
                readings: readings.clone(),
            })
            .when_action(GeotechAction::CacheCptData {
                model: ModelId::new(2),
                readings,
            })
            .when_action(GeotechAction::ClearCptCache {
                model: Some(ModelId::new(1)),
            })
            .then_state(move |state| {
                assert!(state.cached_cpt_data(ModelId::new(1)).is_none());
                assert_eq!(state.cached_cpt_data(ModelId::new(2)), Some(&expected[..]));
            })
            .run();
    }

    #[test]
    fn test_clear_without_model_empties_cache() {
        ReducerTest::new(GeotechReducer::new())
            .with_env(env())
            .given_state(GeotechState {
                cpt_cache: HashMap::from([
                    (ModelId::new(1), Vec::new()),
                    (ModelId::new(2), Vec::new()),
                ]),
                ..GeotechState::default()
            })
            .when_action(GeotechAction::ClearCptCache { model: None })
            .then_state(|state| assert!(state.cpt_cache.is_empty()))
            .run();
    }

    #[test]
    fn test_model_loaded_replaces_working_copy() {
        let model = GeotechnicalModel {
            project: Some(ProjectId::new(3)),
            npv: 1.5,
            npv_max: 0.5,
            layers: two_layers(),
            ..sample_model(9)
        };

        ReducerTest::new(GeotechReducer::new())
            .with_env(env())
            .given_state(GeotechState {
                loading: true,
                ..GeotechState::default()
            })
            .when_action(GeotechAction::ModelLoaded {
                request: RequestId::next(),
                model,
            })
            .then_state(|state| {
                assert!(!state.loading);
                assert_eq!(state.current_project_id, Some(ProjectId::new(3)));
                assert_eq!(state.layers.len(), 2);
                assert_eq!(
                    state.groundwater,
                    Groundwater {
                        npv: 1.5,
                        npv_max: 0.5
                    }
                );
            })
            .run();
    }

    #[tokio::test]
    async fn test_save_layers_posts_working_copy() {
        let store = GeotechnicalStore::new(GeotechEnvironment::new(MockModelProvider::with_models([
            sample_model(1),
        ])));

        store.update_layers(two_layers()).await.unwrap();
        let saved = store.save_layers(ModelId::new(1)).await.unwrap();

        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|layer| layer.id.is_some()));
        assert_eq!(store.snapshot().await.layers, saved);
    }

    #[test]
    fn test_save_model_sends_groundwater() {
        let provider = MockModelProvider::with_models([sample_model(2)]);

        ReducerTest::new(GeotechReducer::new())
            .with_env(GeotechEnvironment::new(provider))
            .given_state(GeotechState {
                layers: two_layers(),
                ..GeotechState::default()
            })
            .when_action(GeotechAction::UpdateGroundwater {
                groundwater: Groundwater {
                    npv: 1.2,
                    npv_max: 0.4,
                },
            })
            .when_action(GeotechAction::SaveModel {
                request: RequestId::next(),
                model: ModelId::new(2),
            })
            .then_state(|state| assert!(state.loading))
            .then_actions(|actions| {
                let [GeotechAction::ModelSaved { model, .. }] = actions else {
                    panic!("expected ModelSaved, got {actions:?}");
                };
                assert!((model.npv - 1.2).abs() < f64::EPSILON);
                assert!((model.npv_max - 0.4).abs() < f64::EPSILON);
                assert_eq!(model.layers.len(), 2);
            })
            .run();
    }

    #[tokio::test]
    async fn test_save_model_round_trips_groundwater() {
        let provider = MockModelProvider::with_models([sample_model(6)]);
        let store = GeotechnicalStore::new(GeotechEnvironment::new(provider.clone()));
        store.load_model(ModelId::new(6)).await.unwrap();

        store.update_layers(two_layers()).await.unwrap();
        store
            .update_groundwater(Groundwater {
                npv: 2.5,
                npv_max: 1.0,
            })
            .await
            .unwrap();
        let saved = store.save_model(ModelId::new(6)).await.unwrap();

        assert_eq!(saved.name, "Model 6");
        assert!(saved.layers.iter().all(|layer| layer.id.is_some()));
        let stored = provider.fetch(ModelId::new(6)).await.unwrap();
        assert!((stored.npv - 2.5).abs() < f64::EPSILON);
        assert!((stored.npv_max - 1.0).abs() < f64::EPSILON);
        assert_eq!(store.snapshot().await.layers, saved.layers);
    }

    #[tokio::test]
    async fn test_load_missing_model_sets_error() {
        let store = GeotechnicalStore::new(env());

        let error = store.load_model(ModelId::new(42)).await.unwrap_err();

        assert_eq!(error.status(), Some(404));
        let state = store.snapshot().await;
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("Not found."));
    }

    #[test]
    fn test_layer_patch_from_partial_json() {
        let patch: LayerPatch = serde_json::from_str(r#"{"friction_angle": 30.0}"#).unwrap();
        assert_eq!(patch.friction_angle, Some(30.0));
        assert!(patch.name.is_none());
    }
}

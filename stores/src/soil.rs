//! Soil layer store

use crate::error::Result;
use crate::providers::SoilLayerProvider;
use crate::request::{RequestId, Terminal, await_outcome};
use geotech_api::DomainError;
use geotech_api::models::{ProjectId, SoilLayer, SoilLayerId, SoilLayerPayload};
use geotech_core::effect::Effect;
use geotech_core::reducer::Reducer;
use geotech_core::{SmallVec, smallvec};
use geotech_runtime::Store;
use std::marker::PhantomData;

/// State of the soil layer store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoilState {
    /// Layers of the last fetched project, plus local additions
    pub layers: Vec<SoilLayer>,
    /// A request is in flight
    pub loading: bool,
    /// Message of the last failed request
    pub error: Option<String>,
}

impl SoilState {
    /// Layers belonging to `project`
    #[must_use]
    pub fn layers_by_project(&self, project: ProjectId) -> Vec<&SoilLayer> {
        self.layers
            .iter()
            .filter(|layer| layer.project_id == project)
            .collect()
    }

    /// Find a layer by id
    #[must_use]
    pub fn layer_by_id(&self, id: SoilLayerId) -> Option<&SoilLayer> {
        self.layers.iter().find(|layer| layer.id == id)
    }
}

/// Thickness of a layer, when both boundaries are known
#[must_use]
pub fn calculate_layer_thickness(layer: &SoilLayer) -> Option<f64> {
    layer.thickness()
}

/// Whether a layer's bottom lies below its top; incomplete layers pass
#[must_use]
pub fn validate_layer_depths(layer: &SoilLayer) -> bool {
    layer.has_valid_depths()
}

/// Actions of the soil layer store
#[derive(Debug, Clone)]
pub enum SoilAction {
    /// Load the layers of a project, replacing the collection
    FetchLayers {
        /// Correlation id
        request: RequestId,
        /// Owning project
        project: ProjectId,
    },
    /// Create a layer
    CreateLayer {
        /// Correlation id
        request: RequestId,
        /// Owning project
        project: ProjectId,
        /// Layer fields
        payload: SoilLayerPayload,
    },
    /// Update a layer
    UpdateLayer {
        /// Correlation id
        request: RequestId,
        /// Owning project
        project: ProjectId,
        /// Layer to update
        id: SoilLayerId,
        /// Changed fields
        payload: SoilLayerPayload,
    },
    /// Delete a layer
    DeleteLayer {
        /// Correlation id
        request: RequestId,
        /// Owning project
        project: ProjectId,
        /// Layer to delete
        id: SoilLayerId,
    },

    /// Layers loaded
    LayersLoaded {
        /// Correlation id
        request: RequestId,
        /// The full collection
        layers: Vec<SoilLayer>,
    },
    /// Layer created
    LayerCreated {
        /// Correlation id
        request: RequestId,
        /// The layer as stored
        layer: SoilLayer,
    },
    /// Layer updated
    LayerUpdated {
        /// Correlation id
        request: RequestId,
        /// The layer as stored
        layer: SoilLayer,
    },
    /// Layer deleted
    LayerDeleted {
        /// Correlation id
        request: RequestId,
        /// The deleted layer
        id: SoilLayerId,
    },
    /// A request failed
    RequestFailed {
        /// Correlation id
        request: RequestId,
        /// Normalized failure
        error: DomainError,
    },
}

impl Terminal for SoilAction {
    fn completes(&self) -> Option<RequestId> {
        match self {
            Self::LayersLoaded { request, .. }
            | Self::LayerCreated { request, .. }
            | Self::LayerUpdated { request, .. }
            | Self::LayerDeleted { request, .. }
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

/// Dependencies of the soil layer store
#[derive(Debug, Clone)]
pub struct SoilEnvironment<P> {
    /// Soil layer provider
    pub layers: P,
}

impl<P> SoilEnvironment<P> {
    /// Create an environment
    pub const fn new(layers: P) -> Self {
        Self { layers }
    }
}

/// Reducer of the soil layer store
#[derive(Debug, Clone, Copy, Default)]
pub struct SoilReducer<P> {
    _provider: PhantomData<fn() -> P>,
}

impl<P> SoilReducer<P> {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _provider: PhantomData,
        }
    }
}

impl<P> Reducer for SoilReducer<P>
where
    P: SoilLayerProvider + Clone + 'static,
{
    type State = SoilState;
    type Action = SoilAction;
    type Environment = SoilEnvironment<P>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let layers = env.layers.clone();
        match action {
            SoilAction::FetchLayers { request, project } => {
                state.loading = true;
                state.error = None;
                smallvec![Effect::task(async move {
                    match layers.list(project).await {
                        Ok(layers) => SoilAction::LayersLoaded { request, layers },
                        Err(error) => SoilAction::RequestFailed { request, error },
                    }
                })]
            }

            SoilAction::CreateLayer {
                request,
                project,
                payload,
            } => {
                state.loading = true;
                state.error = None;
                smallvec![Effect::task(async move {
                    match layers.create(project, &payload).await {
                        Ok(layer) => SoilAction::LayerCreated { request, layer },
                        Err(error) => SoilAction::RequestFailed { request, error },
                    }
                })]
            }

            SoilAction::UpdateLayer {
                request,
                project,
                id,
                payload,
            } => {
                state.loading = true;
                state.error = None;
                smallvec![Effect::task(async move {
                    match layers.update(project, id, &payload).await {
                        Ok(layer) => SoilAction::LayerUpdated { request, layer },
                        Err(error) => SoilAction::RequestFailed { request, error },
                    }
                })]
            }

            SoilAction::DeleteLayer {
                request,
                project,
                id,
            } => {
                state.loading = true;
                state.error = None;
                smallvec![Effect::task(async move {
                    match layers.delete(project, id).await {
                        Ok(()) => SoilAction::LayerDeleted { request, id },
                        Err(error) => SoilAction::RequestFailed { request, error },
                    }
                })]
            }

            SoilAction::LayersLoaded { layers, .. } => {
                state.loading = false;
                state.layers = layers;
                smallvec![Effect::None]
            }

            SoilAction::LayerCreated { layer, .. } => {
                state.loading = false;
                state.layers.push(layer);
                smallvec![Effect::None]
            }

            SoilAction::LayerUpdated { layer, .. } => {
                state.loading = false;
                if let Some(slot) = state.layers.iter_mut().find(|l| l.id == layer.id) {
                    *slot = layer;
                }
                smallvec![Effect::None]
            }

            SoilAction::LayerDeleted { id, .. } => {
                state.loading = false;
                state.layers.retain(|l| l.id != id);
                smallvec![Effect::None]
            }

            SoilAction::RequestFailed { error, .. } => {
                tracing::warn!(error = %error, "Soil layer request failed");
                state.loading = false;
                state.error = Some(error.message);
                smallvec![Effect::None]
            }
        }
    }
}

/// Store type behind [`SoilStore`]
pub type SoilRuntime<P> = Store<SoilState, SoilAction, SoilEnvironment<P>, SoilReducer<P>>;

/// Soil layer store
pub struct SoilStore<P>
where
    P: SoilLayerProvider + Clone + 'static,
{
    store: SoilRuntime<P>,
}

impl<P> Clone for SoilStore<P>
where
    P: SoilLayerProvider + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<P> SoilStore<P>
where
    P: SoilLayerProvider + Clone + 'static,
{
    /// Create the store
    #[must_use]
    pub fn new(env: SoilEnvironment<P>) -> Self {
        Self {
            store: Store::new(SoilState::default(), SoilReducer::new(), env).with_name("soil"),
        }
    }

    /// Load the layers of a project, replacing the collection
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn fetch_layers(&self, project: ProjectId) -> Result<Vec<SoilLayer>> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            SoilAction::FetchLayers { request, project },
            request,
            |a| match a {
                SoilAction::LayersLoaded { layers, .. } => Some(layers),
                _ => None,
            },
        )
        .await
    }

    /// Create a layer and append it
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn create_layer(
        &self,
        project: ProjectId,
        payload: SoilLayerPayload,
    ) -> Result<SoilLayer> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            SoilAction::CreateLayer {
                request,
                project,
                payload,
            },
            request,
            |a| match a {
                SoilAction::LayerCreated { layer, .. } => Some(layer),
                _ => None,
            },
        )
        .await
    }

    /// Update a layer in place
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn update_layer(
        &self,
        project: ProjectId,
        id: SoilLayerId,
        payload: SoilLayerPayload,
    ) -> Result<SoilLayer> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            SoilAction::UpdateLayer {
                request,
                project,
                id,
                payload,
            },
            request,
            |a| match a {
                SoilAction::LayerUpdated { layer, .. } => Some(layer),
                _ => None,
            },
        )
        .await
    }

    /// Delete a layer
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; it is also stored in `error`.
    pub async fn delete_layer(&self, project: ProjectId, id: SoilLayerId) -> Result<()> {
        let request = RequestId::next();
        await_outcome(
            &self.store,
            SoilAction::DeleteLayer {
                request,
                project,
                id,
            },
            request,
            |a| matches!(a, SoilAction::LayerDeleted { .. }).then_some(()),
        )
        .await
    }

    /// Layers belonging to `project`
    pub async fn layers_by_project(&self, project: ProjectId) -> Vec<SoilLayer> {
        self.store
            .state(|s| s.layers_by_project(project).into_iter().cloned().collect())
            .await
    }

    /// Find a layer by id
    pub async fn layer_by_id(&self, id: SoilLayerId) -> Option<SoilLayer> {
        self.store.state(|s| s.layer_by_id(id).cloned()).await
    }

    /// Snapshot of the state
    pub async fn snapshot(&self) -> SoilState {
        self.store.state(Clone::clone).await
    }

    /// The underlying store
    #[must_use]
    pub const fn runtime(&self) -> &SoilRuntime<P> {
        &self.store
    }
}

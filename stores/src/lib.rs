//! # Geotech Stores
//!
//! Client-side state for the geotech application: one store per domain,
//! each a reducer running on a [`geotech_runtime::Store`].
//!
//! | Store | Holds | Provider |
//! |-------|-------|----------|
//! | [`AuthStore`] | session mirror | [`AuthProvider`] |
//! | [`ProjectStore`] | projects, current project, statistics | [`ProjectProvider`] |
//! | [`SoilStore`] | soil layers | [`SoilLayerProvider`] |
//! | [`CptStore`] | CPT tests | [`CptProvider`] |
//! | [`GeotechnicalStore`] | model working copy, CPT cache | [`ModelProvider`] |
//!
//! Every remote action follows the same contract: `loading` goes up and
//! `error` is cleared, the provider is called from an effect, and the result
//! action either updates the collection or records the failure message.
//! `loading` always comes back down. Facade methods await the result action
//! carrying their own [`RequestId`] and return the failure as well.
//!
//! ## Example
//!
//! ```
//! use geotech_stores::mocks::MockProjectProvider;
//! use geotech_stores::{ProjectEnvironment, ProjectStore};
//! use geotech_api::models::ProjectPayload;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), geotech_stores::StoreActionError> {
//! let store = ProjectStore::new(ProjectEnvironment::new(MockProjectProvider::new()));
//!
//! let created = store.create_project(ProjectPayload::named("Harbour wall")).await?;
//! assert_eq!(store.project_by_id(created.id).await, Some(created));
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cpt;
pub mod error;
pub mod geotechnical;
pub mod projects;
pub mod providers;
pub mod request;
pub mod soil;

#[cfg(feature = "test-utils")]
pub mod mocks;

pub use auth::{AuthAction, AuthEnvironment, AuthReducer, AuthState, AuthStore};
pub use cpt::{CptAction, CptEnvironment, CptReducer, CptState, CptStore};
pub use error::{Result, StoreActionError};
pub use geotechnical::{
    GeotechAction, GeotechEnvironment, GeotechReducer, GeotechState, GeotechnicalStore,
    Groundwater, LayerPatch,
};
pub use projects::{ProjectAction, ProjectEnvironment, ProjectReducer, ProjectState, ProjectStore};
pub use providers::{AuthProvider, CptProvider, ModelProvider, ProjectProvider, SoilLayerProvider};
pub use request::{RequestId, Terminal};
pub use soil::{SoilAction, SoilEnvironment, SoilReducer, SoilState, SoilStore};

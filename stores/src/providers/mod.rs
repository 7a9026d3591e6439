//! Provider traits the stores depend on
//!
//! Reducers only talk to these traits. The `geotech-api` services implement
//! them for production; the in-memory versions in `geotech_stores::mocks`
//! (feature `test-utils`) implement them for tests.

pub mod auth;
pub mod cpt;
pub mod model;
pub mod projects;
pub mod soil;

pub use auth::AuthProvider;
pub use cpt::CptProvider;
pub use model::ModelProvider;
pub use projects::ProjectProvider;
pub use soil::SoilLayerProvider;

//! Resource services
//!
//! One method per API operation. Services are the single place transport
//! failures become [`DomainError`]s: the server's message when the error
//! body has one, the operation's default message otherwise.

mod auth;
mod cpt;
mod model;
mod projects;
mod soil;

pub use auth::AuthService;
pub use cpt::CptService;
pub use model::ModelService;
pub use projects::ProjectService;
pub use soil::SoilLayerService;

use crate::error::{DomainError, TransportError};

/// Normalize a transport result with an operation's default message
trait Normalize<T> {
    fn normalize(self, default_message: &str) -> Result<T, DomainError>;
}

impl<T> Normalize<T> for Result<T, TransportError> {
    fn normalize(self, default_message: &str) -> Result<T, DomainError> {
        self.map_err(|error| {
            let normalized = DomainError::from_transport(&error, default_message);
            tracing::debug!(
                status = ?normalized.status,
                message = %normalized.message,
                transport = %error,
                "Service call failed: {}",
                default_message
            );
            normalized
        })
    }
}

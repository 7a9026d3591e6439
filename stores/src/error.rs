//! Errors returned by store facades

use geotech_api::DomainError;
use geotech_runtime::StoreError;
use thiserror::Error;

/// Why a store action did not complete
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreActionError {
    /// The API call failed; the message is also in the store's `error`
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store itself could not run the action
    #[error("Store unavailable: {0}")]
    Runtime(#[from] StoreError),
}

impl StoreActionError {
    /// User-facing message
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Domain(error) => error.message.clone(),
            Self::Runtime(error) => error.to_string(),
        }
    }

    /// The API failure, if that is what happened
    #[must_use]
    pub const fn domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(error) => Some(error),
            Self::Runtime(_) => None,
        }
    }

    /// HTTP status behind the failure
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Domain(error) => error.status,
            Self::Runtime(_) => None,
        }
    }
}

/// Result type for store facades
pub type Result<T> = std::result::Result<T, StoreActionError>;

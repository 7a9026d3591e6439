//! # Geotech API
//!
//! Client side of the geotech REST API: an HTTP client adapter, the
//! credential interceptor that wraps every request, and one resource service
//! per server resource.
//!
//! ## Layers
//!
//! - [`HttpClient`]: joins paths onto the base URL, sends JSON, multipart and
//!   binary requests, and reports failures as [`TransportError`]
//! - [`Interceptor`]: CSRF and token headers on the way out; on a 401 it
//!   clears the [`SessionContext`] and navigates to [`Route::Login`]
//! - [`services`]: one method per operation, the only place a
//!   [`TransportError`] becomes a user-facing [`DomainError`]
//!
//! ## Example
//!
//! ```no_run
//! use geotech_api::{ApiConfig, GeotechApi};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = GeotechApi::builder(ApiConfig::from_env()).build()?;
//!
//! api.auth.login("test@example.com", "password123").await?;
//! let projects = api.projects.list().await?;
//! println!("{} projects", projects.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod interceptor;
pub mod models;
pub mod navigation;
pub mod services;
pub mod session;
pub mod storage;

pub use client::{Download, HttpClient};
pub use config::ApiConfig;
pub use download::{DirectorySink, DownloadSink, MemorySink};
pub use error::{DomainError, StorageError, TransportError};
pub use interceptor::Interceptor;
pub use navigation::{Navigator, NoopNavigator, RecordingNavigator, Route};
pub use services::{AuthService, CptService, ModelService, ProjectService, SoilLayerService};
pub use session::{Session, SessionContext, UserId};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};

use geotech_core::environment::{Clock, SystemClock};
use std::sync::Arc;

/// Every service wired to one shared client and session
#[derive(Debug, Clone)]
pub struct GeotechApi {
    /// Session shared by all services
    pub session: SessionContext,
    /// Authentication
    pub auth: AuthService,
    /// Projects
    pub projects: ProjectService,
    /// Soil layers
    pub soil_layers: SoilLayerService,
    /// CPT tests
    pub cpt: CptService,
    /// Geotechnical models
    pub models: ModelService,
}

impl GeotechApi {
    /// Start building the API from a configuration
    #[must_use]
    pub fn builder(config: ApiConfig) -> GeotechApiBuilder {
        GeotechApiBuilder::new(config)
    }
}

/// Builder for [`GeotechApi`]
///
/// Defaults: in-memory session storage, a logging navigator, downloads into
/// the current directory, and the system clock.
pub struct GeotechApiBuilder {
    config: ApiConfig,
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
    downloads: Arc<dyn DownloadSink>,
    clock: Arc<dyn Clock>,
}

impl GeotechApiBuilder {
    fn new(config: ApiConfig) -> Self {
        Self {
            config,
            storage: Arc::new(MemoryStorage::new()),
            navigator: Arc::new(NoopNavigator),
            downloads: Arc::new(DirectorySink::new(".")),
            clock: Arc::new(SystemClock),
        }
    }

    /// Where the session is persisted
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = storage;
        self
    }

    /// Who receives navigation requests
    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Where exported files are saved
    #[must_use]
    pub fn downloads(mut self, downloads: Arc<dyn DownloadSink>) -> Self {
        self.downloads = downloads;
        self
    }

    /// Clock used to expire the persisted session
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Hydrate the session and build the services
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the HTTP client cannot be created.
    pub fn build(self) -> Result<GeotechApi, TransportError> {
        let session = SessionContext::hydrate(
            self.storage,
            self.config.session_key.clone(),
            self.clock.as_ref(),
        );
        let client = HttpClient::new(&self.config, session.clone(), self.navigator)?;

        tracing::debug!(
            base_url = %client.base_url(),
            authenticated = session.is_authenticated(),
            "API client ready"
        );

        Ok(GeotechApi {
            session,
            auth: AuthService::new(client.clone()),
            projects: ProjectService::new(client.clone()),
            soil_layers: SoilLayerService::new(client.clone()),
            cpt: CptService::new(client.clone(), self.downloads),
            models: ModelService::new(client),
        })
    }
}

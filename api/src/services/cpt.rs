//! CPT test endpoints

use super::Normalize;
use crate::client::HttpClient;
use crate::download::DownloadSink;
use crate::error::DomainError;
use crate::models::{CptTest, CptTestId, CptTestPayload, CptUpload, ProjectId};
use reqwest::multipart::{Form, Part};
use std::sync::Arc;

/// CRUD, import and export for the CPT tests of a project
#[derive(Clone)]
pub struct CptService {
    client: HttpClient,
    downloads: Arc<dyn DownloadSink>,
}

impl CptService {
    /// Create the service; exports are written to `downloads`
    #[must_use]
    pub fn new(client: HttpClient, downloads: Arc<dyn DownloadSink>) -> Self {
        Self { client, downloads }
    }

    /// Tests of a project
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn list(&self, project: ProjectId) -> Result<Vec<CptTest>, DomainError> {
        self.client
            .get_json(&collection(project))
            .await
            .normalize("Failed to fetch CPT tests")
    }

    /// One test
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn get(&self, project: ProjectId, id: CptTestId) -> Result<CptTest, DomainError> {
        self.client
            .get_json(&member(project, id))
            .await
            .normalize("Failed to fetch CPT test")
    }

    /// Add a test to a project
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn create(
        &self,
        project: ProjectId,
        payload: &CptTestPayload,
    ) -> Result<CptTest, DomainError> {
        self.client
            .post_json(&collection(project), payload)
            .await
            .normalize("Failed to create CPT test")
    }

    /// Update a test
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn update(
        &self,
        project: ProjectId,
        id: CptTestId,
        payload: &CptTestPayload,
    ) -> Result<CptTest, DomainError> {
        self.client
            .put_json(&member(project, id), payload)
            .await
            .normalize("Failed to update CPT test")
    }

    /// Delete a test
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn delete(&self, project: ProjectId, id: CptTestId) -> Result<(), DomainError> {
        self.client
            .delete(&member(project, id))
            .await
            .normalize("Failed to delete CPT test")
    }

    /// Upload a data file into a test; returns the test as stored
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    #[tracing::instrument(
        skip(self, upload),
        fields(file = %upload.file_name, size = upload.bytes.len())
    )]
    pub async fn import(
        &self,
        project: ProjectId,
        id: CptTestId,
        upload: CptUpload,
    ) -> Result<CptTest, DomainError> {
        let mime = upload.mime_type();
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(mime)
            .map_err(|e| DomainError::new(format!("Failed to import CPT data: {e}")))?;

        let form = Form::new().part("file", part);
        self.client
            .post_multipart(&format!("{}import/", member(project, id)), form)
            .await
            .normalize("Failed to import CPT data")
    }

    /// Download a test's data and save it as `cpt-test-<id>.csv`
    ///
    /// The sink runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails or the file cannot be saved.
    #[tracing::instrument(skip(self))]
    pub async fn export(&self, project: ProjectId, id: CptTestId) -> Result<(), DomainError> {
        let download = self
            .client
            .get_bytes(&format!("{}export/", member(project, id)))
            .await
            .normalize("Failed to export CPT data")?;

        let file_name = format!("cpt-test-{id}.csv");
        let sink = Arc::clone(&self.downloads);
        let name = file_name.clone();
        let saved = tokio::task::spawn_blocking(move || sink.save(&name, &download.bytes)).await;

        match saved {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => {
                tracing::warn!(error = %error, file = %file_name, "Failed to save export");
                Err(DomainError::new("Failed to export CPT data"))
            }
            Err(error) => {
                tracing::warn!(error = %error, file = %file_name, "Export writer task failed");
                Err(DomainError::new("Failed to export CPT data"))
            }
        }
    }
}

impl std::fmt::Debug for CptService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CptService")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

fn collection(project: ProjectId) -> String {
    format!("/projects/{project}/cpt-tests/")
}

fn member(project: ProjectId, id: CptTestId) -> String {
    format!("/projects/{project}/cpt-tests/{id}/")
}

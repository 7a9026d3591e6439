//! Project endpoints

use super::Normalize;
use crate::client::HttpClient;
use crate::error::DomainError;
use crate::models::{Project, ProjectId, ProjectPayload, ProjectStats};

/// CRUD and statistics for projects
#[derive(Debug, Clone)]
pub struct ProjectService {
    client: HttpClient,
}

impl ProjectService {
    /// Create the service
    #[must_use]
    pub const fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// All projects of the signed-in user
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn list(&self) -> Result<Vec<Project>, DomainError> {
        self.client
            .get_json("/projects/")
            .await
            .normalize("Failed to fetch projects")
    }

    /// One project
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn get(&self, id: ProjectId) -> Result<Project, DomainError> {
        self.client
            .get_json(&format!("/projects/{id}/"))
            .await
            .normalize("Failed to fetch project")
    }

    /// Create a project
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn create(&self, payload: &ProjectPayload) -> Result<Project, DomainError> {
        self.client
            .post_json("/projects/", payload)
            .await
            .normalize("Failed to create project")
    }

    /// Update a project with the fields present in `payload`
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn update(
        &self,
        id: ProjectId,
        payload: &ProjectPayload,
    ) -> Result<Project, DomainError> {
        self.client
            .put_json(&format!("/projects/{id}/"), payload)
            .await
            .normalize("Failed to update project")
    }

    /// Delete a project
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn delete(&self, id: ProjectId) -> Result<(), DomainError> {
        self.client
            .delete(&format!("/projects/{id}/"))
            .await
            .normalize("Failed to delete project")
    }

    /// Statistics for one project, or across all projects
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if the request fails.
    pub async fn stats(&self, id: Option<ProjectId>) -> Result<ProjectStats, DomainError> {
        let path = id.map_or_else(|| "/stats/".to_string(), |id| format!("/projects/{id}/stats/"));
        self.client
            .get_json(&path)
            .await
            .normalize("Failed to fetch project statistics")
    }
}

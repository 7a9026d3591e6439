//! Mock project provider for testing.

use super::{Shared, not_found, timestamp};
use crate::providers::ProjectProvider;
use geotech_api::DomainError;
use geotech_api::models::{Project, ProjectId, ProjectPayload, ProjectStats, ProjectStatus};
use std::collections::BTreeMap;
use std::future::{Future, ready};

#[derive(Debug, Default)]
struct Projects {
    records: BTreeMap<ProjectId, Project>,
    next_id: i64,
    tick: i64,
}

impl Projects {
    fn touch(&mut self) -> chrono::DateTime<chrono::Utc> {
        self.tick += 1;
        timestamp(self.tick)
    }
}

/// A project as the server would return it.
#[must_use]
pub fn sample_project(id: i64, name: &str) -> Project {
    Project {
        id: ProjectId::new(id),
        name: name.to_string(),
        description: None,
        location: None,
        client: None,
        status: ProjectStatus::Active,
        start_date: None,
        end_date: None,
        created_at: Some(timestamp(0)),
        updated_at: Some(timestamp(0)),
        models_count: 0,
        cpt_tests_count: 0,
        layers_count: 0,
    }
}

/// Mock project provider.
///
/// Keeps projects in memory and stamps `updated_at` from a counter, so
/// later writes always sort as more recent.
#[derive(Debug, Clone, Default)]
pub struct MockProjectProvider {
    projects: Shared<Projects>,
}

impl MockProjectProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider holding `projects`.
    #[must_use]
    pub fn with_projects(projects: impl IntoIterator<Item = Project>) -> Self {
        let records: BTreeMap<_, _> = projects.into_iter().map(|p| (p.id, p)).collect();
        let next_id = records.keys().map(|id| id.get()).max().unwrap_or(0);
        Self {
            projects: Shared::new(Projects {
                records,
                next_id,
                tick: 0,
            }),
        }
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: DomainError) {
        self.projects.fail_next(error);
    }

    /// Number of calls served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.projects.calls()
    }
}

impl ProjectProvider for MockProjectProvider {
    fn list(&self) -> impl Future<Output = Result<Vec<Project>, DomainError>> + Send {
        ready(
            self.projects
                .call(|projects| Ok(projects.records.values().cloned().collect())),
        )
    }

    fn get(&self, id: ProjectId) -> impl Future<Output = Result<Project, DomainError>> + Send {
        ready(
            self.projects
                .call(|projects| projects.records.get(&id).cloned().ok_or_else(not_found)),
        )
    }

    fn create(
        &self,
        payload: &ProjectPayload,
    ) -> impl Future<Output = Result<Project, DomainError>> + Send {
        ready(self.projects.call(|projects| {
            let name = payload
                .name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| {
                    DomainError::new("name: This field is required.").with_status(400)
                })?;

            projects.next_id += 1;
            let now = projects.touch();
            let mut project = sample_project(projects.next_id, &name);
            payload.apply_to(&mut project);
            project.created_at = Some(now);
            project.updated_at = Some(now);

            projects.records.insert(project.id, project.clone());
            Ok(project)
        }))
    }

    fn update(
        &self,
        id: ProjectId,
        payload: &ProjectPayload,
    ) -> impl Future<Output = Result<Project, DomainError>> + Send {
        ready(self.projects.call(|projects| {
            let now = projects.touch();
            let project = projects.records.get_mut(&id).ok_or_else(not_found)?;
            payload.apply_to(project);
            project.updated_at = Some(now);
            Ok(project.clone())
        }))
    }

    fn delete(&self, id: ProjectId) -> impl Future<Output = Result<(), DomainError>> + Send {
        ready(self.projects.call(|projects| {
            projects
                .records
                .remove(&id)
                .map(|_| ())
                .ok_or_else(not_found)
        }))
    }

    fn stats(
        &self,
        id: Option<ProjectId>,
    ) -> impl Future<Output = Result<ProjectStats, DomainError>> + Send {
        ready(self.projects.call(|projects| match id {
            Some(id) => {
                let project = projects.records.get(&id).ok_or_else(not_found)?;
                Ok(ProjectStats {
                    total_projects: None,
                    total_cpt_tests: u64::from(project.cpt_tests_count),
                    total_soil_layers: u64::from(project.layers_count),
                    recent_activity: None,
                })
            }
            None => Ok(ProjectStats {
                total_projects: Some(projects.records.len() as u64),
                total_cpt_tests: projects
                    .records
                    .values()
                    .map(|p| u64::from(p.cpt_tests_count))
                    .sum(),
                total_soil_layers: projects
                    .records
                    .values()
                    .map(|p| u64::from(p.layers_count))
                    .sum(),
                recent_activity: Some(projects.records.len() as u64),
            }),
        }))
    }
}

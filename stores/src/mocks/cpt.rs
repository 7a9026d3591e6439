//! Mock CPT test provider for testing.

use super::{Shared, not_found, timestamp};
use crate::providers::CptProvider;
use geotech_api::models::{CptReading, CptTest, CptTestId, CptTestPayload, CptUpload, ProjectId};
use geotech_api::{DomainError, DownloadSink, MemorySink};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::future::{Future, ready};

#[derive(Debug, Default)]
struct Tests {
    records: BTreeMap<CptTestId, CptTest>,
    next_id: i64,
}

/// Mock CPT provider.
///
/// Imports parse `depth,qc,fs,u` CSV rows (a header row is skipped); exports
/// write the readings back as CSV into a [`MemorySink`].
#[derive(Debug, Clone, Default)]
pub struct MockCptProvider {
    tests: Shared<Tests>,
    downloads: MemorySink,
}

impl MockCptProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files written by `export`.
    #[must_use]
    pub const fn downloads(&self) -> &MemorySink {
        &self.downloads
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: DomainError) {
        self.tests.fail_next(error);
    }

    /// Number of calls served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.tests.calls()
    }
}

fn scoped<'a>(
    tests: &'a mut Tests,
    project: ProjectId,
    id: CptTestId,
) -> Result<&'a mut CptTest, DomainError> {
    tests
        .records
        .get_mut(&id)
        .filter(|test| test.project_id == project)
        .ok_or_else(not_found)
}

/// Parse `depth,qc,fs,u` rows; rows that are not four numbers are skipped.
fn parse_csv(bytes: &[u8]) -> Vec<CptReading> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter_map(|line| {
            let values: Vec<f64> = line
                .split(',')
                .map(|cell| cell.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .ok()?;
            match values.as_slice() {
                [depth, qc, fs, u] => Some(CptReading::new(*depth, *qc, *fs, *u)),
                _ => None,
            }
        })
        .collect()
}

fn to_csv(readings: &[CptReading]) -> String {
    let mut csv = String::from("depth,qc,fs,u\n");
    for reading in readings {
        let _ = writeln!(csv, "{},{},{},{}", reading.depth, reading.qc, reading.fs, reading.u);
    }
    csv
}

impl CptProvider for MockCptProvider {
    fn list(
        &self,
        project: ProjectId,
    ) -> impl Future<Output = Result<Vec<CptTest>, DomainError>> + Send {
        ready(self.tests.call(|tests| {
            Ok(tests
                .records
                .values()
                .filter(|test| test.project_id == project)
                .cloned()
                .collect())
        }))
    }

    fn create(
        &self,
        project: ProjectId,
        payload: &CptTestPayload,
    ) -> impl Future<Output = Result<CptTest, DomainError>> + Send {
        ready(self.tests.call(|tests| {
            tests.next_id += 1;
            let test = CptTest {
                id: CptTestId::new(tests.next_id),
                project_id: project,
                name: payload.name.clone(),
                created_at: Some(timestamp(tests.next_id)),
                data: payload.data.clone().unwrap_or_default(),
            };
            tests.records.insert(test.id, test.clone());
            Ok(test)
        }))
    }

    fn update(
        &self,
        project: ProjectId,
        id: CptTestId,
        payload: &CptTestPayload,
    ) -> impl Future<Output = Result<CptTest, DomainError>> + Send {
        ready(self.tests.call(|tests| {
            let test = scoped(tests, project, id)?;
            if payload.name.is_some() {
                test.name.clone_from(&payload.name);
            }
            if let Some(data) = &payload.data {
                test.data.clone_from(data);
            }
            Ok(test.clone())
        }))
    }

    fn delete(
        &self,
        project: ProjectId,
        id: CptTestId,
    ) -> impl Future<Output = Result<(), DomainError>> + Send {
        ready(self.tests.call(|tests| {
            scoped(tests, project, id)?;
            tests.records.remove(&id);
            Ok(())
        }))
    }

    fn import(
        &self,
        project: ProjectId,
        id: CptTestId,
        upload: CptUpload,
    ) -> impl Future<Output = Result<CptTest, DomainError>> + Send {
        ready(self.tests.call(|tests| {
            let readings = parse_csv(&upload.bytes);
            if readings.is_empty() {
                return Err(DomainError::new("No valid CPT data found in file").with_status(400));
            }
            let test = scoped(tests, project, id)?;
            test.data = readings;
            Ok(test.clone())
        }))
    }

    fn export(
        &self,
        project: ProjectId,
        id: CptTestId,
    ) -> impl Future<Output = Result<(), DomainError>> + Send {
        let csv = self
            .tests
            .call(|tests| Ok(to_csv(&scoped(tests, project, id)?.data)));

        ready(csv.and_then(|csv| {
            self.downloads
                .save(&format!("cpt-test-{id}.csv"), csv.as_bytes())
                .map_err(|_| DomainError::new("Failed to export CPT data"))
        }))
    }
}

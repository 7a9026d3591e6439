//! Wire types of the geotech REST API

use crate::session::{Session, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw id
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// The raw id
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

resource_id!(
    /// Identifier of a [`Project`]
    ProjectId
);
resource_id!(
    /// Identifier of a [`SoilLayer`]
    SoilLayerId
);
resource_id!(
    /// Identifier of a [`CptTest`]
    CptTestId
);
resource_id!(
    /// Identifier of a [`GeotechnicalModel`]
    ModelId
);

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Body of `POST /login/`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Login name (the e-mail address)
    pub username: &'a str,
    /// Password
    pub password: &'a str,
}

/// Body of `POST /register/`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    /// E-mail address
    pub email: &'a str,
    /// Password
    pub password: &'a str,
    /// Display name
    #[serde(rename = "fullName")]
    pub full_name: &'a str,
}

/// Response of login and registration
///
/// Anything beyond the token and user id is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Session token, when the server signed the user in
    #[serde(default)]
    pub token: Option<String>,
    /// Identity of the user
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Remaining response fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AuthResponse {
    /// Session described by the response, if it carries a token
    #[must_use]
    pub fn session(&self, username: Option<&str>) -> Option<Session> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        let mut session = Session::new(token);
        session.user_id.clone_from(&self.user_id);
        session.username = username.map(str::to_string);
        Some(session)
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Lifecycle state of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Work in progress
    #[default]
    Active,
    /// Finished
    Completed,
    /// Paused
    OnHold,
    /// Abandoned
    Cancelled,
}

/// A geotechnical project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Server id
    pub id: ProjectId,
    /// Project name
    pub name: String,
    /// Free-text description
    pub description: Option<String>,
    /// Site location
    pub location: Option<String>,
    /// Client the work is done for
    pub client: Option<String>,
    /// Lifecycle state
    #[serde(default)]
    pub status: ProjectStatus,
    /// Planned start
    pub start_date: Option<NaiveDate>,
    /// Planned end
    pub end_date: Option<NaiveDate>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of geotechnical models
    #[serde(default)]
    pub models_count: u32,
    /// Number of CPT tests
    #[serde(default)]
    pub cpt_tests_count: u32,
    /// Number of soil layers
    #[serde(default)]
    pub layers_count: u32,
}

/// Create/update body for a project
///
/// Absent fields are left out of the JSON so the server keeps their values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPayload {
    /// Name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Site location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    /// Lifecycle state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    /// Planned start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Planned end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl ProjectPayload {
    /// Payload that sets the project name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the location
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the client
    #[must_use]
    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    /// Set the status
    #[must_use]
    pub const fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Apply the present fields to `project`
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name.clone_from(name);
        }
        if self.description.is_some() {
            project.description.clone_from(&self.description);
        }
        if self.location.is_some() {
            project.location.clone_from(&self.location);
        }
        if self.client.is_some() {
            project.client.clone_from(&self.client);
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if self.start_date.is_some() {
            project.start_date = self.start_date;
        }
        if self.end_date.is_some() {
            project.end_date = self.end_date;
        }
    }
}

/// Aggregate counts for all projects or for one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    /// Number of projects (global form only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_projects: Option<u64>,
    /// Number of CPT tests
    #[serde(default)]
    pub total_cpt_tests: u64,
    /// Number of soil layers
    #[serde(default)]
    pub total_soil_layers: u64,
    /// Projects touched in the last week (global form only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_activity: Option<u64>,
}

// ---------------------------------------------------------------------------
// Soil layers
// ---------------------------------------------------------------------------

/// A soil layer of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilLayer {
    /// Server id
    pub id: SoilLayerId,
    /// Owning project
    pub project_id: ProjectId,
    /// Layer name
    pub name: Option<String>,
    /// Depth of the top boundary (m)
    pub top_depth: Option<f64>,
    /// Depth of the bottom boundary (m)
    pub bottom_depth: Option<f64>,
    /// Unit weight (kN/m³)
    pub unit_weight: Option<f64>,
    /// Cohesion (kPa)
    pub cohesion: Option<f64>,
    /// Friction angle (°)
    pub friction_angle: Option<f64>,
    /// Compressibility
    pub compressibility: Option<f64>,
    /// Permeability
    pub permeability: Option<f64>,
}

impl SoilLayer {
    /// Absolute distance between the boundaries, when both are known
    #[must_use]
    pub fn thickness(&self) -> Option<f64> {
        layer_thickness(self.top_depth, self.bottom_depth)
    }

    /// Whether the bottom lies below the top
    ///
    /// Layers missing either boundary are accepted.
    #[must_use]
    pub fn has_valid_depths(&self) -> bool {
        depths_valid(self.top_depth, self.bottom_depth)
    }
}

/// Create/update body for a soil layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilLayerPayload {
    /// Name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Depth of the top boundary (m)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_depth: Option<f64>,
    /// Depth of the bottom boundary (m)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom_depth: Option<f64>,
    /// Unit weight (kN/m³)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_weight: Option<f64>,
    /// Cohesion (kPa)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cohesion: Option<f64>,
    /// Friction angle (°)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friction_angle: Option<f64>,
    /// Compressibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressibility: Option<f64>,
    /// Permeability
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permeability: Option<f64>,
}

impl SoilLayerPayload {
    /// Payload for a named layer between two depths
    pub fn new(name: impl Into<String>, top_depth: f64, bottom_depth: f64) -> Self {
        Self {
            name: Some(name.into()),
            top_depth: Some(top_depth),
            bottom_depth: Some(bottom_depth),
            ..Self::default()
        }
    }

    /// Absolute distance between the boundaries, when both are given
    #[must_use]
    pub fn thickness(&self) -> Option<f64> {
        layer_thickness(self.top_depth, self.bottom_depth)
    }

    /// Whether the bottom lies below the top
    #[must_use]
    pub fn has_valid_depths(&self) -> bool {
        depths_valid(self.top_depth, self.bottom_depth)
    }

    /// Build the layer this payload describes
    #[must_use]
    pub fn into_layer(self, id: SoilLayerId, project_id: ProjectId) -> SoilLayer {
        SoilLayer {
            id,
            project_id,
            name: self.name,
            top_depth: self.top_depth,
            bottom_depth: self.bottom_depth,
            unit_weight: self.unit_weight,
            cohesion: self.cohesion,
            friction_angle: self.friction_angle,
            compressibility: self.compressibility,
            permeability: self.permeability,
        }
    }

    /// Apply the present fields to `layer`
    pub fn apply_to(&self, layer: &mut SoilLayer) {
        fn set<T: Clone>(target: &mut Option<T>, value: Option<&T>) {
            if let Some(value) = value {
                *target = Some(value.clone());
            }
        }

        set(&mut layer.name, self.name.as_ref());
        set(&mut layer.top_depth, self.top_depth.as_ref());
        set(&mut layer.bottom_depth, self.bottom_depth.as_ref());
        set(&mut layer.unit_weight, self.unit_weight.as_ref());
        set(&mut layer.cohesion, self.cohesion.as_ref());
        set(&mut layer.friction_angle, self.friction_angle.as_ref());
        set(&mut layer.compressibility, self.compressibility.as_ref());
        set(&mut layer.permeability, self.permeability.as_ref());
    }
}

fn layer_thickness(top: Option<f64>, bottom: Option<f64>) -> Option<f64> {
    Some((bottom? - top?).abs())
}

fn depths_valid(top: Option<f64>, bottom: Option<f64>) -> bool {
    match (top, bottom) {
        (Some(top), Some(bottom)) => bottom > top,
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// CPT tests
// ---------------------------------------------------------------------------

/// One cone penetration reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CptReading {
    /// Depth (m)
    #[serde(default)]
    pub depth: f64,
    /// Cone resistance (MPa)
    #[serde(default)]
    pub qc: f64,
    /// Sleeve friction (kPa)
    #[serde(default)]
    pub fs: f64,
    /// Pore pressure (kPa)
    #[serde(default, alias = "u2")]
    pub u: f64,
}

impl CptReading {
    /// Create a reading
    #[must_use]
    pub const fn new(depth: f64, qc: f64, fs: f64, u: f64) -> Self {
        Self { depth, qc, fs, u }
    }
}

/// A cone penetration test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CptTest {
    /// Server id
    pub id: CptTestId,
    /// Owning project
    pub project_id: ProjectId,
    /// Test name
    pub name: Option<String>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Readings ordered by depth
    #[serde(default)]
    pub data: Vec<CptReading>,
}

/// Create/update body for a CPT test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CptTestPayload {
    /// Name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Readings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<CptReading>>,
}

impl CptTestPayload {
    /// Payload for a named test
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            data: None,
        }
    }

    /// Set the readings
    #[must_use]
    pub fn with_data(mut self, data: Vec<CptReading>) -> Self {
        self.data = Some(data);
        self
    }
}

/// A file to import into a CPT test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CptUpload {
    /// Name the server sees
    pub file_name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl CptUpload {
    /// Upload from memory
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an upload from disk
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());
        Ok(Self { file_name, bytes })
    }

    /// MIME type guessed from the file extension
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        let extension = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("csv") => "text/csv",
            Some("json") => "application/json",
            Some("txt") => "text/plain",
            Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Some("xls") => "application/vnd.ms-excel",
            _ => "application/octet-stream",
        }
    }
}

// ---------------------------------------------------------------------------
// Geotechnical models
// ---------------------------------------------------------------------------

fn default_unit_weight() -> f64 {
    18.0
}

/// A layer of a geotechnical model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelLayer {
    /// Server id, absent until saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Layer name
    #[serde(default)]
    pub name: String,
    /// Depth of the layer bottom (m)
    #[serde(default)]
    pub depth: f64,
    /// Unit weight (kN/m³)
    #[serde(default = "default_unit_weight")]
    pub unit_weight: f64,
    /// Cohesion (kPa)
    #[serde(default)]
    pub cohesion: f64,
    /// Friction angle (°)
    #[serde(default)]
    pub friction_angle: f64,
    /// Compressibility
    #[serde(default)]
    pub compressibility: f64,
    /// Permeability
    #[serde(default)]
    pub permeability: Option<f64>,
    /// Name of the CPT sheet the layer was derived from
    #[serde(default)]
    pub cpt_data: Option<String>,
}

impl ModelLayer {
    /// An unsaved layer with default parameters
    pub fn new(name: impl Into<String>, depth: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            depth,
            unit_weight: default_unit_weight(),
            cohesion: 0.0,
            friction_angle: 0.0,
            compressibility: 0.0,
            permeability: None,
            cpt_data: None,
        }
    }
}

/// A sheet of CPT readings attached to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CptSheet {
    /// Server id, absent until saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Sheet name
    #[serde(default, alias = "title")]
    pub name: String,
    /// Readings
    #[serde(default)]
    pub data: Vec<CptReading>,
}

/// A geotechnical model with its layers and CPT sheets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeotechnicalModel {
    /// Server id
    pub id: ModelId,
    /// Model name
    #[serde(default)]
    pub name: String,
    /// Project the model belongs to
    #[serde(default)]
    pub project: Option<ProjectId>,
    /// Groundwater level (m)
    #[serde(default)]
    pub npv: f64,
    /// Highest groundwater level (m)
    #[serde(default)]
    pub npv_max: f64,
    /// Layers ordered by depth
    #[serde(default)]
    pub layers: Vec<ModelLayer>,
    /// CPT sheets
    #[serde(default)]
    pub cpt_tests: Vec<CptSheet>,
}

/// Body of `POST /save_layers/:id/`
#[derive(Debug, Clone, Serialize)]
pub struct SaveLayersRequest<'a> {
    /// Layers replacing the saved ones
    pub layers: &'a [ModelLayer],
}

/// Body of `POST /save_cpt/:id/`
#[derive(Debug, Clone, Serialize)]
pub struct SaveCptRequest<'a> {
    /// Sheets replacing the saved ones
    pub cpt_tests: &'a [CptSheet],
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_from_server_json() {
        let project: Project = serde_json::from_value(json!({
            "id": 3,
            "name": "Bridge",
            "status": "on_hold",
            "start_date": "2024-03-01",
            "updated_at": "2024-03-02T10:00:00.123456Z",
            "cpt_tests_count": 2,
            "owner": 1
        }))
        .unwrap();

        assert_eq!(project.id, ProjectId::new(3));
        assert_eq!(project.status, ProjectStatus::OnHold);
        assert_eq!(project.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(project.updated_at.is_some());
        assert_eq!(project.cpt_tests_count, 2);
        assert_eq!(project.models_count, 0);
        assert_eq!(project.description, None);
    }

    #[test]
    fn test_project_payload_omits_absent_fields() {
        let payload = ProjectPayload::named("Tunnel").with_client("City");
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"name": "Tunnel", "client": "City"})
        );
    }

    #[test]
    fn test_project_payload_apply_keeps_unset_fields() {
        let mut project: Project = serde_json::from_value(json!({
            "id": 1, "name": "Old", "location": "Zagreb", "client": "A"
        }))
        .unwrap();

        ProjectPayload::named("New")
            .with_status(ProjectStatus::Completed)
            .apply_to(&mut project);

        assert_eq!(project.name, "New");
        assert_eq!(project.status, ProjectStatus::Completed);
        assert_eq!(project.location.as_deref(), Some("Zagreb"));
        assert_eq!(project.client.as_deref(), Some("A"));
    }

    #[test]
    fn test_stats_wire_names() {
        let stats: ProjectStats = serde_json::from_value(json!({
            "totalProjects": 4, "totalCptTests": 10, "totalSoilLayers": 7, "recentActivity": 1
        }))
        .unwrap();
        assert_eq!(stats.total_projects, Some(4));
        assert_eq!(stats.total_soil_layers, 7);

        let per_project: ProjectStats =
            serde_json::from_value(json!({"totalCptTests": 1, "totalSoilLayers": 2})).unwrap();
        assert_eq!(per_project.total_projects, None);
    }

    #[test]
    fn test_soil_layer_geometry() {
        let payload = SoilLayerPayload::new("Clay", 2.0, 5.5);
        assert_eq!(payload.thickness(), Some(3.5));
        assert!(payload.has_valid_depths());

        let inverted = SoilLayerPayload::new("Sand", 5.0, 2.0);
        assert_eq!(inverted.thickness(), Some(3.0));
        assert!(!inverted.has_valid_depths());

        let open = SoilLayerPayload {
            top_depth: Some(1.0),
            ..SoilLayerPayload::default()
        };
        assert_eq!(open.thickness(), None);
        assert!(open.has_valid_depths());
    }

    #[test]
    fn test_soil_layer_wire_is_camel_case() {
        let layer =
            SoilLayerPayload::new("Clay", 0.0, 1.0).into_layer(SoilLayerId(9), ProjectId(2));
        let value = serde_json::to_value(&layer).unwrap();
        assert_eq!(value["projectId"], 2);
        assert_eq!(value["topDepth"], 0.0);
        assert_eq!(value["bottomDepth"], 1.0);
    }

    #[test]
    fn test_cpt_reading_accepts_u2() {
        let reading: CptReading =
            serde_json::from_value(json!({"depth": 1.0, "qc": 2.0, "fs": 3.0, "u2": 4.0})).unwrap();
        assert_eq!(reading, CptReading::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_auth_response_session() {
        let response: AuthResponse =
            serde_json::from_value(json!({"token": "mock-token", "user_id": 123, "email": "a@b"}))
                .unwrap();
        let session = response.session(Some("a@b")).unwrap();
        assert_eq!(session.token, "mock-token");
        assert_eq!(session.user_id, Some(UserId::new("123")));
        assert_eq!(response.extra["email"], "a@b");

        let no_token: AuthResponse = serde_json::from_value(json!({"message": "ok"})).unwrap();
        assert_eq!(no_token.session(None), None);
    }

    #[test]
    fn test_model_defaults() {
        let model: GeotechnicalModel = serde_json::from_value(json!({
            "id": 5,
            "layers": [{"name": "Fill", "depth": 1.5}],
            "cpt_tests": [{"title": "CPT-1", "data": []}]
        }))
        .unwrap();

        assert_eq!(model.layers[0].unit_weight, 18.0);
        assert_eq!(model.cpt_tests[0].name, "CPT-1");
        assert_eq!(model.npv, 0.0);
    }

    #[test]
    fn test_upload_mime_type() {
        assert_eq!(CptUpload::new("a.CSV", b"".to_vec()).mime_type(), "text/csv");
        assert_eq!(
            CptUpload::new("data", b"".to_vec()).mime_type(),
            "application/octet-stream"
        );
    }
}

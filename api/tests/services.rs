//! Resource services against a mock HTTP server

#![allow(clippy::unwrap_used)] // Test code
#![allow(clippy::expect_used)] // Test code

use geotech_api::models::{
    CptSheet, CptTestId, CptUpload, GeotechnicalModel, ModelId, ModelLayer, ProjectId,
    ProjectPayload, SoilLayerPayload,
};
use geotech_api::{
    ApiConfig, DirectorySink, GeotechApi, MemorySink, MemoryStorage, RecordingNavigator, Route,
    Session, SessionStorage, UserId,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, body_partial_json, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    api: GeotechApi,
    storage: MemoryStorage,
    navigator: RecordingNavigator,
    downloads: MemorySink,
}

fn harness(server: &MockServer) -> Harness {
    let storage = MemoryStorage::new();
    let navigator = RecordingNavigator::new();
    let downloads = MemorySink::new();

    let api = GeotechApi::builder(ApiConfig::new(format!("{}/geotech", server.uri())))
        .storage(Arc::new(storage.clone()))
        .navigator(Arc::new(navigator.clone()))
        .downloads(Arc::new(downloads.clone()))
        .build()
        .expect("api builds");

    Harness {
        api,
        storage,
        navigator,
        downloads,
    }
}

async fn signed_in(server: &MockServer) -> Harness {
    let harness = harness(server);
    harness
        .api
        .session
        .establish(Session::new("secret").with_user_id(UserId::new("7")))
        .await;
    harness
}

async fn mount_csrf(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/geotech/csrf/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "csrftoken=csrf-abc; Path=/")
                .set_body_json(json!({"message": "CSRF cookie set"})),
        )
        .mount(server)
        .await;
}

fn project_json(id: i64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "status": "active",
        "updated_at": "2024-05-01T12:00:00Z",
        "models_count": 0,
        "cpt_tests_count": 0,
        "layers_count": 0
    })
}

#[tokio::test]
async fn login_persists_session_and_sends_csrf() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;

    Mock::given(method("POST"))
        .and(path("/geotech/login/"))
        .and(header("x-csrftoken", "csrf-abc"))
        .and(body_json(json!({"username": "test@example.com", "password": "password123"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "mock-token", "user_id": "123"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let response = h.api.auth.login("test@example.com", "password123").await.unwrap();

    assert_eq!(response.token.as_deref(), Some("mock-token"));
    assert!(h.api.auth.is_authenticated());

    let record: serde_json::Value =
        serde_json::from_str(&h.storage.get("user").unwrap().expect("session persisted")).unwrap();
    assert_eq!(record["token"], "mock-token");
    assert_eq!(record["user_id"], "123");
}

#[tokio::test]
async fn login_failure_uses_server_message() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;

    Mock::given(method("POST"))
        .and(path("/geotech/login/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let h = harness(&server);
    let error = h.api.auth.login("test@example.com", "wrong").await.unwrap_err();

    assert_eq!(error.message, "Invalid credentials");
    assert_eq!(error.status, Some(400));
    assert!(!h.api.auth.is_authenticated());
    assert_eq!(h.storage.get("user").unwrap(), None);
}

#[tokio::test]
async fn register_sends_full_name() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;

    Mock::given(method("POST"))
        .and(path("/geotech/register/"))
        .and(body_json(json!({
            "email": "new@example.com",
            "password": "pw",
            "fullName": "New User"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "User created"})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let response = h.api.auth.register("new@example.com", "pw", "New User").await.unwrap();

    assert_eq!(response.token, None);
    assert!(!h.api.auth.is_authenticated());
}

#[tokio::test]
async fn authenticated_requests_carry_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geotech/projects/"))
        .and(header("authorization", "Token secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([project_json(1, "A"), project_json(2, "B")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = signed_in(&server).await;
    let projects = h.api.projects.list().await.unwrap();

    assert_eq!(projects.len(), 2);
    assert_eq!(projects[1].name, "B");
}

#[tokio::test]
async fn unauthorized_clears_session_and_navigates_to_login() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geotech/projects/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid token."})),
        )
        .mount(&server)
        .await;

    let h = signed_in(&server).await;
    let mut updates = h.api.auth.session_updates();
    assert!(h.storage.get("user").unwrap().is_some());

    let error = h.api.projects.list().await.unwrap_err();

    assert_eq!(error.status, Some(401));
    assert_eq!(error.message, "Invalid token.");
    assert!(!h.api.session.is_authenticated());
    assert_eq!(h.storage.get("user").unwrap(), None);
    assert_eq!(h.navigator.last(), Some(Route::Login));
    assert!(updates.has_changed().unwrap());
    assert!(updates.borrow_and_update().is_none());
}

#[tokio::test]
async fn project_crud_paths_and_methods() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/geotech/projects/"))
        .and(body_json(json!({"name": "Bridge", "location": "Split"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(project_json(5, "Bridge")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/geotech/projects/5/"))
        .and(body_json(json!({"name": "Bridge II"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_json(5, "Bridge II")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/geotech/projects/5/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let h = signed_in(&server).await;
    let created = h
        .api
        .projects
        .create(&ProjectPayload::named("Bridge").with_location("Split"))
        .await
        .unwrap();
    assert_eq!(created.id, ProjectId::new(5));

    let updated = h
        .api
        .projects
        .update(created.id, &ProjectPayload::named("Bridge II"))
        .await
        .unwrap();
    assert_eq!(updated.name, "Bridge II");

    h.api.projects.delete(created.id).await.unwrap();
}

#[tokio::test]
async fn project_stats_global_and_scoped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geotech/stats/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalProjects": 3, "totalCptTests": 4, "totalSoilLayers": 5, "recentActivity": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/geotech/projects/2/stats/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"totalCptTests": 1, "totalSoilLayers": 2})),
        )
        .mount(&server)
        .await;

    let h = signed_in(&server).await;
    let global = h.api.projects.stats(None).await.unwrap();
    assert_eq!(global.total_projects, Some(3));

    let scoped = h.api.projects.stats(Some(ProjectId::new(2))).await.unwrap();
    assert_eq!(scoped.total_projects, None);
    assert_eq!(scoped.total_soil_layers, 2);
}

#[tokio::test]
async fn failure_without_message_uses_default() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geotech/projects/9/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let h = signed_in(&server).await;
    let error = h.api.projects.get(ProjectId::new(9)).await.unwrap_err();

    assert_eq!(error.message, "Failed to fetch project");
    assert_eq!(error.status, Some(500));
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test]
async fn field_errors_are_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/geotech/projects/1/soil-layers/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "bottomDepth": ["Must be greater than top depth."]
        })))
        .mount(&server)
        .await;

    let h = signed_in(&server).await;
    let error = h
        .api
        .soil_layers
        .create(ProjectId::new(1), &SoilLayerPayload::new("Clay", 5.0, 2.0))
        .await
        .unwrap_err();

    assert_eq!(error.message, "bottomDepth: Must be greater than top depth.");
}

#[tokio::test]
async fn cpt_import_uploads_multipart_file() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/geotech/projects/1/cpt-tests/4/import/"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4,
            "projectId": 1,
            "name": "CPT-4",
            "data": [{"depth": 0.5, "qc": 1.2, "fs": 10.0, "u2": 3.0}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = signed_in(&server).await;
    let test = h
        .api
        .cpt
        .import(
            ProjectId::new(1),
            CptTestId::new(4),
            CptUpload::new("cpt.csv", b"depth,qc,fs,u2\n0.5,1.2,10,3\n".to_vec()),
        )
        .await
        .unwrap();

    assert_eq!(test.data.len(), 1);
    assert!((test.data[0].u - 3.0).abs() < f64::EPSILON);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"cpt.csv\""));
}

#[tokio::test]
async fn cpt_export_saves_download() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geotech/projects/1/cpt-tests/4/export/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-disposition", "attachment; filename=\"export.csv\"")
                .set_body_bytes(b"depth,qc\n1,2\n".to_vec()),
        )
        .mount(&server)
        .await;

    let h = signed_in(&server).await;
    h.api.cpt.export(ProjectId::new(1), CptTestId::new(4)).await.unwrap();

    assert_eq!(
        h.downloads.files(),
        vec![("cpt-test-4.csv".to_string(), b"depth,qc\n1,2\n".to_vec())]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn cpt_export_writes_to_disk_on_single_thread() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geotech/projects/2/cpt-tests/9/export/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"depth,qc\n".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let api = GeotechApi::builder(ApiConfig::new(format!("{}/geotech", server.uri())))
        .downloads(Arc::new(DirectorySink::new(dir.path())))
        .build()
        .expect("api builds");

    api.cpt.export(ProjectId::new(2), CptTestId::new(9)).await.unwrap();

    let written = tokio::fs::read(dir.path().join("cpt-test-9.csv")).await.unwrap();
    assert_eq!(written, b"depth,qc\n");
}

#[tokio::test]
async fn model_endpoints() {
    let server = MockServer::start().await;
    let model = json!({
        "id": 3,
        "name": "Model",
        "project": 1,
        "npv": 2.0,
        "npv_max": 1.0,
        "layers": [{"id": 10, "name": "Fill", "depth": 1.5, "unit_weight": 19.0}],
        "cpt_tests": [{"id": 20, "name": "CPT-1", "data": []}]
    });

    Mock::given(method("GET"))
        .and(path("/geotech/get_layers/3/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model.clone()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/geotech/save_layers/3/"))
        .and(body_json(json!({"layers": [{
            "name": "Clay", "depth": 4.0, "unit_weight": 18.0, "cohesion": 0.0,
            "friction_angle": 0.0, "compressibility": 0.0, "permeability": null, "cpt_data": null
        }]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(model.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/geotech/save_cpt/3/"))
        .and(body_json(json!({"cpt_tests": [{"name": "CPT-2", "data": []}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(model))
        .expect(1)
        .mount(&server)
        .await;

    let h = signed_in(&server).await;
    let fetched = h.api.models.fetch(ModelId::new(3)).await.unwrap();
    assert_eq!(fetched.layers[0].name, "Fill");
    assert_eq!(fetched.project, Some(ProjectId::new(1)));

    h.api
        .models
        .save_layers(ModelId::new(3), &[ModelLayer::new("Clay", 4.0)])
        .await
        .unwrap();

    let sheet = CptSheet {
        id: None,
        name: "CPT-2".to_string(),
        data: Vec::new(),
    };
    h.api.models.save_cpt(ModelId::new(3), &[sheet]).await.unwrap();
}

#[tokio::test]
async fn model_save_posts_groundwater() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/geotech/model_detail/3/"))
        .and(body_partial_json(json!({"name": "Quay wall", "npv": 2.5, "npv_max": 1.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3,
            "name": "Quay wall",
            "npv": 2.5,
            "npv_max": 1.0,
            "layers": [{"id": 11, "name": "Clay", "depth": 4.0, "unit_weight": 18.0}],
            "cpt_tests": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model = GeotechnicalModel {
        id: ModelId::new(3),
        name: "Quay wall".to_string(),
        project: None,
        npv: 2.5,
        npv_max: 1.0,
        layers: vec![ModelLayer::new("Clay", 4.0)],
        cpt_tests: Vec::new(),
    };

    let h = signed_in(&server).await;
    let saved = h.api.models.save_model(ModelId::new(3), &model).await.unwrap();

    assert!((saved.npv - 2.5).abs() < f64::EPSILON);
    assert_eq!(saved.layers.len(), 1);
}

#[tokio::test]
async fn network_failure_is_a_domain_error_without_status() {
    let server = MockServer::start().await;
    let h = signed_in(&server).await;
    drop(server);

    let error = h.api.projects.list().await.unwrap_err();
    assert_eq!(error.message, "Failed to fetch projects");
    assert_eq!(error.status, None);
    assert!(h.api.session.is_authenticated());
}

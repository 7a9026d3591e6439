//! Store behaviour against the in-memory providers

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use geotech_api::models::{CptReading, ModelLayer, ProjectId, ProjectPayload, SoilLayerPayload};
use geotech_api::{
    DomainError, MemoryStorage, RecordingNavigator, Route, SessionContext, SessionStorage, UserId,
};
use geotech_core::environment::SystemClock;
use geotech_stores::mocks::model::sample_model;
use geotech_stores::mocks::projects::sample_project;
use geotech_stores::mocks::{
    MockAuthProvider, MockModelProvider, MockProjectProvider, MockSoilLayerProvider,
};
use geotech_stores::{
    AuthEnvironment, AuthStore, GeotechEnvironment, GeotechnicalStore, LayerPatch,
    ProjectEnvironment, ProjectStore, SoilEnvironment, SoilStore,
};
use std::sync::Arc;
use std::time::Duration;

fn auth_store() -> (AuthStore<MockAuthProvider>, MemoryStorage, RecordingNavigator) {
    let storage = MemoryStorage::new();
    let navigator = RecordingNavigator::new();
    let session = SessionContext::hydrate(Arc::new(storage.clone()), "user", &SystemClock);
    let store = AuthStore::new(AuthEnvironment::new(
        MockAuthProvider::with_session(session),
        Arc::new(navigator.clone()),
    ));
    (store, storage, navigator)
}

#[tokio::test]
async fn login_persists_session_and_navigates_to_workspace() {
    let (store, storage, navigator) = auth_store();

    let response = store.login("test@example.com", "password123").await.unwrap();

    assert_eq!(response.token.as_deref(), Some("mock-token"));
    assert!(store.is_authenticated().await);
    assert_eq!(store.current_user().await, Some(UserId::new("123")));

    let record: serde_json::Value =
        serde_json::from_str(&storage.get("user").unwrap().expect("session persisted")).unwrap();
    assert_eq!(record["token"], "mock-token");
    assert_eq!(record["user_id"], "123");

    assert_eq!(
        navigator.last(),
        Some(Route::Workspace {
            user_id: UserId::new("123")
        })
    );
    assert_eq!(navigator.last().unwrap().path(), "/geotechnical/123");
}

#[tokio::test]
async fn failed_login_sets_error_and_leaves_session_unset() {
    let (store, storage, navigator) = auth_store();

    let error = store.login("test@example.com", "wrong").await.unwrap_err();

    assert_eq!(error.message(), "Invalid credentials");
    let state = store.snapshot().await;
    assert_eq!(state.error.as_deref(), Some("Invalid credentials"));
    assert!(!state.loading);
    assert!(state.session.is_none());
    assert!(storage.get("user").unwrap().is_none());
    assert!(navigator.routes().is_empty());
}

#[tokio::test]
async fn logout_clears_store_and_storage() {
    let (store, storage, _) = auth_store();
    store.login("test@example.com", "password123").await.unwrap();

    store.logout().await.unwrap();

    assert!(!store.is_authenticated().await);
    assert!(storage.get("user").unwrap().is_none());
}

#[tokio::test]
async fn auth_store_follows_external_invalidation() {
    let session = SessionContext::in_memory();
    let store = AuthStore::new(AuthEnvironment::new(
        MockAuthProvider::with_session(session.clone()),
        Arc::new(RecordingNavigator::new()),
    ));
    store.login("test@example.com", "password123").await.unwrap();

    session.invalidate().await;

    tokio::time::timeout(Duration::from_secs(2), async {
        while store.is_authenticated().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("auth store observed invalidation");
}

#[tokio::test]
async fn register_reports_duplicate_email() {
    let (store, _, _) = auth_store();

    let created = store
        .register("new@example.com", "secret", "New User")
        .await
        .unwrap();
    assert!(created.user_id.is_some());

    let error = store
        .register("test@example.com", "secret", "Someone")
        .await
        .unwrap_err();
    assert_eq!(error.status(), Some(400));
    assert!(!store.snapshot().await.loading);
}

#[tokio::test]
async fn fetching_projects_twice_yields_same_collection() {
    let store = ProjectStore::new(ProjectEnvironment::new(MockProjectProvider::with_projects([
        sample_project(1, "Quay"),
        sample_project(2, "Bridge"),
    ])));

    let first = store.fetch_projects().await.unwrap();
    let second = store.fetch_projects().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.snapshot().await.projects, second);
}

#[tokio::test]
async fn created_project_matches_fetched_project() {
    let store = ProjectStore::new(ProjectEnvironment::new(MockProjectProvider::new()));

    let created = store
        .create_project(ProjectPayload::named("Harbour").with_location("Split"))
        .await
        .unwrap();
    let fetched = store.fetch_project(created.id).await.unwrap();

    assert_eq!(fetched, created);
    assert_eq!(store.snapshot().await.current_project, Some(created));
}

#[tokio::test]
async fn delete_clears_current_project_and_refreshes_stats() {
    let store = ProjectStore::new(ProjectEnvironment::new(MockProjectProvider::with_projects([
        sample_project(1, "Quay"),
        sample_project(2, "Bridge"),
    ])));
    store.fetch_projects().await.unwrap();
    store.fetch_project(ProjectId::new(1)).await.unwrap();

    store.delete_project(ProjectId::new(1)).await.unwrap();

    let state = store.snapshot().await;
    assert!(state.current_project.is_none());
    assert_eq!(state.projects.len(), 1);
    assert_eq!(state.stats.unwrap().total_projects, Some(1));
}

#[tokio::test]
async fn project_statistics_do_not_touch_stored_stats() {
    let store = ProjectStore::new(ProjectEnvironment::new(MockProjectProvider::with_projects([
        sample_project(1, "Quay"),
    ])));

    store.project_statistics(ProjectId::new(1)).await.unwrap();
    assert!(store.snapshot().await.stats.is_none());

    store.fetch_stats(None).await.unwrap();
    assert!(store.snapshot().await.stats.is_some());
}

#[tokio::test]
async fn provider_failure_is_recorded_and_returned() {
    let provider = MockProjectProvider::new();
    let store = ProjectStore::new(ProjectEnvironment::new(provider.clone()));
    provider.fail_next(DomainError::new("Failed to fetch projects").with_status(500));

    let error = store.fetch_projects().await.unwrap_err();

    assert_eq!(error.status(), Some(500));
    let state = store.snapshot().await;
    assert_eq!(state.error.as_deref(), Some("Failed to fetch projects"));
    assert!(!state.loading);

    store.fetch_projects().await.unwrap();
    assert!(store.snapshot().await.error.is_none());
}

#[tokio::test]
async fn concurrent_requests_each_receive_their_own_result() {
    let store = ProjectStore::new(ProjectEnvironment::new(MockProjectProvider::with_projects([
        sample_project(1, "Quay"),
        sample_project(2, "Bridge"),
    ])));

    let (first, second) = tokio::join!(
        store.fetch_project(ProjectId::new(1)),
        store.fetch_project(ProjectId::new(2)),
    );

    assert_eq!(first.unwrap().name, "Quay");
    assert_eq!(second.unwrap().name, "Bridge");
}

#[tokio::test]
async fn many_overlapping_requests_all_complete() {
    let store = ProjectStore::new(ProjectEnvironment::new(MockProjectProvider::with_projects([
        sample_project(1, "Quay"),
    ])));

    let calls: Vec<_> = (0..300)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_project(ProjectId::new(1)).await })
        })
        .collect();

    tokio::time::timeout(Duration::from_secs(5), async {
        for call in calls {
            assert_eq!(call.await.unwrap().unwrap().name, "Quay");
        }
    })
    .await
    .expect("every request completes");
    assert!(!store.snapshot().await.loading);
}

#[tokio::test]
async fn soil_layers_crud() {
    let store = SoilStore::new(SoilEnvironment::new(MockSoilLayerProvider::new()));
    let project = ProjectId::new(1);

    let top = store
        .create_layer(project, SoilLayerPayload::new("Fill", 0.0, 1.5))
        .await
        .unwrap();
    let clay = store
        .create_layer(project, SoilLayerPayload::new("Clay", 1.5, 4.0))
        .await
        .unwrap();

    let rename = SoilLayerPayload {
        name: Some("Soft clay".to_string()),
        ..SoilLayerPayload::default()
    };
    let renamed = store.update_layer(project, clay.id, rename).await.unwrap();
    assert_eq!(renamed.name.as_deref(), Some("Soft clay"));
    assert_eq!(renamed.bottom_depth, Some(4.0));

    store.delete_layer(project, top.id).await.unwrap();
    let remaining = store.layers_by_project(project).await;
    assert_eq!(remaining, vec![renamed]);

    let fetched = store.fetch_layers(project).await.unwrap();
    assert_eq!(fetched, remaining);
}

#[tokio::test]
async fn update_layer_preserves_unspecified_fields() {
    let store = GeotechnicalStore::new(GeotechEnvironment::new(MockModelProvider::default()));
    let mut sand = ModelLayer::new("Sand", 3.0);
    sand.friction_angle = 32.0;
    store
        .update_layers(vec![ModelLayer::new("Fill", 1.0), sand.clone()])
        .await
        .unwrap();

    store
        .update_layer(
            1,
            LayerPatch {
                unit_weight: Some(19.5),
                ..LayerPatch::default()
            },
        )
        .await
        .unwrap();

    let layer = store.snapshot().await.layers[1].clone();
    assert!((layer.unit_weight - 19.5).abs() < f64::EPSILON);
    assert!((layer.friction_angle - 32.0).abs() < f64::EPSILON);
    assert_eq!(layer.name, sand.name);
}

#[tokio::test]
async fn geotechnical_model_load_edit_save() {
    let mut model = sample_model(5);
    model.project = Some(ProjectId::new(2));
    model.layers = vec![ModelLayer::new("Fill", 2.5)];
    let store = GeotechnicalStore::new(GeotechEnvironment::new(MockModelProvider::with_models([
        model,
    ])));

    store.load_model(model_id()).await.unwrap();
    assert_eq!(
        store.snapshot().await.current_project_id,
        Some(ProjectId::new(2))
    );

    store
        .cache_cpt_data(model_id(), vec![CptReading::new(0.0, 1.0, 0.1, 50.0)])
        .await
        .unwrap();
    assert_eq!(store.cached_cpt_data(model_id()).await.unwrap().len(), 1);

    store
        .update_layers(vec![
            ModelLayer::new("Fill", 2.5),
            ModelLayer::new("Clay", 6.0),
        ])
        .await
        .unwrap();
    let saved = store.save_layers(model_id()).await.unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|layer| layer.id.is_some()));

    store.clear_cpt_cache(None).await.unwrap();
    assert!(store.cached_cpt_data(model_id()).await.is_none());
}

fn model_id() -> geotech_api::models::ModelId {
    geotech_api::models::ModelId::new(5)
}

//! HTTP-level tests for the retention endpoint, driven through the router
//! with an in-memory store.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use nexus_api::ApiServer;
use nexus_core::config::AppConfig;
use nexus_core::{Event, Project, TrackedUser};
use nexus_store::MemoryStore;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const TOKEN: &str = "session-acme";

struct TestApp {
    router: Router,
    project: Uuid,
    foreign_project: Uuid,
}

fn setup() -> TestApp {
    let company = Uuid::new_v4();
    let project = Uuid::new_v4();
    let foreign_project = Uuid::new_v4();

    let store = MemoryStore::new();
    store.insert_project(Project {
        id: project,
        company_id: company,
        name: "acme web".into(),
    });
    store.insert_project(Project {
        id: foreign_project,
        company_id: Uuid::new_v4(),
        name: "rival web".into(),
    });

    let first_seen = Utc::now() - Duration::days(3);
    store.insert_tracked_user(TrackedUser {
        external_user_id: "u1".into(),
        project_id: project,
        environment: "production".into(),
        first_seen,
    });
    store.record_event(Event {
        project_id: project,
        environment: "production".into(),
        user_id: "u1".into(),
        event_name: "page_view".into(),
        timestamp: Utc::now() - Duration::hours(1),
    });

    let mut config = AppConfig::default();
    config.auth.sessions.insert(TOKEN.to_string(), company);
    let server = ApiServer::new(config, Arc::new(store));

    TestApp {
        router: server.router(),
        project,
        foreign_project,
    }
}

async fn get(router: &Router, uri: &str, auth: Option<(header::HeaderName, String)>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some((name, value)) = auth {
        request = request.header(name, value);
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn bearer() -> Option<(header::HeaderName, String)> {
    Some((header::AUTHORIZATION, format!("Bearer {TOKEN}")))
}

#[tokio::test]
async fn test_unauthenticated_rejected() {
    let app = setup();
    let (status, body) = get(&app.router, "/api/analytics/retention", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let unknown = Some((header::AUTHORIZATION, "Bearer stolen".to_string()));
    let (status, _) = get(&app.router, "/api/analytics/retention", unknown).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_default_range_is_weekly() {
    let app = setup();
    let (status, body) = get(&app.router, "/api/analytics/retention", bearer()).await;

    assert_eq!(status, StatusCode::OK);
    let cohorts = body["cohorts"].as_array().unwrap();
    assert_eq!(cohorts.len(), 4);
    assert!(cohorts[0]["cohort"].as_str().unwrap().starts_with("Week of "));
    assert_eq!(body["keyMetrics"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_daily_range_counts_returning_user() {
    let app = setup();
    let uri = format!("/api/analytics/retention?range=7d&projectId={}", app.project);
    let (status, body) = get(&app.router, &uri, bearer()).await;

    assert_eq!(status, StatusCode::OK);
    let cohorts = body["cohorts"].as_array().unwrap();
    assert_eq!(cohorts.len(), 7);

    let populated: Vec<&Value> = cohorts.iter().filter(|c| c["users"] != 0).collect();
    assert_eq!(populated.len(), 1);
    assert_eq!(populated[0]["day1"], 1);
    assert!(populated[0]["day7"].is_null());
    assert_eq!(body["keyMetrics"][0]["value"], "100.0%");
    assert_eq!(body["keyMetrics"][0]["label"], "Day 1 Retention");
}

#[tokio::test]
async fn test_session_cookie_accepted() {
    let app = setup();
    let cookie = Some((header::COOKIE, format!("analytics-session={TOKEN}")));
    let (status, body) = get(&app.router, "/api/analytics/retention?range=24h", cookie).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cohorts"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_environment_filter_excludes_other_environments() {
    let app = setup();
    let (status, body) = get(
        &app.router,
        "/api/analytics/retention?range=7d&environment=staging",
        bearer(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let cohorts = body["cohorts"].as_array().unwrap();
    assert!(cohorts.iter().all(|c| c["users"] == 0 && c["day1"] == 0));
}

#[tokio::test]
async fn test_foreign_project_is_not_found() {
    let app = setup();
    let uri = format!("/api/analytics/retention?projectId={}", app.foreign_project);
    let (status, body) = get(&app.router, &uri, bearer()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "access_denied");
    assert!(body.get("cohorts").is_none());
}

#[tokio::test]
async fn test_malformed_project_id() {
    let app = setup();
    let (status, body) = get(
        &app.router,
        "/api/analytics/retention?projectId=not-a-project",
        bearer(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn test_malformed_query_authenticated_first() {
    let app = setup();
    let uri = "/api/analytics/retention?range=7d&range=30d";

    let (status, body) = get(&app.router, uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, body) = get(&app.router, uri, bearer()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = setup();
    let (status, body) = get(&app.router, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(&app.router, "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/analytics/retention"].is_object());
}

//! HTTP Server & Routing Integration Tests
//!
//! Drives the router with `oneshot`; sources are scripted.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::FixedOffset;
use evmap_common::events::SourceKind;
use evmap_discovery::auth::{MeetupOAuth, MEETUP_AUTHORIZE_URL};
use evmap_discovery::services::{DiscoveryService, PromptAugmenter};
use evmap_discovery::{build_router, AppState};
use helpers::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(harness: &Harness) -> Router {
    build_router(AppState::new(Arc::new(harness.service())))
}

fn quiet_harness() -> Harness {
    Harness::new(
        ScriptedSource::new(SourceKind::Meetup, vec![Reply::empty()]),
        ScriptedSource::new(SourceKind::Eventbrite, vec![Reply::empty()]),
    )
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_reports_module() {
    // Given: a fresh service
    let harness = quiet_harness();

    // When: GET /health
    let (status, body) = get(app(&harness), "/health").await;

    // Then: ok with module identity
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "evmap-discovery");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_degraded_when_breaker_open() {
    let harness = quiet_harness();
    for _ in 0..FAILURE_THRESHOLD {
        harness.primary_breaker.record_failure();
    }

    let (_, body) = get(app(&harness), "/health").await;

    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_status_lists_breakers_and_credentials() {
    // Given: the secondary has no credential
    let harness = Harness::new(
        ScriptedSource::new(SourceKind::Meetup, vec![Reply::empty()]),
        ScriptedSource::new(SourceKind::Eventbrite, vec![Reply::empty()]).without_credentials(),
    );

    // When: GET /status
    let (status, body) = get(app(&harness), "/status").await;

    // Then: both breakers closed, auth reported invalid
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["breaker_states"]["meetup"], "CLOSED");
    assert_eq!(body["breaker_states"]["eventbrite"], "CLOSED");
    assert_eq!(body["auth_valid"], false);
    assert_eq!(body["credentials"]["meetup"], true);
    assert_eq!(body["breakers"]["meetup"]["consecutive_failures"], 0);
}

#[tokio::test]
async fn test_config_not_available_for_hand_built_service() {
    let (status, body) = get(app(&quiet_harness()), "/config").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_search_events_returns_matches() {
    // Given: Meetup has two events
    let harness = Harness::new(
        ScriptedSource::always(
            SourceKind::Meetup,
            vec![meetup_record(1, "Rustaceans Night"), meetup_record(2, "Async Rust")],
        ),
        ScriptedSource::new(SourceKind::Eventbrite, vec![Reply::empty()]),
    );

    // When: searching via the tool endpoint
    let (status, body) = post(
        app(&harness),
        "/tools/search_events",
        json!({"query": "rust meetups in Berlin tomorrow", "max_results": 5}),
    )
    .await;

    // Then: events, extracted query and status are returned
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "matches");
    assert_eq!(body["events"].as_array().unwrap().len(), 2);
    assert_eq!(body["events"][0]["id"], "meetup:1");
    assert_eq!(body["sources_used"], json!(["meetup"]));
    assert_eq!(body["query"]["max_results"], 5);
    assert_eq!(body["query"]["location_hint"]["place"], "berlin");

    // And: the source saw the extracted query
    let queries = harness.primary.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].topics.contains("rust"));
}

#[tokio::test]
async fn test_search_events_failed_status() {
    let harness = Harness::new(
        ScriptedSource::new(SourceKind::Meetup, vec![Reply::status(401)]),
        ScriptedSource::new(SourceKind::Eventbrite, vec![Reply::status(403)]),
    );

    let (status, body) = post(app(&harness), "/tools/search_events", json!({"query": "yoga"})).await;

    // A failed search is still a successful tool call
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["category"], "AuthenticationError");
    assert_eq!(errors[0]["source"], "meetup");
}

#[tokio::test]
async fn test_search_events_rejects_blank_query() {
    let harness = quiet_harness();

    let (status, body) = post(app(&harness), "/tools/search_events", json!({"query": "   "})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(harness.primary.calls(), 0);
}

#[tokio::test]
async fn test_augment_prompt_appends_events() {
    let harness = Harness::new(
        ScriptedSource::always(SourceKind::Meetup, vec![meetup_record(1, "PyData Night")]),
        ScriptedSource::new(SourceKind::Eventbrite, vec![Reply::empty()]),
    );

    let (status, body) = post(
        app(&harness),
        "/tools/augment_prompt",
        json!({"prompt": "What python events are on today?"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let prompt = body["prompt"].as_str().unwrap();
    assert!(prompt.starts_with("What python events are on today?"));
    assert!(prompt.contains("=== Relevant Events ==="));
    assert!(prompt.contains("**PyData Night**"));
}

#[tokio::test]
async fn test_augment_prompt_notes_unavailable_search() {
    let harness = Harness::new(
        ScriptedSource::new(SourceKind::Meetup, vec![Reply::status(503)]),
        ScriptedSource::new(SourceKind::Eventbrite, vec![Reply::status(503)]),
    );

    let (status, body) = post(app(&harness), "/tools/augment_prompt", json!({"prompt": "concerts"})).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["prompt"].as_str().unwrap().contains("currently unavailable"));
}

#[tokio::test]
async fn test_auth_setup_url() {
    let (status, body) = get(app(&quiet_harness()), "/tools/auth_setup_url").await;

    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with(MEETUP_AUTHORIZE_URL));
    assert!(url.contains("client_id=test-client-id"));
    assert!(url.contains("response_type=code"));
    assert!(body["text"].as_str().unwrap().contains("Instructions:"));
}

#[tokio::test]
async fn test_auth_setup_url_without_client_id() {
    // Given: no Meetup client id configured
    let harness = quiet_harness();
    let service = DiscoveryService::new(
        harness.extractor(),
        harness.engine(),
        PromptAugmenter::new(FixedOffset::east_opt(0).unwrap()),
        Arc::new(MeetupOAuth::new(
            MEETUP_AUTHORIZE_URL,
            None,
            "http://localhost:8080/".to_string(),
        )),
        harness.event_bus.clone(),
        Arc::new(harness.clock.clone()),
    );

    // When: requesting the setup URL
    let (status, body) = get(
        build_router(AppState::new(Arc::new(service))),
        "/tools/auth_setup_url",
    )
    .await;

    // Then: 503 naming the missing setting
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "NOT_CONFIGURED");
}

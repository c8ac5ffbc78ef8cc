//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use augur_api::state::{AppState, load_deck, load_spreads};
use augur_core::clock::Clock;
use augur_core::entropy::EntropySource;
use augur_core::generation::TextGenerator;
use augur_core::store::ReadingStore;
use augur_drawing::application::card_drawer::CardDrawer;
use augur_interpretation::application::orchestrator::{
    GenerationOrchestrator, OrchestratorConfig,
};
use augur_interpretation::domain::prompt::OutputFormat;
use augur_library::memory_store::InMemoryReadingStore;
use augur_library::repository::ReadingRepository;
use augur_session::application::state_machine::SessionServices;
use augur_test_support::{FailingGenerator, FixedClock, SequenceEntropy};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::at(2026, 1, 15, 10, 0, 0))
}

/// Collaborators for a test app. Defaults: deterministic entropy, a
/// generator that always fails, an in-memory store, structured output.
pub struct TestApp {
    pub entropy: Arc<dyn EntropySource>,
    pub generator: Arc<dyn TextGenerator>,
    pub store: Arc<dyn ReadingStore>,
    pub format: OutputFormat,
}

impl Default for TestApp {
    fn default() -> Self {
        Self {
            entropy: Arc::new(SequenceEntropy::new((0..200).collect())),
            generator: Arc::new(FailingGenerator::default()),
            store: Arc::new(InMemoryReadingStore::new()),
            format: OutputFormat::Structured,
        }
    }
}

impl TestApp {
    /// Builds the full router over the bundled deck and spreads.
    pub fn build(self) -> Router {
        let clock = fixed_clock();
        let deck = Arc::new(load_deck(None).unwrap());
        let spreads = Arc::new(load_spreads(None).unwrap());
        let orchestrator = GenerationOrchestrator::new(
            self.generator,
            OrchestratorConfig {
                format: self.format,
                ..OrchestratorConfig::default()
            },
        );
        let repository = ReadingRepository::new(
            self.store,
            Some(Arc::clone(&deck)),
            Arc::clone(&spreads),
            Arc::clone(&clock),
        );
        let services = SessionServices {
            drawer: CardDrawer::new(deck),
            entropy: self.entropy,
            orchestrator: Arc::new(orchestrator),
            repository: Arc::new(repository),
            clock,
        };
        augur_api::app(AppState::new(services, spreads))
    }
}

/// Build the full app router with default collaborators.
pub fn build_test_app() -> Router {
    TestApp::default().build()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };
    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a DELETE request and return the status.
pub async fn delete(app: &Router, uri: &str) -> StatusCode {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await.0
}

/// Create a session for `user_id` and return its id.
pub async fn create_session(app: &Router, user_id: &str) -> String {
    let (status, json) = post_json(
        app,
        "/api/v1/sessions",
        &serde_json::json!({ "user_id": user_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_owned()
}

/// Drive a fresh session up to the reveal step and turn every card over.
pub async fn revealed_session(app: &Router, user_id: &str, spread_id: &str) -> String {
    let id = create_session(app, user_id).await;
    let (status, _) = post_json(
        app,
        &format!("/api/v1/sessions/{id}/start"),
        &serde_json::json!({ "spread_id": spread_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(
        app,
        &format!("/api/v1/sessions/{id}/intention"),
        &serde_json::json!({ "intention": "What should I focus on this month?" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = post_empty(app, &format!("/api/v1/sessions/{id}/draw")).await;
    assert_eq!(status, StatusCode::OK);
    let count = json["cards"].as_array().unwrap().len();
    for index in 0..count {
        let (status, _) = post_json(
            app,
            &format!("/api/v1/sessions/{id}/reveal"),
            &serde_json::json!({ "position_index": index }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    id
}

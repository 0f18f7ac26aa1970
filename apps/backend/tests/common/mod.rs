//! Common test utilities and fixtures for integration tests.
//!
//! Players live in memory, so each test builds its own context and needs
//! no external services.

pub mod fixtures;

use std::time::Duration;

use axum::Router;
use axum_test::TestServer;
use serde_json::Value;

use exercise_player_backend::config::ServerConfig;
use exercise_player_backend::{router, AppState};

/// Test context holding application state and the router built over it.
pub struct TestContext {
    pub state: AppState,
    app: Router,
}

impl TestContext {
    /// Create a new test context with a fast player tick.
    pub fn new() -> Self {
        let config = ServerConfig {
            tick_interval: Duration::from_millis(10),
            ..ServerConfig::default()
        };
        let state = AppState::new(&config);
        let app = router(state.clone());

        Self { state, app }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Start a test server over this context.
    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).unwrap()
    }
}

/// Create a player and return its ID and initial view.
pub async fn create_player(server: &TestServer, request: Value) -> (String, Value) {
    let response = server.post("/api/players").json(&request).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    (body["id"].as_str().unwrap().to_string(), body["view"].clone())
}

/// Send one action and return the response body.
pub async fn act(server: &TestServer, id: &str, action: Value) -> Value {
    let response = server
        .post(&format!("/api/players/{}/actions", id))
        .json(&action)
        .await;
    response.assert_status_ok();
    response.json()
}

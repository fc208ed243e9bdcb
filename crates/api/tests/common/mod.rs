//! Common test utilities for integration tests.
//!
//! Builds the full router over the in-memory operation store and provides
//! request helpers that carry the admin identity headers.

// Helpers are shared by several test files and not every file uses all of them.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use domain::services::{SimulatedTargetHandler, TargetHandler};
use focusprint_api::{
    app::create_app,
    config::{
        BulkOperationsConfig, Config, DatabaseConfig, LoggingConfig, SecurityConfig,
        ServerConfig, StorageBackend, StorageConfig,
    },
    services::BulkOperationService,
};
use persistence::repositories::InMemoryBulkOperationRepository;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const TEST_ADMIN_ID: &str = "admin-1";
pub const TEST_ADMIN_NAME: &str = "Alice Admin";
pub const BULK_OPERATIONS_URI: &str = "/api/v1/admin/bulk-operations";

/// Test configuration: in-memory store, no batch delay.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: vec![],
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            capacity: 1000,
        },
        database: DatabaseConfig::default(),
        bulk_operations: BulkOperationsConfig {
            max_targets: 1000,
            default_batch_size: 10,
            max_batch_size: 100,
            batch_delay_ms: 0,
            max_concurrent_operations: 5,
            per_item_estimate_ms: 50,
            large_operation_threshold: 500,
            shutdown_timeout_secs: 5,
        },
    }
}

/// Router plus the service behind it.
pub struct TestApp {
    pub router: Router,
    pub service: Arc<BulkOperationService>,
}

/// Create the application with the simulated target handler.
pub fn create_test_app(config: Config) -> TestApp {
    create_test_app_with_handler(config, Arc::new(SimulatedTargetHandler::new()))
}

/// Create the application with a custom target handler.
pub fn create_test_app_with_handler(config: Config, handler: Arc<dyn TargetHandler>) -> TestApp {
    let repository = Arc::new(InMemoryBulkOperationRepository::new(config.storage.capacity));
    let service = Arc::new(BulkOperationService::new(
        repository,
        handler,
        config.bulk_operations.clone(),
    ));
    let router = create_app(config, Arc::clone(&service));
    TestApp { router, service }
}

/// JSON request carrying the test admin headers.
pub fn json_request_as_admin(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Admin-Id", TEST_ADMIN_ID)
        .header("X-Admin-Name", TEST_ADMIN_NAME)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// GET request carrying the test admin headers.
pub fn get_request_as_admin(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("X-Admin-Id", TEST_ADMIN_ID)
        .header("X-Admin-Name", TEST_ADMIN_NAME)
        .body(Body::empty())
        .unwrap()
}

/// Parse response body as JSON.
pub async fn parse_response_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or_else(|_| {
        panic!(
            "Failed to parse response body: {:?}",
            String::from_utf8_lossy(&body)
        )
    })
}

/// Submit an operation and return the status and parsed body.
pub async fn submit(app: &Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(json_request_as_admin(Method::POST, BULK_OPERATIONS_URI, body))
        .await
        .unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

/// Fetch one operation by id.
pub async fn get_operation(app: &Router, id: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(get_request_as_admin(&format!("{}/{}", BULK_OPERATIONS_URI, id)))
        .await
        .unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

/// Poll an operation until it reaches a terminal status.
pub async fn wait_for_terminal(app: &Router, id: &str) -> Value {
    for _ in 0..400 {
        let (status, body) = get_operation(app, id).await;
        assert_eq!(status, StatusCode::OK, "operation {} vanished: {}", id, body);
        let current = body["status"].as_str().unwrap_or_default();
        if !matches!(current, "pending" | "running") {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("operation {} did not reach a terminal status", id);
}

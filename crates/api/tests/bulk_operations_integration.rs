//! Integration tests for the bulk operation endpoints.
//!
//! Drive the full router over the in-memory operation store.

mod common;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{
    create_test_app, create_test_app_with_handler, get_operation, get_request_as_admin,
    json_request_as_admin, parse_response_body, submit, test_config, wait_for_terminal,
    BULK_OPERATIONS_URI,
};
use domain::models::OperationParameters;
use domain::services::{HandlerError, SimulatedTargetHandler, TargetHandler};
use fake::faker::internet::en::Username;
use fake::Fake;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower::ServiceExt;

/// Handler that blocks every target until permits are released.
struct GatedHandler {
    gate: Arc<Semaphore>,
}

impl GatedHandler {
    fn new() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: Arc::clone(&gate),
            },
            gate,
        )
    }
}

#[async_trait]
impl TargetHandler for GatedHandler {
    async fn handle(
        &self,
        target_id: &str,
        _parameters: &OperationParameters,
    ) -> Result<Value, HandlerError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| HandlerError::Failed(e.to_string()))?;
        permit.forget();
        Ok(json!({ "user_id": target_id }))
    }
}

fn enable_users(ids: &[&str]) -> Value {
    json!({
        "operation_type": "ENABLE_USERS",
        "target_type": "USERS",
        "target_ids": ids,
        "parameters": {"enabled": true},
        "reason": "Quarterly access review"
    })
}

async fn wait_for_idle_workers(app: &common::TestApp) {
    for _ in 0..400 {
        if app.service.worker_pool().active() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("worker pool did not drain");
}

// ============================================================================
// Submission
// ============================================================================

#[tokio::test]
async fn test_enable_users_completes() {
    let app = create_test_app(test_config());

    let mut body = enable_users(&["u1", "u2", "u3"]);
    body["batch_size"] = json!(2);
    let (status, response) = submit(&app.router, body).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["dry_run"], false);
    assert_eq!(response["operation"]["status"], "pending");
    assert_eq!(response["operation"]["batch_size"], 2);
    assert_eq!(response["operation"]["created_by"], "admin-1");
    assert_eq!(response["operation"]["created_by_name"], "Alice Admin");
    assert_eq!(response["validation_results"].as_array().unwrap().len(), 3);
    assert_eq!(response["estimated_duration_seconds"], 1);

    let id = response["operation"]["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("bulk_"));

    let done = wait_for_terminal(&app.router, &id).await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["progress"]["total_items"], 3);
    assert_eq!(done["progress"]["processed_items"], 3);
    assert_eq!(done["progress"]["successful_items"], 3);
    assert_eq!(done["progress"]["failed_items"], 0);
    assert_eq!(done["progress"]["percentage_complete"], 100);
    assert!(done["started_at"].is_string());
    assert!(done["completed_at"].is_string());

    let results = done["results"].as_array().unwrap();
    let order: Vec<&str> = results
        .iter()
        .map(|r| r["target_id"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["u1", "u2", "u3"]);
    assert!(results.iter().all(|r| r["success"] == true));
}

#[tokio::test]
async fn test_uneven_final_batch_is_processed() {
    let app = create_test_app(test_config());

    let targets: Vec<String> = (0..25)
        .map(|i| format!("{}-{}", Username().fake::<String>(), i))
        .collect();
    let (status, response) = submit(
        &app.router,
        json!({
            "operation_type": "RESET_USER_PASSWORDS",
            "target_type": "USERS",
            "target_ids": targets,
            "parameters": {"send_email": false},
            "batch_size": 7
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = response["operation"]["id"].as_str().unwrap();
    let done = wait_for_terminal(&app.router, id).await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["progress"]["processed_items"], 25);
    assert!(done["progress"]["current_item"].is_null());
    assert_eq!(done["results"].as_array().unwrap().len(), 25);
    assert_eq!(done["results"][24]["target_id"], targets[24].as_str());
}

#[tokio::test]
async fn test_empty_targets_rejected_and_not_stored() {
    let app = create_test_app(test_config());

    let (status, response) = submit(&app.router, enable_users(&[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "validation_error");
    assert_eq!(response["message"], "At least one target ID is required");

    let list = app
        .router
        .clone()
        .oneshot(get_request_as_admin(BULK_OPERATIONS_URI))
        .await
        .unwrap();
    let body = parse_response_body(list).await;
    assert_eq!(body["operations"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_too_many_targets_rejected() {
    let mut config = test_config();
    config.bulk_operations.max_targets = 2;
    let app = create_test_app(config);

    let (status, response) = submit(&app.router, enable_users(&["u1", "u2", "u3"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["message"]
        .as_str()
        .unwrap()
        .contains("exceeds the maximum of 2"));
}

#[tokio::test]
async fn test_missing_required_parameter_reports_every_target() {
    let app = create_test_app(test_config());

    let (status, response) = submit(
        &app.router,
        json!({
            "operation_type": "UPDATE_USER_ROLES",
            "target_type": "USERS",
            "target_ids": ["u1", "u2"],
            "parameters": {}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "validation_error");
    let details = response["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["field"], "target_ids[0]");
    assert_eq!(details[1]["field"], "target_ids[1]");
    assert!(details[0]["message"].as_str().unwrap().contains("new_role"));

    let stats = app.service.statistics().await.unwrap();
    assert_eq!(stats.total_operations, 0);
}

#[tokio::test]
async fn test_blank_target_blocks_submission_but_not_siblings_verdicts() {
    let app = create_test_app(test_config());

    let (status, response) = submit(&app.router, enable_users(&["u1", "  ", "u3"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = response["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["field"], "target_ids[1]");
    assert_eq!(details[0]["message"], "Target ID cannot be empty");
}

#[tokio::test]
async fn test_target_type_mismatch_rejected() {
    let app = create_test_app(test_config());

    let (status, response) = submit(
        &app.router,
        json!({
            "operation_type": "SUSPEND_CLIENTS",
            "target_type": "USERS",
            "target_ids": ["c1"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response["message"],
        "Operation SUSPEND_CLIENTS applies to CLIENTS, not USERS"
    );
}

#[tokio::test]
async fn test_batch_size_above_maximum_rejected() {
    let app = create_test_app(test_config());

    let mut body = enable_users(&["u1"]);
    body["batch_size"] = json!(500);
    let (status, response) = submit(&app.router, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["message"]
        .as_str()
        .unwrap()
        .contains("Batch size must be between 1 and 100"));
}

#[tokio::test]
async fn test_dry_run_returns_preview_without_storing() {
    let app = create_test_app(test_config());

    let mut body = enable_users(&["u1", "u1", "u2"]);
    body["dry_run"] = json!(true);
    let (status, response) = submit(&app.router, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["dry_run"], true);
    let warnings: Vec<&str> = response["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w.as_str().unwrap())
        .collect();
    assert!(warnings.contains(&"Dry run: no changes will be made"));
    assert!(warnings
        .iter()
        .any(|w| w.contains("appear more than once")));

    let id = response["operation"]["id"].as_str().unwrap();
    let (status, _) = get_operation(&app.router, id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_without_admin_header_is_unauthorized() {
    let app = create_test_app(test_config());

    let request = Request::builder()
        .method(Method::POST)
        .uri(BULK_OPERATIONS_URI)
        .header("content-type", "application/json")
        .body(Body::from(enable_users(&["u1"]).to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "unauthorized");
}

// ============================================================================
// Processing outcomes
// ============================================================================

#[tokio::test]
async fn test_missing_target_yields_partial_success() {
    let app = create_test_app_with_handler(
        test_config(),
        Arc::new(SimulatedTargetHandler::with_missing(["u2"])),
    );

    let (status, response) = submit(&app.router, enable_users(&["u1", "u2", "u3"])).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = response["operation"]["id"].as_str().unwrap();

    let done = wait_for_terminal(&app.router, id).await;
    assert_eq!(done["status"], "partial_success");
    assert_eq!(done["progress"]["successful_items"], 2);
    assert_eq!(done["progress"]["failed_items"], 1);
    assert_eq!(done["results"][1]["success"], false);
    assert_eq!(done["results"][1]["error"], "Target not found: u2");
    assert_eq!(done["results"][2]["success"], true);
}

#[tokio::test]
async fn test_every_target_missing_yields_failed() {
    let app = create_test_app_with_handler(
        test_config(),
        Arc::new(SimulatedTargetHandler::with_missing(["u1", "u2"])),
    );

    let (_, response) = submit(&app.router, enable_users(&["u1", "u2"])).await;
    let id = response["operation"]["id"].as_str().unwrap();

    let done = wait_for_terminal(&app.router, id).await;
    assert_eq!(done["status"], "failed");
    assert_eq!(done["progress"]["processed_items"], 2);
}

// ============================================================================
// Store capacity, queries and statistics
// ============================================================================

#[tokio::test]
async fn test_capacity_evicts_oldest_operation() {
    let mut config = test_config();
    config.storage.capacity = 2;
    let app = create_test_app(config);

    let mut ids = Vec::new();
    for target in ["u1", "u2", "u3"] {
        let (status, response) = submit(&app.router, enable_users(&[target])).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = response["operation"]["id"].as_str().unwrap().to_string();
        wait_for_terminal(&app.router, &id).await;
        ids.push(id);
    }

    let (status, _) = get_operation(&app.router, &ids[0]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let response = app
        .router
        .clone()
        .oneshot(get_request_as_admin(BULK_OPERATIONS_URI))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    let listed: Vec<&str> = body["operations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|op| op["id"].as_str().unwrap())
        .collect();
    assert_eq!(listed, vec![ids[2].as_str(), ids[1].as_str()]);
}

#[tokio::test]
async fn test_list_filters_paginates_and_summarizes() {
    let app = create_test_app(test_config());

    for ids in [&["u1"][..], &["u2", "u3"][..], &["u4"][..]] {
        let (_, response) = submit(&app.router, enable_users(ids)).await;
        wait_for_terminal(&app.router, response["operation"]["id"].as_str().unwrap()).await;
    }
    let (_, response) = submit(
        &app.router,
        json!({
            "operation_type": "EXTEND_LICENSES",
            "target_type": "LICENSES",
            "target_ids": ["l1"],
            "parameters": {"extension_days": 30},
            "reason": "Renewal campaign"
        }),
    )
    .await;
    wait_for_terminal(&app.router, response["operation"]["id"].as_str().unwrap()).await;

    let uri = format!("{}?operation_type=ENABLE_USERS&limit=2&page=1", BULK_OPERATIONS_URI);
    let body = parse_response_body(
        app.router
            .clone()
            .oneshot(get_request_as_admin(&uri))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["operations"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["pagination"]["has_next"], true);
    assert_eq!(body["filters"]["operation_type"], "ENABLE_USERS");
    assert_eq!(body["summary"]["total_operations"], 3);
    assert_eq!(body["summary"]["total_targets"], 4);

    let uri = format!("{}?search=renewal", BULK_OPERATIONS_URI);
    let body = parse_response_body(
        app.router
            .clone()
            .oneshot(get_request_as_admin(&uri))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["operations"].as_array().unwrap().len(), 1);
    assert_eq!(body["operations"][0]["operation_type"], "EXTEND_LICENSES");
    assert_eq!(body["operations"][0]["parameters"]["extension_days"], 30);

    let uri = format!("{}?status=completed&target_type=LICENSES", BULK_OPERATIONS_URI);
    let body = parse_response_body(
        app.router
            .clone()
            .oneshot(get_request_as_admin(&uri))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_statistics_endpoint() {
    let app = create_test_app_with_handler(
        test_config(),
        Arc::new(SimulatedTargetHandler::with_missing(["u2"])),
    );

    let (_, response) = submit(&app.router, enable_users(&["u1", "u2"])).await;
    wait_for_terminal(&app.router, response["operation"]["id"].as_str().unwrap()).await;
    let (_, response) = submit(&app.router, enable_users(&["u3"])).await;
    wait_for_terminal(&app.router, response["operation"]["id"].as_str().unwrap()).await;

    let uri = format!("{}/statistics", BULK_OPERATIONS_URI);
    let response = app
        .router
        .clone()
        .oneshot(get_request_as_admin(&uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stats = parse_response_body(response).await;
    assert_eq!(stats["total_operations"], 2);
    assert_eq!(stats["by_status"]["completed"], 1);
    assert_eq!(stats["by_status"]["partial_success"], 1);
    assert_eq!(stats["total_targets"], 3);
    assert_eq!(stats["successful_items"], 2);
    assert_eq!(stats["failed_items"], 1);
}

#[tokio::test]
async fn test_operation_types_endpoint() {
    let app = create_test_app(test_config());

    let uri = format!("{}/types", BULK_OPERATIONS_URI);
    let response = app
        .router
        .clone()
        .oneshot(get_request_as_admin(&uri))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    let types = body.as_array().unwrap();
    assert_eq!(types.len(), 11);
    assert!(types
        .iter()
        .any(|t| t["operation_type"] == "CHANGE_CLIENT_PLANS"
            && t["required_parameters"] == json!(["new_plan_id"])));
}

#[tokio::test]
async fn test_get_unknown_operation_is_not_found() {
    let app = create_test_app(test_config());

    let (status, body) = get_operation(&app.router, "bulk_0_missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

// ============================================================================
// Cancellation and concurrency
// ============================================================================

#[tokio::test]
async fn test_cancel_running_operation_keeps_cancelled_status() {
    let (handler, gate) = GatedHandler::new();
    let app = create_test_app_with_handler(test_config(), Arc::new(handler));

    let mut body = enable_users(&["u1", "u2", "u3"]);
    body["batch_size"] = json!(1);
    let (_, response) = submit(&app.router, body).await;
    let id = response["operation"]["id"].as_str().unwrap().to_string();

    let uri = format!("{}/{}/cancel", BULK_OPERATIONS_URI, id);
    let response = app
        .router
        .clone()
        .oneshot(json_request_as_admin(
            Method::POST,
            &uri,
            json!({"reason": "Wrong list"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["success"], true);

    gate.add_permits(10);
    wait_for_idle_workers(&app).await;

    let (_, op) = get_operation(&app.router, &id).await;
    assert_eq!(op["status"], "cancelled");
    assert_eq!(op["error_message"], "Cancelled by Alice Admin: Wrong list");
    let processed = op["progress"]["processed_items"].as_u64().unwrap();
    assert!(processed <= 1);
    assert_eq!(op["results"].as_array().unwrap().len() as u64, processed);

    // Cancelling again conflicts.
    let response = app
        .router
        .clone()
        .oneshot(json_request_as_admin(Method::POST, &uri, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_with_malformed_body_is_rejected() {
    let (handler, gate) = GatedHandler::new();
    let app = create_test_app_with_handler(test_config(), Arc::new(handler));

    let (_, response) = submit(&app.router, enable_users(&["u1"])).await;
    let id = response["operation"]["id"].as_str().unwrap().to_string();
    let uri = format!("{}/{}/cancel", BULK_OPERATIONS_URI, id);

    let request = Request::builder()
        .method(Method::POST)
        .uri(&uri)
        .header("content-type", "application/json")
        .header("X-Admin-Id", "admin-1")
        .body(Body::from("{reason: oops"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");

    let (_, op) = get_operation(&app.router, &id).await;
    assert_ne!(op["status"], "cancelled");

    let response = app
        .router
        .clone()
        .oneshot(json_request_as_admin(
            Method::POST,
            &uri,
            json!({"reason": "Duplicate request"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let (_, op) = get_operation(&app.router, &id).await;
    assert_eq!(op["error_message"], "Cancelled by Alice Admin: Duplicate request");

    gate.add_permits(1);
    wait_for_idle_workers(&app).await;
}

#[tokio::test]
async fn test_cancel_finished_operation_conflicts() {
    let app = create_test_app(test_config());

    let (_, response) = submit(&app.router, enable_users(&["u1"])).await;
    let id = response["operation"]["id"].as_str().unwrap().to_string();
    wait_for_terminal(&app.router, &id).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("{}/{}/cancel", BULK_OPERATIONS_URI, id))
        .header("X-Admin-Id", "admin-2")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_cancel_unknown_operation_is_not_found() {
    let app = create_test_app(test_config());

    let uri = format!("{}/bulk_0_missing/cancel", BULK_OPERATIONS_URI);
    let response = app
        .router
        .clone()
        .oneshot(json_request_as_admin(Method::POST, &uri, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrency_limit_rejects_extra_submissions() {
    let mut config = test_config();
    config.bulk_operations.max_concurrent_operations = 1;
    let (handler, gate) = GatedHandler::new();
    let app = create_test_app_with_handler(config, Arc::new(handler));

    let (status, first) = submit(&app.router, enable_users(&["u1"])).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = submit(&app.router, enable_users(&["u2"])).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "too_many_operations");

    let stats = app.service.statistics().await.unwrap();
    assert_eq!(stats.total_operations, 1);

    gate.add_permits(1);
    let id = first["operation"]["id"].as_str().unwrap();
    let done = wait_for_terminal(&app.router, id).await;
    assert_eq!(done["status"], "completed");
    wait_for_idle_workers(&app).await;

    let (status, _) = submit(&app.router, enable_users(&["u2"])).await;
    assert_eq!(status, StatusCode::CREATED);
    gate.add_permits(1);
}

// ============================================================================
// Ambient endpoints
// ============================================================================

#[tokio::test]
async fn test_health_reports_memory_store() {
    let app = create_test_app(test_config());

    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-frame-options"], "DENY");

    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"]["backend"], "memory");
    assert_eq!(body["workers"]["max"], 5);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app(test_config());

    let request = Request::builder()
        .uri("/api/health/live")
        .header("X-Request-ID", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

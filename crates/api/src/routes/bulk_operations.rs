//! Admin bulk operation routes.
//!
//! The admin is identified by the `X-Admin-Id` and `X-Admin-Name` headers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::models::{CancelOperationRequest, ListOperationsQuery, SubmitBulkOperationRequest};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AdminActor;

/// POST /api/v1/admin/bulk-operations
///
/// Validates and queues a bulk operation. Returns 201 with the pending
/// operation, or 200 for a dry run.
pub async fn submit_operation(
    State(state): State<AppState>,
    actor: AdminActor,
    Json(request): Json<SubmitBulkOperationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.service.submit(&actor, request).await?;

    let status = if response.dry_run {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(response)))
}

/// GET /api/v1/admin/bulk-operations
pub async fn list_operations(
    State(state): State<AppState>,
    _actor: AdminActor,
    Query(query): Query<ListOperationsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.service.list(&query).await?;
    Ok(Json(response))
}

/// GET /api/v1/admin/bulk-operations/statistics
pub async fn get_statistics(
    State(state): State<AppState>,
    _actor: AdminActor,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.service.statistics().await?;
    Ok(Json(stats))
}

/// GET /api/v1/admin/bulk-operations/types
pub async fn list_operation_types(
    State(state): State<AppState>,
    _actor: AdminActor,
) -> impl IntoResponse {
    Json(state.service.operation_types())
}

/// GET /api/v1/admin/bulk-operations/:operation_id
pub async fn get_operation(
    State(state): State<AppState>,
    _actor: AdminActor,
    Path(operation_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let operation = state.service.get(&operation_id).await?;
    Ok(Json(operation))
}

/// POST /api/v1/admin/bulk-operations/:operation_id/cancel
///
/// The body is optional; `{"reason": "..."}` is recorded with the cancellation.
/// A body that is present but not valid JSON is rejected.
pub async fn cancel_operation(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(operation_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request = parse_cancel_body(&body)?;
    let response = state
        .service
        .cancel(&actor, &operation_id, request)
        .await?;
    Ok(Json(response))
}

fn parse_cancel_body(body: &[u8]) -> Result<CancelOperationRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CancelOperationRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::validation(format!("Invalid cancel request body: {}", e)))
}

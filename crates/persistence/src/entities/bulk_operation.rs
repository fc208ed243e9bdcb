//! Bulk operation entity.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

/// Database row for a bulk operation.
///
/// Structured fields (targets, parameters, progress, results) are stored as
/// JSONB and decoded by the repository.
#[derive(Debug, Clone, FromRow)]
pub struct BulkOperationEntity {
    /// Public identifier (`bulk_<millis>_<suffix>`).
    pub id: String,
    pub operation_type: String,
    pub target_type: String,
    /// JSON array of target id strings, in submission order.
    pub target_ids: JsonValue,
    pub parameters: JsonValue,
    pub reason: Option<String>,
    pub metadata: Option<JsonValue>,
    pub batch_size: i32,
    pub status: String,
    pub progress: JsonValue,
    pub results: JsonValue,
    pub created_by: String,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bulk_operation_entity_creation() {
        let now = Utc::now();
        let entity = BulkOperationEntity {
            id: "bulk_1700000000000_abcdefghi".to_string(),
            operation_type: "REVOKE_LICENSES".to_string(),
            target_type: "LICENSES".to_string(),
            target_ids: json!(["l1", "l2"]),
            parameters: json!({}),
            reason: None,
            metadata: None,
            batch_size: 10,
            status: "pending".to_string(),
            progress: json!({}),
            results: json!([]),
            created_by: "admin-1".to_string(),
            created_by_name: "Admin".to_string(),
            created_at: now,
            started_at: None,
            completed_at: None,
            error_message: None,
        };

        assert_eq!(entity.batch_size, 10);
        assert_eq!(entity.target_ids.as_array().map(Vec::len), Some(2));
    }
}

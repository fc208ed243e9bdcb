//! PostgreSQL operation store.

use chrono::{DateTime, Utc};
use domain::models::{
    BulkOperation, OperationFilter, OperationParameters, OperationPatch, OperationProgress,
    OperationStatus, OperationType, TargetResult, TargetType,
};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use super::bulk_operation::BulkOperationRepository;
use crate::entities::BulkOperationEntity;
use crate::error::RepositoryError;
use crate::metrics::timed;

const SELECT_COLUMNS: &str = r#"
    id, operation_type, target_type, target_ids, parameters, reason, metadata,
    batch_size, status, progress, results, created_by, created_by_name,
    created_at, started_at, completed_at, error_message
"#;

/// Builds the dynamic WHERE clause for an operation filter.
struct OperationFilterBuilder {
    conditions: Vec<String>,
}

impl OperationFilterBuilder {
    fn build(filter: &OperationFilter) -> Self {
        let mut conditions = vec!["TRUE".to_string()];
        let mut param_count = 0;
        let mut next = || {
            param_count += 1;
            param_count
        };

        if filter.operation_type.is_some() {
            conditions.push(format!("operation_type = ${}", next()));
        }
        if filter.target_type.is_some() {
            conditions.push(format!("target_type = ${}", next()));
        }
        if filter.status.is_some() {
            conditions.push(format!("status = ${}", next()));
        }
        if filter.created_by.is_some() {
            conditions.push(format!("created_by = ${}", next()));
        }
        if filter.created_after.is_some() {
            conditions.push(format!("created_at >= ${}", next()));
        }
        if filter.created_before.is_some() {
            conditions.push(format!("created_at <= ${}", next()));
        }
        if filter.search_term().is_some() {
            let p = next();
            conditions.push(format!(
                "(LOWER(id) LIKE ${p} OR LOWER(COALESCE(reason, '')) LIKE ${p} \
                 OR LOWER(created_by_name) LIKE ${p} OR LOWER(operation_type) LIKE ${p})"
            ));
        }

        Self { conditions }
    }

    fn where_clause(&self) -> String {
        self.conditions.join(" AND ")
    }
}

/// Escapes LIKE wildcards so the search term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

macro_rules! bind_operation_filters {
    ($builder:expr, $filter:expr) => {{
        let mut b = $builder;
        if let Some(operation_type) = $filter.operation_type {
            b = b.bind(operation_type.as_str());
        }
        if let Some(target_type) = $filter.target_type {
            b = b.bind(target_type.as_str());
        }
        if let Some(status) = $filter.status {
            b = b.bind(status.as_str());
        }
        if let Some(ref created_by) = $filter.created_by {
            b = b.bind(created_by.clone());
        }
        if let Some(created_after) = $filter.created_after {
            b = b.bind(created_after);
        }
        if let Some(created_before) = $filter.created_before {
            b = b.bind(created_before);
        }
        if let Some(term) = $filter.search_term() {
            b = b.bind(like_pattern(&term));
        }
        b
    }};
}

/// Durable store for deployments that keep operation history across restarts.
#[derive(Clone)]
pub struct PgBulkOperationRepository {
    pool: PgPool,
    capacity: usize,
}

impl PgBulkOperationRepository {
    pub fn new(pool: PgPool, capacity: usize) -> Self {
        Self {
            pool,
            capacity: capacity.max(1),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn evict_beyond_capacity(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM bulk_operations
            WHERE id IN (
                SELECT id FROM bulk_operations
                ORDER BY created_at DESC, seq DESC
                OFFSET $1
            )
            "#,
        )
        .bind(self.capacity as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

struct PatchColumns {
    status: Option<&'static str>,
    progress: Option<JsonValue>,
    results: Option<JsonValue>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl PatchColumns {
    fn from_patch(patch: OperationPatch) -> Result<Self, RepositoryError> {
        Ok(Self {
            status: patch.status.map(|s| s.as_str()),
            progress: patch.progress.map(serde_json::to_value).transpose()?,
            results: patch.results.map(serde_json::to_value).transpose()?,
            started_at: patch.started_at,
            completed_at: patch.completed_at,
            error_message: patch.error_message,
        })
    }
}

const UPDATE_SQL: &str = r#"
    UPDATE bulk_operations
    SET status = COALESCE($2, status),
        progress = COALESCE($3, progress),
        results = COALESCE($4, results),
        started_at = COALESCE($5, started_at),
        completed_at = COALESCE($6, completed_at),
        error_message = COALESCE($7, error_message)
    WHERE id = $1 AND ($8::text[] IS NULL OR status = ANY($8))
"#;

impl PgBulkOperationRepository {
    async fn apply_patch(
        &self,
        id: &str,
        allowed: Option<Vec<String>>,
        patch: OperationPatch,
    ) -> Result<bool, RepositoryError> {
        let columns = PatchColumns::from_patch(patch)?;
        let result = sqlx::query(UPDATE_SQL)
            .bind(id)
            .bind(columns.status)
            .bind(columns.progress)
            .bind(columns.results)
            .bind(columns.started_at)
            .bind(columns.completed_at)
            .bind(columns.error_message)
            .bind(allowed)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl BulkOperationRepository for PgBulkOperationRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn add(&self, operation: BulkOperation) -> Result<(), RepositoryError> {
        let target_ids = serde_json::to_value(&operation.target_ids)?;
        let progress = serde_json::to_value(&operation.progress)?;
        let results = serde_json::to_value(&operation.results)?;

        timed(
            "bulk_operations.insert",
            sqlx::query(
                r#"
                INSERT INTO bulk_operations (
                    id, operation_type, target_type, target_ids, parameters, reason, metadata,
                    batch_size, status, progress, results, created_by, created_by_name,
                    created_at, started_at, completed_at, error_message
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                "#,
            )
            .bind(&operation.id)
            .bind(operation.operation_type.as_str())
            .bind(operation.target_type.as_str())
            .bind(target_ids)
            .bind(operation.parameters.to_json())
            .bind(&operation.reason)
            .bind(&operation.metadata)
            .bind(operation.batch_size as i32)
            .bind(operation.status.as_str())
            .bind(progress)
            .bind(results)
            .bind(&operation.created_by)
            .bind(&operation.created_by_name)
            .bind(operation.created_at)
            .bind(operation.started_at)
            .bind(operation.completed_at)
            .bind(&operation.error_message)
            .execute(&self.pool),
        )
        .await?;

        let evicted = self.evict_beyond_capacity().await?;
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted oldest bulk operations");
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<BulkOperation>, RepositoryError> {
        let query = format!("SELECT {} FROM bulk_operations WHERE id = $1", SELECT_COLUMNS);
        let entity = timed(
            "bulk_operations.get_by_id",
            sqlx::query_as::<_, BulkOperationEntity>(&query)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;

        entity.map(entity_to_domain).transpose()
    }

    async fn update(&self, id: &str, patch: OperationPatch) -> Result<bool, RepositoryError> {
        timed("bulk_operations.update", self.apply_patch(id, None, patch)).await
    }

    async fn update_if_status(
        &self,
        id: &str,
        allowed: &[OperationStatus],
        patch: OperationPatch,
    ) -> Result<bool, RepositoryError> {
        let allowed = allowed.iter().map(|s| s.as_str().to_string()).collect();
        timed(
            "bulk_operations.update_if_status",
            self.apply_patch(id, Some(allowed), patch),
        )
        .await
    }

    async fn filter(&self, filter: &OperationFilter) -> Result<Vec<BulkOperation>, RepositoryError> {
        let builder = OperationFilterBuilder::build(filter);
        let query = format!(
            "SELECT {} FROM bulk_operations WHERE {} ORDER BY created_at DESC, seq DESC",
            SELECT_COLUMNS,
            builder.where_clause()
        );

        let list_builder = sqlx::query_as::<_, BulkOperationEntity>(&query);
        let list_builder = bind_operation_filters!(list_builder, filter);
        let entities = timed("bulk_operations.filter", list_builder.fetch_all(&self.pool)).await?;

        entities.into_iter().map(entity_to_domain).collect()
    }

    async fn fail_interrupted(&self, message: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE bulk_operations
            SET status = 'failed', error_message = $1, completed_at = NOW()
            WHERE status IN ('pending', 'running')
            "#,
        )
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        timed(
            "bulk_operations.ping",
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}

fn corrupt(id: &str, reason: impl Into<String>) -> RepositoryError {
    RepositoryError::Corrupt {
        id: id.to_string(),
        reason: reason.into(),
    }
}

fn entity_to_domain(entity: BulkOperationEntity) -> Result<BulkOperation, RepositoryError> {
    let id = entity.id;
    let operation_type: OperationType = entity
        .operation_type
        .parse()
        .map_err(|e: String| corrupt(&id, e))?;
    let target_type: TargetType = entity
        .target_type
        .parse()
        .map_err(|e: String| corrupt(&id, e))?;
    let status: OperationStatus = entity.status.parse().map_err(|e: String| corrupt(&id, e))?;

    let raw_parameters = match entity.parameters {
        JsonValue::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    let parameters = OperationParameters::parse(operation_type, &raw_parameters)
        .map_err(|e| corrupt(&id, e.to_string()))?;

    let target_ids: Vec<String> = serde_json::from_value(entity.target_ids)?;
    let progress: OperationProgress = serde_json::from_value(entity.progress)?;
    let results: Vec<TargetResult> = serde_json::from_value(entity.results)?;

    Ok(BulkOperation {
        id,
        operation_type,
        target_type,
        target_ids,
        parameters,
        reason: entity.reason,
        metadata: entity.metadata,
        batch_size: entity.batch_size.max(1) as usize,
        status,
        progress,
        results,
        created_by: entity.created_by,
        created_by_name: entity.created_by_name,
        created_at: entity.created_at,
        started_at: entity.started_at,
        completed_at: entity.completed_at,
        error_message: entity.error_message,
    })
}

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::store::{status, StatusQueryRecord, StatusQueryStore};

const COLUMNS: &str = "id, originator_conversation_id, target_kind, target_reference, status, \
                       transaction_status, created_at, updated_at";

/// Postgres store for transaction-status queries
pub struct StatusQueryRepository {
    pool: PgPool,
}

impl StatusQueryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusQueryStore for StatusQueryRepository {
    async fn insert(
        &self,
        originator_conversation_id: &str,
        target_kind: &str,
        target_reference: &str,
    ) -> Result<StatusQueryRecord, DatabaseError> {
        sqlx::query_as::<_, StatusQueryRecord>(&format!(
            "INSERT INTO status_queries \
             (originator_conversation_id, target_kind, target_reference, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        ))
        .bind(originator_conversation_id)
        .bind(target_kind)
        .bind(target_reference)
        .bind(status::PENDING)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn find_by_originator_id(
        &self,
        originator_conversation_id: &str,
    ) -> Result<Option<StatusQueryRecord>, DatabaseError> {
        sqlx::query_as::<_, StatusQueryRecord>(&format!(
            "SELECT {COLUMNS} FROM status_queries WHERE originator_conversation_id = $1"
        ))
        .bind(originator_conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn resolve_if_pending(
        &self,
        id: Uuid,
        new_status: &str,
        transaction_status: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE status_queries \
             SET status = $2, transaction_status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(new_status)
        .bind(transaction_status)
        .bind(status::PENDING)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

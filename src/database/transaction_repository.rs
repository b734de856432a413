use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::store::{status, NewTransaction, TransactionRecord, TransactionStore};

const COLUMNS: &str = "id, chama_id, user_id, amount, kind, status, payment_method, reference, \
                       description, mpesa_transaction_id, metadata, created_at, updated_at";

/// Postgres store for deposits and ledger entries
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for TransactionRepository {
    async fn insert(&self, record: NewTransaction) -> Result<TransactionRecord, DatabaseError> {
        sqlx::query_as::<_, TransactionRecord>(&format!(
            "INSERT INTO transactions \
             (chama_id, user_id, amount, kind, status, payment_method, reference, description, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        ))
        .bind(record.chama_id)
        .bind(record.user_id)
        .bind(record.amount)
        .bind(&record.kind)
        .bind(&record.status)
        .bind(&record.payment_method)
        .bind(&record.reference)
        .bind(&record.description)
        .bind(&record.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn merge_metadata(&self, id: Uuid, patch: JsonValue) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE transactions \
             SET metadata = metadata || $2::jsonb, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(patch)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    async fn find_by_checkout_request_id(
        &self,
        checkout_request_id: &str,
    ) -> Result<Option<TransactionRecord>, DatabaseError> {
        sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {COLUMNS} FROM transactions \
             WHERE metadata->>'checkout_request_id' = $1"
        ))
        .bind(checkout_request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn complete_if_pending(
        &self,
        id: Uuid,
        mpesa_transaction_id: Option<&str>,
        metadata_patch: JsonValue,
    ) -> Result<bool, DatabaseError> {
        // Compare-and-set: duplicate callbacks find no pending row and
        // affect nothing. The metadata merge rides the same statement so a
        // completed row can never be missing its receipt details.
        let result = sqlx::query(
            "UPDATE transactions \
             SET status = $2, mpesa_transaction_id = $3, \
                 metadata = metadata || $4::jsonb, updated_at = NOW() \
             WHERE id = $1 AND status = $5",
        )
        .bind(id)
        .bind(status::COMPLETED)
        .bind(mpesa_transaction_id)
        .bind(metadata_patch)
        .bind(status::PENDING)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn fail_if_pending(&self, id: Uuid, description: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE transactions \
             SET status = $2, description = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(status::FAILED)
        .bind(description)
        .bind(status::PENDING)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_by_reference_if_pending(
        &self,
        reference: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE transactions \
             SET status = $2, updated_at = NOW() \
             WHERE reference = $1 AND status = $3",
        )
        .bind(reference)
        .bind(status::COMPLETED)
        .bind(status::PENDING)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn total_completed_for_user(&self, user_id: Uuid) -> Result<BigDecimal, DatabaseError> {
        let total: Option<BigDecimal> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM transactions \
             WHERE user_id = $1 AND status = $2 AND kind IN ('deposit', 'contribution')",
        )
        .bind(user_id)
        .bind(status::COMPLETED)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(total.unwrap_or_else(|| BigDecimal::from(0)))
    }
}

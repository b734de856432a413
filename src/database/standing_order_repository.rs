use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::store::{status, NewStandingOrder, StandingOrderRecord, StandingOrderStore};

const COLUMNS: &str = "id, chama_id, user_id, name, amount, frequency, start_date, end_date, \
                       status, mpesa_response_id, mpesa_transaction_id, metadata, created_at, \
                       updated_at";

/// Postgres store for Ratiba standing orders
pub struct StandingOrderRepository {
    pool: PgPool,
}

impl StandingOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StandingOrderStore for StandingOrderRepository {
    async fn insert(
        &self,
        record: NewStandingOrder,
    ) -> Result<StandingOrderRecord, DatabaseError> {
        sqlx::query_as::<_, StandingOrderRecord>(&format!(
            "INSERT INTO standing_orders \
             (chama_id, user_id, name, amount, frequency, start_date, end_date, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        ))
        .bind(record.chama_id)
        .bind(record.user_id)
        .bind(&record.name)
        .bind(record.amount)
        .bind(&record.frequency)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(status::PENDING)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn set_response_ref(
        &self,
        id: Uuid,
        mpesa_response_id: &str,
        metadata: JsonValue,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE standing_orders \
             SET mpesa_response_id = $2, metadata = metadata || $3::jsonb, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(mpesa_response_id)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    async fn find_by_response_ref(
        &self,
        mpesa_response_id: &str,
    ) -> Result<Option<StandingOrderRecord>, DatabaseError> {
        sqlx::query_as::<_, StandingOrderRecord>(&format!(
            "SELECT {COLUMNS} FROM standing_orders WHERE mpesa_response_id = $1"
        ))
        .bind(mpesa_response_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn transition_if_pending(
        &self,
        id: Uuid,
        new_status: &str,
        mpesa_transaction_id: Option<&str>,
        metadata: JsonValue,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE standing_orders \
             SET status = $2, mpesa_transaction_id = COALESCE($3, mpesa_transaction_id), \
                 metadata = metadata || $4::jsonb, updated_at = NOW() \
             WHERE id = $1 AND status = $5",
        )
        .bind(id)
        .bind(new_status)
        .bind(mpesa_transaction_id)
        .bind(metadata)
        .bind(status::PENDING)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn fail_if_pending(&self, id: Uuid, description: &str) -> Result<bool, DatabaseError> {
        self.transition_if_pending(
            id,
            status::FAILED,
            None,
            serde_json::json!({ "failure_reason": description }),
        )
        .await
    }
}

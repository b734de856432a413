use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::store::{status, NewPayout, NewTransaction, PayoutRecord, PayoutStore};

const COLUMNS: &str = "id, chama_id, user_id, amount, phone_number, status, \
                       originator_conversation_id, conversation_id, result_code, result_desc, \
                       transaction_id, remarks, completed_at, created_at, updated_at";

/// Postgres store for B2C payouts
pub struct PayoutRepository {
    pool: PgPool,
}

impl PayoutRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PayoutStore for PayoutRepository {
    async fn insert(&self, record: NewPayout) -> Result<PayoutRecord, DatabaseError> {
        sqlx::query_as::<_, PayoutRecord>(&format!(
            "INSERT INTO payouts \
             (chama_id, user_id, amount, phone_number, status, originator_conversation_id, remarks) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        ))
        .bind(record.chama_id)
        .bind(record.user_id)
        .bind(record.amount)
        .bind(&record.phone_number)
        .bind(status::PENDING)
        .bind(&record.originator_conversation_id)
        .bind(&record.remarks)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn set_conversation_id(
        &self,
        id: Uuid,
        conversation_id: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE payouts SET conversation_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(conversation_id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    async fn find_by_originator_id(
        &self,
        originator_conversation_id: &str,
    ) -> Result<Option<PayoutRecord>, DatabaseError> {
        sqlx::query_as::<_, PayoutRecord>(&format!(
            "SELECT {COLUMNS} FROM payouts WHERE originator_conversation_id = $1"
        ))
        .bind(originator_conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn complete_with_side_effects(
        &self,
        id: Uuid,
        result_code: &str,
        result_desc: &str,
        transaction_id: Option<&str>,
        ledger: NewTransaction,
    ) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let completed = sqlx::query(
            "UPDATE payouts \
             SET status = $2, result_code = $3, result_desc = $4, transaction_id = $5, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = $6",
        )
        .bind(id)
        .bind(status::COMPLETED)
        .bind(result_code)
        .bind(result_desc)
        .bind(transaction_id)
        .bind(status::PENDING)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        if completed.rows_affected() == 0 {
            return Ok(false);
        }

        let decremented = sqlx::query(
            "UPDATE chamas SET balance = balance - $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(ledger.chama_id)
        .bind(&ledger.amount)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        if decremented.rows_affected() == 0 {
            // Dropping the transaction rolls the status flip back, so the
            // payout stays pending for the provider retry
            return Err(DatabaseError::new(DatabaseErrorKind::NotFound {
                entity: "Chama".to_string(),
                id: ledger.chama_id.to_string(),
            }));
        }

        sqlx::query(
            "INSERT INTO transactions \
             (chama_id, user_id, amount, kind, status, payment_method, reference, description, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(ledger.chama_id)
        .bind(ledger.user_id)
        .bind(ledger.amount)
        .bind(&ledger.kind)
        .bind(&ledger.status)
        .bind(&ledger.payment_method)
        .bind(&ledger.reference)
        .bind(&ledger.description)
        .bind(&ledger.metadata)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;
        Ok(true)
    }

    async fn fail_if_pending(
        &self,
        id: Uuid,
        result_code: Option<&str>,
        result_desc: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE payouts \
             SET status = $2, result_code = $3, result_desc = $4, updated_at = NOW() \
             WHERE id = $1 AND status = $5",
        )
        .bind(id)
        .bind(status::FAILED)
        .bind(result_code)
        .bind(result_desc)
        .bind(status::PENDING)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_by_originator_if_pending(
        &self,
        originator_conversation_id: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE payouts \
             SET status = $2, completed_at = NOW(), updated_at = NOW() \
             WHERE originator_conversation_id = $1 AND status = $3",
        )
        .bind(originator_conversation_id)
        .bind(status::COMPLETED)
        .bind(status::PENDING)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

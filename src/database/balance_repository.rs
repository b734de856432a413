use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::store::{status, AccountBalances, BalanceQueryRecord, BalanceStore};

const COLUMNS: &str = "id, chama_id, originator_conversation_id, conversation_id, status, \
                       working_balance, utility_balance, charges_paid_balance, result_desc, \
                       created_at, updated_at";

/// Postgres store for balance-query snapshots
pub struct BalanceRepository {
    pool: PgPool,
}

impl BalanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BalanceStore for BalanceRepository {
    async fn insert_query(
        &self,
        chama_id: Uuid,
        originator_conversation_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<BalanceQueryRecord, DatabaseError> {
        sqlx::query_as::<_, BalanceQueryRecord>(&format!(
            "INSERT INTO balance_history \
             (chama_id, originator_conversation_id, conversation_id, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        ))
        .bind(chama_id)
        .bind(originator_conversation_id)
        .bind(conversation_id)
        .bind(status::PENDING)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn find_by_originator_id(
        &self,
        originator_conversation_id: &str,
    ) -> Result<Option<BalanceQueryRecord>, DatabaseError> {
        sqlx::query_as::<_, BalanceQueryRecord>(&format!(
            "SELECT {COLUMNS} FROM balance_history WHERE originator_conversation_id = $1"
        ))
        .bind(originator_conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn record_balances_if_pending(
        &self,
        originator_conversation_id: &str,
        balances: &AccountBalances,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE balance_history \
             SET status = $2, working_balance = $3, utility_balance = $4, \
                 charges_paid_balance = $5, updated_at = NOW() \
             WHERE originator_conversation_id = $1 AND status = $6",
        )
        .bind(originator_conversation_id)
        .bind(status::COMPLETED)
        .bind(balances.working)
        .bind(balances.utility)
        .bind(balances.charges_paid)
        .bind(status::PENDING)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn fail_if_pending(
        &self,
        originator_conversation_id: &str,
        description: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE balance_history \
             SET status = $2, result_desc = $3, updated_at = NOW() \
             WHERE originator_conversation_id = $1 AND status = $4",
        )
        .bind(originator_conversation_id)
        .bind(status::FAILED)
        .bind(description)
        .bind(status::PENDING)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

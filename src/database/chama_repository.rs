use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::error::DatabaseError;
use crate::store::{ChamaStore, MemberProfile};

/// Postgres store for the member directory
pub struct ChamaRepository {
    pool: PgPool,
}

impl ChamaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChamaStore for ChamaRepository {
    async fn find_member_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<MemberProfile>, DatabaseError> {
        sqlx::query_as::<_, MemberProfile>(
            "SELECT p.id AS user_id, p.first_name, m.chama_id \
             FROM profiles p \
             JOIN chama_members m ON m.user_id = p.id \
             WHERE p.phone_number = $1 \
             ORDER BY m.created_at ASC \
             LIMIT 1",
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}

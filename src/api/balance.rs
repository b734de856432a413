//! Balance query initiation.
//!
//! The provider assigns the correlation key in its synchronous ack, so the
//! speculative `balance_history` snapshot is inserted after the ack, keyed
//! by the ack's originator conversation id. The balance callback completes
//! it.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::created;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::status;

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceQueryRequest {
    pub chama_id: Uuid,
    /// Shortcode to query; defaults to the configured B2C shortcode
    #[serde(default)]
    pub short_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceQueryResponse {
    pub query_id: Uuid,
    pub originator_conversation_id: String,
    pub status: String,
}

pub async fn initiate_balance_query(
    State(state): State<AppState>,
    Json(request): Json<BalanceQueryRequest>,
) -> Response {
    match process(&state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn process(state: &AppState, request: BalanceQueryRequest) -> Result<Response, AppError> {
    let short_code = request
        .short_code
        .unwrap_or_else(|| state.config.mpesa.b2c_shortcode.clone());
    if short_code.trim().is_empty() {
        return Err(AppError::validation("short_code is required", "short_code"));
    }

    let ack = state.gateway.account_balance(&short_code).await?;

    let snapshot = state
        .balances
        .insert_query(
            request.chama_id,
            &ack.originator_conversation_id,
            ack.conversation_id.as_deref(),
        )
        .await?;

    info!(
        query_id = %snapshot.id,
        originator_conversation_id = %ack.originator_conversation_id,
        "balance query initiated"
    );
    Ok(created(BalanceQueryResponse {
        query_id: snapshot.id,
        originator_conversation_id: ack.originator_conversation_id,
        status: status::PENDING.to_string(),
    }))
}

//! Transaction-status query initiation.
//!
//! The caller names what the query targets (a deposit reference or a payout
//! originator id) and that tag is stored on the query record, so the status
//! callback dispatches on it directly.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::created;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{status, target_kind};

#[derive(Debug, Clone, Deserialize)]
pub struct StatusQueryRequest {
    /// Provider receipt of the transaction being queried
    pub transaction_id: String,
    /// `deposit` or `withdrawal`
    pub target_kind: String,
    /// Deposit reference or payout originator conversation id
    pub target_reference: String,
    #[serde(default)]
    pub original_conversation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusQueryResponse {
    pub query_id: Uuid,
    pub originator_conversation_id: String,
    pub status: String,
}

pub async fn initiate_status_query(
    State(state): State<AppState>,
    Json(request): Json<StatusQueryRequest>,
) -> Response {
    match process(&state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn process(state: &AppState, request: StatusQueryRequest) -> Result<Response, AppError> {
    if request.transaction_id.trim().is_empty() {
        return Err(AppError::validation(
            "transaction_id is required",
            "transaction_id",
        ));
    }
    if request.target_reference.trim().is_empty() {
        return Err(AppError::validation(
            "target_reference is required",
            "target_reference",
        ));
    }
    if request.target_kind != target_kind::DEPOSIT && request.target_kind != target_kind::WITHDRAWAL
    {
        return Err(AppError::validation(
            "target_kind must be deposit or withdrawal",
            "target_kind",
        ));
    }

    let ack = state
        .gateway
        .transaction_status(
            &request.transaction_id,
            request.original_conversation_id.as_deref(),
            &state.config.mpesa.b2c_shortcode,
        )
        .await?;

    let query = state
        .status_queries
        .insert(
            &ack.originator_conversation_id,
            &request.target_kind,
            &request.target_reference,
        )
        .await?;

    info!(
        query_id = %query.id,
        target_kind = %request.target_kind,
        "status query initiated"
    );
    Ok(created(StatusQueryResponse {
        query_id: query.id,
        originator_conversation_id: ack.originator_conversation_id,
        status: status::PENDING.to_string(),
    }))
}

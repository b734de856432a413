//! Payout initiation via B2C.
//!
//! The originator conversation id is generated locally before the provider
//! call, stored on the payout row, and used by the B2C callback as the
//! correlation key. The provider's own `ConversationID` is stamped after
//! the synchronous ack.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::{created, initiation_failure};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{status, NewPayout};

#[derive(Debug, Clone, Deserialize)]
pub struct PayoutRequest {
    pub chama_id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub phone_number: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayoutResponse {
    pub payout_id: Uuid,
    pub originator_conversation_id: String,
    pub conversation_id: String,
    pub status: String,
}

/// Locally-chosen correlation key, unique per in-flight payout
fn new_originator_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("B2C_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}

pub async fn initiate_payout(
    State(state): State<AppState>,
    Json(request): Json<PayoutRequest>,
) -> Response {
    match process(&state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn process(state: &AppState, request: PayoutRequest) -> Result<Response, AppError> {
    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(AppError::validation("amount must be positive", "amount"));
    }
    if request.phone_number.trim().is_empty() {
        return Err(AppError::validation(
            "phone_number is required",
            "phone_number",
        ));
    }

    let amount = BigDecimal::try_from(request.amount)
        .map_err(|_| AppError::validation("amount is not a valid number", "amount"))?;
    let remarks = request
        .remarks
        .clone()
        .unwrap_or_else(|| "Chama Withdrawal".to_string());
    let originator_id = new_originator_id();

    let payout = state
        .payouts
        .insert(NewPayout {
            chama_id: request.chama_id,
            user_id: request.user_id,
            amount,
            phone_number: request.phone_number.clone(),
            originator_conversation_id: originator_id.clone(),
            remarks: remarks.clone(),
        })
        .await?;

    match state
        .gateway
        .b2c_payment(
            &originator_id,
            request.amount.ceil() as u64,
            &request.phone_number,
            &remarks,
            "ChamaPayout",
        )
        .await
    {
        Ok(ack) => {
            state
                .payouts
                .set_conversation_id(payout.id, &ack.conversation_id)
                .await?;
            info!(
                payout_id = %payout.id,
                originator_conversation_id = %originator_id,
                "payout initiated"
            );
            Ok(created(PayoutResponse {
                payout_id: payout.id,
                originator_conversation_id: originator_id,
                conversation_id: ack.conversation_id,
                status: status::PENDING.to_string(),
            }))
        }
        Err(err) => {
            let err: AppError = err.into();
            state
                .payouts
                .fail_if_pending(payout.id, None, &err.user_message())
                .await?;
            Ok(initiation_failure(err, "payout_id", payout.id))
        }
    }
}

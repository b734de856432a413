//! Deposit initiation via STK push.
//!
//! Creates the pending transaction first, then asks the provider to push
//! the payment prompt. The checkout and merchant request ids from the ack
//! land in the transaction's metadata; the STK callback resolves the record
//! by `checkout_request_id`.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::api::{created, initiation_failure};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{status, NewTransaction};

#[derive(Debug, Clone, Deserialize)]
pub struct DepositRequest {
    pub chama_id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub phone_number: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositResponse {
    pub transaction_id: Uuid,
    pub checkout_request_id: String,
    pub merchant_request_id: String,
    pub status: String,
}

/// A failed initiation, carrying the pending record's id when one was
/// created before the failure
#[derive(Debug)]
pub struct DepositFailure {
    pub error: AppError,
    pub transaction_id: Option<Uuid>,
}

impl From<AppError> for DepositFailure {
    fn from(error: AppError) -> Self {
        Self {
            error,
            transaction_id: None,
        }
    }
}

pub async fn initiate_stk_push(
    State(state): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> Response {
    match initiate_deposit(&state, request).await {
        Ok(response) => created(response),
        Err(DepositFailure {
            error,
            transaction_id: Some(id),
        }) => initiation_failure(error, "transaction_id", id),
        Err(DepositFailure { error, .. }) => error.into_response(),
    }
}

/// Shared with the USSD contribution flow
pub async fn initiate_deposit(
    state: &AppState,
    request: DepositRequest,
) -> Result<DepositResponse, DepositFailure> {
    validate(&request)?;

    let amount = BigDecimal::try_from(request.amount)
        .map_err(|_| AppError::validation("amount is not a valid number", "amount"))?;
    let record = state
        .transactions
        .insert(NewTransaction {
            chama_id: request.chama_id,
            user_id: request.user_id,
            amount,
            kind: "deposit".to_string(),
            status: status::PENDING.to_string(),
            payment_method: "mpesa".to_string(),
            reference: None,
            description: request.description.clone(),
            metadata: json!({ "phone_number": request.phone_number }),
        })
        .await
        .map_err(AppError::from)?;

    let ack = match state
        .gateway
        .stk_push(request.amount.ceil() as u64, &request.phone_number)
        .await
    {
        Ok(ack) => ack,
        Err(err) => {
            let error: AppError = err.into();
            state
                .transactions
                .fail_if_pending(record.id, &error.user_message())
                .await
                .map_err(AppError::from)?;
            return Err(DepositFailure {
                error,
                transaction_id: Some(record.id),
            });
        }
    };

    state
        .transactions
        .merge_metadata(
            record.id,
            json!({
                "checkout_request_id": ack.checkout_request_id,
                "merchant_request_id": ack.merchant_request_id,
            }),
        )
        .await
        .map_err(AppError::from)?;

    info!(
        transaction_id = %record.id,
        checkout_request_id = %ack.checkout_request_id,
        "deposit initiated"
    );
    Ok(DepositResponse {
        transaction_id: record.id,
        checkout_request_id: ack.checkout_request_id,
        merchant_request_id: ack.merchant_request_id,
        status: status::PENDING.to_string(),
    })
}

fn validate(request: &DepositRequest) -> Result<(), AppError> {
    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(AppError::validation("amount must be positive", "amount"));
    }
    if request.phone_number.trim().is_empty() {
        return Err(AppError::validation(
            "phone_number is required",
            "phone_number",
        ));
    }
    Ok(())
}

//! STK push result callback: resolves a pending deposit by its checkout
//! request id.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use crate::callbacks::envelope::parse_stk_callback;
use crate::callbacks::{ack, error_response};
use crate::error::AppError;
use crate::state::AppState;

pub async fn handle_stk_callback(
    State(state): State<AppState>,
    Json(payload): Json<JsonValue>,
) -> Response {
    match process(&state, &payload).await {
        Ok(response) => response,
        Err(err) => error_response(err),
    }
}

async fn process(state: &AppState, payload: &JsonValue) -> Result<Response, AppError> {
    let callback = parse_stk_callback(payload).map_err(|e| AppError::MalformedCallback {
        message: e.to_string(),
    })?;

    let Some(record) = state
        .transactions
        .find_by_checkout_request_id(&callback.checkout_request_id)
        .await?
    else {
        warn!(
            checkout_request_id = %callback.checkout_request_id,
            "STK callback for unknown transaction"
        );
        return Ok(ack("No matching transaction"));
    };

    if callback.is_success() {
        let mut patch = json!({ "callback_received_at": Utc::now() });
        if let Some(receipt) = &callback.receipt_number {
            patch["mpesa_receipt_number"] = json!(receipt);
        }
        if let Some(phone) = &callback.phone_number {
            patch["phone_number"] = json!(phone);
        }
        if let Some(amount) = callback.amount {
            patch["callback_amount"] = json!(amount);
        }

        // Receipt metadata rides the completion statement itself; a deposit
        // can never end up completed without its receipt details
        let applied = state
            .transactions
            .complete_if_pending(record.id, callback.receipt_number.as_deref(), patch)
            .await?;
        if !applied {
            info!(transaction_id = %record.id, "STK callback already applied");
            return Ok(ack("Already processed"));
        }

        info!(
            transaction_id = %record.id,
            receipt = callback.receipt_number.as_deref().unwrap_or(""),
            "deposit completed"
        );
    } else {
        let applied = state
            .transactions
            .fail_if_pending(record.id, &format!("Failed: {}", callback.description()))
            .await?;
        if !applied {
            return Ok(ack("Already processed"));
        }
        info!(
            transaction_id = %record.id,
            result_code = %callback.result_code,
            "deposit failed"
        );
    }

    Ok(ack("Callback processed"))
}

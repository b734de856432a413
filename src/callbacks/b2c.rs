//! B2C result callback: resolves a pending payout by its originator
//! conversation id. A completed payout decrements the group balance and
//! appends a withdrawal ledger entry; both commit in the same store
//! transaction as the status flip, so they apply exactly once.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use crate::callbacks::envelope::parse_result_callback;
use crate::callbacks::{ack, error_response};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{status, NewTransaction};

pub async fn handle_b2c_callback(
    State(state): State<AppState>,
    Json(payload): Json<JsonValue>,
) -> Response {
    match process(&state, &payload).await {
        Ok(response) => response,
        Err(err) => error_response(err),
    }
}

async fn process(state: &AppState, payload: &JsonValue) -> Result<Response, AppError> {
    let callback = parse_result_callback(payload).map_err(|e| AppError::MalformedCallback {
        message: e.to_string(),
    })?;
    let originator_id = callback.originator_conversation_id.clone().ok_or(
        AppError::MalformedCallback {
            message: "callback payload missing OriginatorConversationID".to_string(),
        },
    )?;

    let Some(payout) = state.payouts.find_by_originator_id(&originator_id).await? else {
        warn!(originator_conversation_id = %originator_id, "B2C callback for unknown payout");
        return Ok(ack("No matching payout"));
    };

    if callback.is_success() {
        let code = callback.result_code.clone().unwrap_or_else(|| "0".to_string());
        let ledger = NewTransaction {
            chama_id: payout.chama_id,
            user_id: payout.user_id,
            amount: payout.amount.clone(),
            kind: "withdrawal".to_string(),
            status: status::COMPLETED.to_string(),
            payment_method: "mpesa".to_string(),
            reference: callback.transaction_id.clone(),
            description: Some(format!("Withdrawal to {}", payout.phone_number)),
            metadata: json!({ "payout_id": payout.id }),
        };
        let applied = state
            .payouts
            .complete_with_side_effects(
                payout.id,
                &code,
                &callback.description(),
                callback.transaction_id.as_deref(),
                ledger,
            )
            .await?;
        if !applied {
            info!(payout_id = %payout.id, "B2C callback already applied");
            return Ok(ack("Already processed"));
        }

        info!(
            payout_id = %payout.id,
            transaction_id = callback.transaction_id.as_deref().unwrap_or(""),
            "payout completed"
        );
    } else {
        let applied = state
            .payouts
            .fail_if_pending(
                payout.id,
                callback.result_code.as_deref(),
                &callback.description(),
            )
            .await?;
        if !applied {
            return Ok(ack("Already processed"));
        }
        info!(
            payout_id = %payout.id,
            result_code = callback.result_code.as_deref().unwrap_or(""),
            "payout failed"
        );
    }

    Ok(ack("Callback processed"))
}

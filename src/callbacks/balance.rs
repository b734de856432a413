//! Account-balance result callback: fills in the balance snapshot created
//! when the query was initiated.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::callbacks::envelope::{parse_account_balances, parse_result_callback};
use crate::callbacks::{ack, error_response};
use crate::error::AppError;
use crate::state::AppState;

pub async fn handle_balance_callback(
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

    let Some(snapshot) = state.balances.find_by_originator_id(&originator_id).await? else {
        warn!(
            originator_conversation_id = %originator_id,
            "balance callback for unknown query"
        );
        return Ok(ack("No matching balance query"));
    };

    if callback.is_success() {
        let Some(raw) = callback.parameter_str("AccountBalance") else {
            // A success result with no balance string leaves the snapshot
            // unresolvable
            state
                .balances
                .fail_if_pending(&originator_id, "Callback missing AccountBalance parameter")
                .await?;
            return Ok(ack("Callback processed"));
        };

        let balances = parse_account_balances(&raw);
        let applied = state
            .balances
            .record_balances_if_pending(&originator_id, &balances)
            .await?;
        if !applied {
            info!(snapshot_id = %snapshot.id, "balance callback already applied");
            return Ok(ack("Already processed"));
        }
        info!(
            snapshot_id = %snapshot.id,
            working = balances.working.unwrap_or(0.0),
            utility = balances.utility.unwrap_or(0.0),
            "balance snapshot recorded"
        );
    } else {
        let applied = state
            .balances
            .fail_if_pending(&originator_id, &callback.description())
            .await?;
        if !applied {
            return Ok(ack("Already processed"));
        }
        info!(snapshot_id = %snapshot.id, "balance query failed");
    }

    Ok(ack("Callback processed"))
}

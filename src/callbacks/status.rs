//! Transaction-status result callback.
//!
//! The query record created at initiation carries an explicit target tag
//! (deposit or withdrawal) plus the reference to resolve, so dispatch here
//! never inspects the shape of the correlation key itself.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::callbacks::envelope::{is_success_status, parse_result_callback};
use crate::callbacks::{ack, error_response};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{status, target_kind};

pub async fn handle_status_callback(
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

    let Some(query) = state
        .status_queries
        .find_by_originator_id(&originator_id)
        .await?
    else {
        warn!(
            originator_conversation_id = %originator_id,
            "status callback for unknown query"
        );
        return Ok(ack("No matching status query"));
    };

    let transaction_status = callback
        .parameter_str("TransactionStatus")
        .unwrap_or_else(|| callback.description());
    let resolved = callback.is_success() && is_success_status(&transaction_status);

    // Propagate a confirmed completion to the record the query targeted
    // BEFORE resolving the query itself. Both writes are compare-and-set,
    // so if the second fails the provider retry re-runs the pair and
    // converges instead of stranding the target transition.
    let target_updated = if resolved {
        match query.target_kind.as_str() {
            target_kind::WITHDRAWAL => {
                state
                    .payouts
                    .complete_by_originator_if_pending(&query.target_reference)
                    .await?
            }
            target_kind::DEPOSIT => {
                state
                    .transactions
                    .complete_by_reference_if_pending(&query.target_reference)
                    .await?
            }
            other => {
                warn!(query_id = %query.id, target_kind = other, "unknown status target kind");
                false
            }
        }
    } else {
        false
    };

    let applied = state
        .status_queries
        .resolve_if_pending(
            query.id,
            if resolved {
                status::COMPLETED
            } else {
                status::FAILED
            },
            &transaction_status,
        )
        .await?;
    if !applied {
        info!(query_id = %query.id, "status callback already applied");
        return Ok(ack("Already processed"));
    }

    if resolved {
        info!(
            query_id = %query.id,
            target_kind = %query.target_kind,
            target_updated,
            "status query resolved"
        );
    } else {
        info!(
            query_id = %query.id,
            transaction_status = %transaction_status,
            "status query resolved as failed"
        );
    }

    Ok(ack("Callback processed"))
}

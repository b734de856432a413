//! Ratiba (standing-order) result callback: activates or fails the order
//! matched by the provider's response reference id. The full raw payload is
//! kept in the order's metadata for audit regardless of outcome.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use crate::callbacks::envelope::parse_ratiba_callback;
use crate::callbacks::{ack, error_response};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::status;

pub async fn handle_ratiba_callback(
    State(state): State<AppState>,
    Json(payload): Json<JsonValue>,
) -> Response {
    match process(&state, &payload).await {
        Ok(response) => response,
        Err(err) => error_response(err),
    }
}

async fn process(state: &AppState, payload: &JsonValue) -> Result<Response, AppError> {
    let callback = parse_ratiba_callback(payload).map_err(|e| AppError::MalformedCallback {
        message: e.to_string(),
    })?;

    let Some(order) = state
        .standing_orders
        .find_by_response_ref(&callback.response_ref_id)
        .await?
    else {
        warn!(
            response_ref_id = %callback.response_ref_id,
            "Ratiba callback for unknown standing order"
        );
        return Ok(ack("No matching standing order"));
    };

    let audit = json!({
        "callback": payload,
        "callback_received_at": Utc::now(),
    });
    let (new_status, transaction_id) = if callback.is_success() {
        (status::ACTIVE, callback.transaction_id.as_deref())
    } else {
        (status::FAILED, None)
    };

    let applied = state
        .standing_orders
        .transition_if_pending(order.id, new_status, transaction_id, audit)
        .await?;
    if !applied {
        info!(order_id = %order.id, "Ratiba callback already applied");
        return Ok(ack("Already processed"));
    }

    info!(
        order_id = %order.id,
        status = new_status,
        response_code = callback.response_code.as_deref().unwrap_or(""),
        "standing order resolved"
    );
    Ok(ack("Callback processed"))
}

//! Inbound provider callback handlers.
//!
//! The provider retries aggressively on non-2xx, so the response policy is
//! deliberate: unknown correlation keys are acknowledged with 200 (a retry
//! cannot help), payloads without a usable correlation key get 400, and
//! only store write failures return 500 so the provider redelivers while
//! the operation is still unresolved.

pub mod balance;
pub mod b2c;
pub mod envelope;
pub mod ratiba;
pub mod status;
pub mod stk;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/callbacks/stk", post(stk::handle_stk_callback))
        .route("/callbacks/b2c", post(b2c::handle_b2c_callback))
        .route("/callbacks/balance", post(balance::handle_balance_callback))
        .route("/callbacks/status", post(status::handle_status_callback))
        .route("/callbacks/ratiba", post(ratiba::handle_ratiba_callback))
}

/// 200-level acknowledgment in the shape the provider expects
pub(crate) fn ack(desc: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "ResultCode": 0, "ResultDesc": desc })),
    )
        .into_response()
}

/// Convert a handler error into the callback response policy
pub(crate) fn error_response(err: AppError) -> Response {
    match &err {
        AppError::MalformedCallback { .. } => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": err.user_message() })),
        )
            .into_response(),
        AppError::Persistence(db) => {
            tracing::error!(error = %db, "callback store write failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal storage error" })),
            )
                .into_response()
        }
        // Anything else is unactionable by a provider retry
        _ => ack(&err.user_message()),
    }
}

//! Initiator endpoints: validate input, create the pending record, call the
//! provider, stamp the correlation key, and answer without waiting for the
//! callback.

pub mod balance;
pub mod deposits;
pub mod payouts;
pub mod standing_orders;
pub mod status;
pub mod ussd;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/payments/stk-push", post(deposits::initiate_stk_push))
        .route("/payments/b2c", post(payouts::initiate_payout))
        .route("/payments/balance", post(balance::initiate_balance_query))
        .route("/payments/status", post(status::initiate_status_query))
        .route(
            "/payments/standing-orders",
            post(standing_orders::create_standing_order),
        )
        .route("/ussd", post(ussd::handle_ussd))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "pesachama-backend" }))
}

/// Error response for an initiation that failed after the pending record was
/// created. The record id is included so the caller can still poll it.
pub(crate) fn initiation_failure(err: AppError, id_field: &str, id: Uuid) -> Response {
    let status = err.status_code();
    let body = json!({ "error": err.user_message(), id_field: id });
    (status, Json(body)).into_response()
}

pub(crate) fn created<T: serde::Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

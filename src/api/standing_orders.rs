//! Ratiba standing-order creation.
//!
//! The provider's `responseRefID` from the synchronous ack is the
//! correlation key the Ratiba callback later resolves against; it is stored
//! on the order together with the raw ack for audit.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::api::{created, initiation_failure};
use crate::error::AppError;
use crate::mpesa::client::StandingOrderParams;
use crate::state::AppState;
use crate::store::{status, NewStandingOrder};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStandingOrderRequest {
    pub chama_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount: f64,
    pub phone_number: String,
    /// Provider frequency code ("1" daily through "8" yearly)
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandingOrderResponse {
    pub standing_order_id: Uuid,
    pub response_ref_id: String,
    pub status: String,
}

pub async fn create_standing_order(
    State(state): State<AppState>,
    Json(request): Json<CreateStandingOrderRequest>,
) -> Response {
    match process(&state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn process(
    state: &AppState,
    request: CreateStandingOrderRequest,
) -> Result<Response, AppError> {
    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(AppError::validation("amount must be positive", "amount"));
    }
    if request.name.trim().is_empty() {
        return Err(AppError::validation("name is required", "name"));
    }
    if request.phone_number.trim().is_empty() {
        return Err(AppError::validation(
            "phone_number is required",
            "phone_number",
        ));
    }
    if request.end_date < request.start_date {
        return Err(AppError::validation(
            "end_date must not precede start_date",
            "end_date",
        ));
    }

    let amount = BigDecimal::try_from(request.amount)
        .map_err(|_| AppError::validation("amount is not a valid number", "amount"))?;
    let order = state
        .standing_orders
        .insert(NewStandingOrder {
            chama_id: request.chama_id,
            user_id: request.user_id,
            name: request.name.clone(),
            amount,
            frequency: request.frequency.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
        })
        .await?;

    let account_reference = format!("RSO-{}", &order.id.simple().to_string()[..8]);
    let params = StandingOrderParams {
        name: request.name,
        amount: request.amount.ceil() as u64,
        phone_number: request.phone_number,
        start_date: request.start_date,
        end_date: request.end_date,
        frequency: request.frequency,
        account_reference,
    };

    match state.gateway.create_standing_order(params).await {
        Ok(ack) => {
            state
                .standing_orders
                .set_response_ref(
                    order.id,
                    &ack.response_ref_id,
                    json!({ "provider_ack": ack.raw }),
                )
                .await?;
            info!(
                standing_order_id = %order.id,
                response_ref_id = %ack.response_ref_id,
                "standing order created"
            );
            Ok(created(StandingOrderResponse {
                standing_order_id: order.id,
                response_ref_id: ack.response_ref_id,
                status: status::PENDING.to_string(),
            }))
        }
        Err(err) => {
            let err: AppError = err.into();
            state
                .standing_orders
                .fail_if_pending(order.id, &err.user_message())
                .await?;
            Ok(initiation_failure(err, "standing_order_id", order.id))
        }
    }
}

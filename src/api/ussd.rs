//! USSD menu mapper.
//!
//! Stateless text-menu interpreter: the gateway posts the full `*`-joined
//! input path on every request, so each request is answered from the path
//! alone. Payment actions delegate to the deposit initiator; responses are
//! plain text prefixed `CON` (expect more input) or `END` (terminate).

use axum::extract::State;
use axum::Form;
use bigdecimal::ToPrimitive;
use serde::Deserialize;
use tracing::warn;

use crate::api::deposits::{initiate_deposit, DepositRequest};
use crate::state::AppState;
use crate::store::MemberProfile;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UssdRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub service_code: String,
    pub phone_number: String,
    #[serde(default)]
    pub text: String,
}

pub async fn handle_ussd(
    State(state): State<AppState>,
    Form(request): Form<UssdRequest>,
) -> String {
    let steps: Vec<&str> = if request.text.is_empty() {
        Vec::new()
    } else {
        request.text.split('*').collect()
    };

    match steps.as_slice() {
        [] => "CON Welcome to PesaChama\n1. My contributions\n2. Make a contribution".to_string(),
        ["1"] => match member_for(&state, &request.phone_number).await {
            Some(member) => contributions_summary(&state, &member).await,
            None => "END No chama membership found for this number".to_string(),
        },
        ["2"] => "CON Enter amount to contribute".to_string(),
        ["2", amount] => match member_for(&state, &request.phone_number).await {
            Some(member) => contribute(&state, &request.phone_number, &member, amount).await,
            None => "END No chama membership found for this number".to_string(),
        },
        _ => "END Invalid choice".to_string(),
    }
}

async fn member_for(state: &AppState, phone_number: &str) -> Option<MemberProfile> {
    match state.chamas.find_member_by_phone(phone_number).await {
        Ok(member) => member,
        Err(err) => {
            warn!(error = %err, "USSD member lookup failed");
            None
        }
    }
}

async fn contributions_summary(state: &AppState, member: &MemberProfile) -> String {
    match state
        .transactions
        .total_completed_for_user(member.user_id)
        .await
    {
        Ok(total) => {
            let amount = total.to_f64().unwrap_or(0.0);
            format!(
                "END Hello {}, your total contributions are KES {:.2}",
                member.first_name, amount
            )
        }
        Err(err) => {
            warn!(error = %err, "USSD contributions lookup failed");
            "END Unable to fetch your contributions, try again later".to_string()
        }
    }
}

async fn contribute(
    state: &AppState,
    phone_number: &str,
    member: &MemberProfile,
    amount_text: &str,
) -> String {
    let Ok(amount) = amount_text.trim().parse::<f64>() else {
        return "END Invalid amount".to_string();
    };
    if !amount.is_finite() || amount <= 0.0 {
        return "END Invalid amount".to_string();
    }

    let request = DepositRequest {
        chama_id: member.chama_id,
        user_id: member.user_id,
        amount,
        phone_number: phone_number.to_string(),
        description: Some("USSD contribution".to_string()),
    };
    match initiate_deposit(state, request).await {
        Ok(_) => format!(
            "END Contribution of KES {:.2} initiated. Enter your M-Pesa PIN on the prompt.",
            amount
        ),
        Err(failure) => {
            warn!(error = %failure.error, "USSD contribution failed");
            "END Unable to initiate contribution, try again later".to_string()
        }
    }
}

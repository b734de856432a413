//! Wire types for the Daraja API. Field names follow the provider's
//! PascalCase (and occasionally inconsistent) JSON contract.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct StkPushRequest {
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "Amount")]
    pub amount: u64,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "PhoneNumber")]
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub call_back_url: String,
    #[serde(rename = "AccountReference")]
    pub account_reference: String,
    #[serde(rename = "TransactionDesc")]
    pub transaction_desc: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkPushAck {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: Option<String>,
    #[serde(rename = "ResponseCode")]
    pub response_code: Option<String>,
    #[serde(rename = "ResponseDescription")]
    pub response_description: Option<String>,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct B2cPaymentRequest {
    #[serde(rename = "OriginatorConversationID")]
    pub originator_conversation_id: String,
    #[serde(rename = "InitiatorName")]
    pub initiator_name: String,
    #[serde(rename = "SecurityCredential")]
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: String,
    #[serde(rename = "Amount")]
    pub amount: u64,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "Remarks")]
    pub remarks: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_time_out_url: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
    // The provider's documented spelling
    #[serde(rename = "Occassion")]
    pub occasion: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct B2cAck {
    #[serde(rename = "ConversationID")]
    pub conversation_id: Option<String>,
    #[serde(rename = "OriginatorConversationID")]
    pub originator_conversation_id: Option<String>,
    #[serde(rename = "ResponseCode")]
    pub response_code: Option<String>,
    #[serde(rename = "ResponseDescription")]
    pub response_description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountBalanceRequest {
    #[serde(rename = "Initiator")]
    pub initiator: String,
    #[serde(rename = "SecurityCredential")]
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: String,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "IdentifierType")]
    pub identifier_type: String,
    #[serde(rename = "Remarks")]
    pub remarks: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_time_out_url: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionStatusRequest {
    #[serde(rename = "Initiator")]
    pub initiator: String,
    #[serde(rename = "SecurityCredential")]
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: String,
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,
    #[serde(rename = "OriginalConversationID")]
    pub original_conversation_id: Option<String>,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "IdentifierType")]
    pub identifier_type: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_time_out_url: String,
    #[serde(rename = "Remarks")]
    pub remarks: String,
    #[serde(rename = "Occasion")]
    pub occasion: String,
}

/// Ack shape shared by the balance and status queries
#[derive(Debug, Clone, Deserialize)]
pub struct QueryAck {
    #[serde(rename = "OriginatorConversationID")]
    pub originator_conversation_id: Option<String>,
    #[serde(rename = "ConversationID")]
    pub conversation_id: Option<String>,
    #[serde(rename = "ResponseCode")]
    pub response_code: Option<String>,
    #[serde(rename = "ResponseDescription")]
    pub response_description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandingOrderRequest {
    #[serde(rename = "StandingOrderName")]
    pub standing_order_name: String,
    #[serde(rename = "StartDate")]
    pub start_date: String,
    #[serde(rename = "EndDate")]
    pub end_date: String,
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "ReceiverPartyIdentifierType")]
    pub receiver_party_identifier_type: String,
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "CallBackURL")]
    pub call_back_url: String,
    #[serde(rename = "AccountReference")]
    pub account_reference: String,
    #[serde(rename = "TransactionDesc")]
    pub transaction_desc: String,
    #[serde(rename = "Frequency")]
    pub frequency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandingOrderAck {
    #[serde(rename = "ResponseHeader")]
    pub response_header: Option<StandingOrderResponseHeader>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandingOrderResponseHeader {
    #[serde(rename = "responseCode")]
    pub response_code: Option<serde_json::Value>,
    #[serde(rename = "responseDescription")]
    pub response_description: Option<String>,
    #[serde(rename = "responseRefID")]
    pub response_ref_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Normalize a subscriber number to the 254XXXXXXXXX form the API expects
pub fn format_msisdn(phone: &str) -> String {
    let phone = phone.trim().trim_start_matches('+');
    if let Some(rest) = phone.strip_prefix('0') {
        format!("254{}", rest)
    } else {
        phone.to_string()
    }
}

/// STK password: base64(shortcode + passkey + timestamp)
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    BASE64.encode(format!("{}{}{}", shortcode, passkey, timestamp))
}

/// Timestamp in the provider's YYYYMMDDHHMMSS format
pub fn stk_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// Dates in the provider's YYYYMMDD format (Ratiba)
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn msisdn_local_prefix_is_internationalized() {
        assert_eq!(format_msisdn("0712345678"), "254712345678");
        assert_eq!(format_msisdn("254712345678"), "254712345678");
        assert_eq!(format_msisdn("+254712345678"), "254712345678");
    }

    #[test]
    fn stk_password_is_base64_of_concatenation() {
        let password = stk_password("174379", "passkey", "20260101120000");
        let decoded = BASE64.decode(password).expect("valid base64");
        assert_eq!(decoded, b"174379passkey20260101120000");
    }

    #[test]
    fn timestamps_and_dates_use_provider_formats() {
        let now = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(stk_timestamp(now), "20260307090502");
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(compact_date(date), "20260307");
    }

    #[test]
    fn stk_request_serializes_with_provider_field_names() {
        let request = StkPushRequest {
            business_short_code: "174379".to_string(),
            password: "pw".to_string(),
            timestamp: "20260101120000".to_string(),
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount: 100,
            party_a: "254712345678".to_string(),
            party_b: "174379".to_string(),
            phone_number: "254712345678".to_string(),
            call_back_url: "https://example.com/callbacks/stk".to_string(),
            account_reference: "Ratibu".to_string(),
            transaction_desc: "Chama Deposit".to_string(),
        };
        let json = serde_json::to_value(&request).expect("serialization should succeed");
        assert_eq!(json["BusinessShortCode"], "174379");
        assert_eq!(json["CallBackURL"], "https://example.com/callbacks/stk");
        assert_eq!(json["Amount"], 100);
    }
}

//! Normalization of inbound provider callbacks.
//!
//! The provider does not ship a single payload shape: the result envelope
//! key, the key casing, and the location of the result code all vary
//! between subsystems. Everything here is pure parsing that turns the raw
//! JSON into one canonical shape before any business logic runs. Handlers
//! never probe the raw payload themselves.

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::store::AccountBalances;

#[derive(Debug, Error, PartialEq)]
pub enum EnvelopeError {
    #[error("callback payload missing {0}")]
    MissingKey(&'static str),

    #[error("callback payload is not a JSON object")]
    NotAnObject,
}

/// Probe an object for the first present key among casing variants
fn probe<'a>(value: &'a JsonValue, keys: &[&str]) -> Option<&'a JsonValue> {
    keys.iter().find_map(|k| value.get(k))
}

fn probe_string(value: &JsonValue, keys: &[&str]) -> Option<String> {
    probe(value, keys).and_then(scalar_to_string)
}

/// Codes arrive as either JSON numbers or strings; normalize both to the
/// string form so `0` and `"0"` compare equal downstream
fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Success test for numeric-style result codes. The provider uses `0` for
/// most subsystems and `"200"` for Ratiba; both numeric and string
/// representations are accepted.
pub fn is_success_code(code: &str) -> bool {
    code == "0" || code == "200"
}

/// Success test for textual transaction statuses. Exact match only.
pub fn is_success_status(status: &str) -> bool {
    status == "Completed" || status == "Success"
}

/// Canonical form of a `Result`-envelope callback (B2C, balance, status)
#[derive(Debug, Clone)]
pub struct ResultCallback {
    pub result_code: Option<String>,
    pub result_desc: Option<String>,
    pub originator_conversation_id: Option<String>,
    pub conversation_id: Option<String>,
    pub transaction_id: Option<String>,
    parameters: Vec<(String, JsonValue)>,
}

impl ResultCallback {
    /// Exact-match lookup into the normalized result-parameter list
    pub fn parameter(&self, key: &str) -> Option<&JsonValue> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn parameter_str(&self, key: &str) -> Option<String> {
        self.parameter(key).and_then(scalar_to_string)
    }

    pub fn is_success(&self) -> bool {
        self.result_code
            .as_deref()
            .map(is_success_code)
            .unwrap_or(false)
    }

    pub fn description(&self) -> String {
        self.result_desc
            .clone()
            .unwrap_or_else(|| "No result description".to_string())
    }
}

/// Parse the shared `Result` envelope used by the B2C, balance and status
/// callbacks.
///
/// The flat `ResultCode` field is authoritative only when the
/// result-parameter list does not carry its own `ResultCode` entry; some
/// provider subsystems put the real code there and leave the flat field
/// stale.
pub fn parse_result_callback(payload: &JsonValue) -> Result<ResultCallback, EnvelopeError> {
    if !payload.is_object() {
        return Err(EnvelopeError::NotAnObject);
    }
    let result = probe(payload, &["Result", "result"]).ok_or(EnvelopeError::MissingKey("Result"))?;

    let parameters = collect_parameters(result);
    let flat_code = probe_string(result, &["ResultCode", "resultCode"]);
    let override_code = parameters
        .iter()
        .find(|(k, _)| k == "ResultCode")
        .and_then(|(_, v)| scalar_to_string(v));

    Ok(ResultCallback {
        result_code: override_code.or(flat_code),
        result_desc: probe_string(result, &["ResultDesc", "resultDesc"]),
        originator_conversation_id: probe_string(
            result,
            &["OriginatorConversationID", "originatorConversationID"],
        ),
        conversation_id: probe_string(result, &["ConversationID", "conversationID"]),
        transaction_id: probe_string(result, &["TransactionID", "transactionID"]),
        parameters,
    })
}

/// Flatten `ResultParameters.ResultParameter` into `(key, value)` pairs.
/// The list arrives as an array or, when a single parameter is present, a
/// bare object; entries name their key as `Key`/`key` or `Name`/`name`.
fn collect_parameters(result: &JsonValue) -> Vec<(String, JsonValue)> {
    let Some(container) = probe(result, &["ResultParameters", "resultParameters"]) else {
        return Vec::new();
    };
    let Some(entries) = probe(container, &["ResultParameter", "resultParameter"]) else {
        return Vec::new();
    };

    let items: Vec<&JsonValue> = match entries {
        JsonValue::Array(list) => list.iter().collect(),
        obj @ JsonValue::Object(_) => vec![obj],
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| {
            let key = probe_string(item, &["Key", "key", "Name", "name"])?;
            let value = probe(item, &["Value", "value"])?.clone();
            Some((key, value))
        })
        .collect()
}

/// Canonical form of an STK push callback
#[derive(Debug, Clone)]
pub struct StkCallback {
    pub checkout_request_id: String,
    pub merchant_request_id: Option<String>,
    pub result_code: String,
    pub result_desc: Option<String>,
    pub receipt_number: Option<String>,
    pub phone_number: Option<String>,
    pub amount: Option<f64>,
}

impl StkCallback {
    pub fn is_success(&self) -> bool {
        is_success_code(&self.result_code)
    }

    pub fn description(&self) -> String {
        self.result_desc
            .clone()
            .unwrap_or_else(|| "No result description".to_string())
    }
}

/// Parse the STK envelope: `Body.stkCallback` carrying the checkout request
/// id, the result code, and (on success) a `CallbackMetadata.Item` list.
pub fn parse_stk_callback(payload: &JsonValue) -> Result<StkCallback, EnvelopeError> {
    if !payload.is_object() {
        return Err(EnvelopeError::NotAnObject);
    }
    let callback = probe(payload, &["Body", "body"])
        .and_then(|body| probe(body, &["stkCallback", "StkCallback"]))
        .ok_or(EnvelopeError::MissingKey("Body.stkCallback"))?;

    let checkout_request_id =
        probe_string(callback, &["CheckoutRequestID", "checkoutRequestID"])
            .ok_or(EnvelopeError::MissingKey("CheckoutRequestID"))?;
    let result_code = probe_string(callback, &["ResultCode", "resultCode"])
        .ok_or(EnvelopeError::MissingKey("ResultCode"))?;

    let mut receipt_number = None;
    let mut phone_number = None;
    let mut amount = None;
    if let Some(items) = probe(callback, &["CallbackMetadata", "callbackMetadata"])
        .and_then(|m| probe(m, &["Item", "item"]))
        .and_then(|i| i.as_array())
    {
        for item in items {
            let Some(name) = probe_string(item, &["Name", "name"]) else {
                continue;
            };
            let value = probe(item, &["Value", "value"]);
            match name.as_str() {
                "MpesaReceiptNumber" => receipt_number = value.and_then(scalar_to_string),
                "PhoneNumber" => phone_number = value.and_then(scalar_to_string),
                "Amount" => amount = value.and_then(JsonValue::as_f64),
                _ => {}
            }
        }
    }

    Ok(StkCallback {
        checkout_request_id,
        merchant_request_id: probe_string(callback, &["MerchantRequestID", "merchantRequestID"]),
        result_code,
        result_desc: probe_string(callback, &["ResultDesc", "resultDesc"]),
        receipt_number,
        phone_number,
        amount,
    })
}

/// Canonical form of a Ratiba (standing-order) callback
#[derive(Debug, Clone)]
pub struct RatibaCallback {
    pub response_ref_id: String,
    pub response_code: Option<String>,
    pub response_desc: Option<String>,
    pub transaction_id: Option<String>,
}

impl RatibaCallback {
    pub fn is_success(&self) -> bool {
        self.response_code
            .as_deref()
            .map(is_success_code)
            .unwrap_or(false)
    }

    pub fn description(&self) -> String {
        self.response_desc
            .clone()
            .unwrap_or_else(|| "No response description".to_string())
    }
}

/// Parse the Ratiba callback. Both the header/body envelope keys and the
/// inner field names arrive in inconsistent casings, sometimes within the
/// same payload.
pub fn parse_ratiba_callback(payload: &JsonValue) -> Result<RatibaCallback, EnvelopeError> {
    if !payload.is_object() {
        return Err(EnvelopeError::NotAnObject);
    }
    let header = probe(payload, &["ResponseHeader", "responseHeader"]);
    let body = probe(payload, &["ResponseBody", "responseBody"]);

    // The reference id is the only field guaranteed present; probe the
    // header first, then the body, then the payload root
    let response_ref_id = [header, body, Some(payload)]
        .into_iter()
        .flatten()
        .find_map(|v| probe_string(v, &["responseRefID", "ResponseRefID", "responseRefId"]))
        .ok_or(EnvelopeError::MissingKey("responseRefID"))?;

    let code_from = |v: &JsonValue| probe_string(v, &["responseCode", "ResponseCode"]);
    let desc_from =
        |v: &JsonValue| probe_string(v, &["responseDescription", "ResponseDescription"]);
    let txn_from = |v: &JsonValue| {
        probe_string(v, &["transactionID", "TransactionID", "transactionId"])
    };

    Ok(RatibaCallback {
        response_ref_id,
        response_code: header.and_then(code_from).or_else(|| body.and_then(code_from)),
        response_desc: header.and_then(desc_from).or_else(|| body.and_then(desc_from)),
        transaction_id: body.and_then(txn_from).or_else(|| header.and_then(txn_from)),
    })
}

/// Parse the provider's delimited multi-account balance string.
///
/// Accounts are `&`-separated; fields within an account are `|`-separated
/// as `name|currency|available|current|reserved|uncleared`. Only the name
/// and the available amount (index 2) are consumed. Account names are
/// matched by case-sensitive substring.
pub fn parse_account_balances(raw: &str) -> AccountBalances {
    let mut balances = AccountBalances::default();
    for account in raw.split('&') {
        let fields: Vec<&str> = account.split('|').collect();
        if fields.len() < 3 {
            continue;
        }
        let name = fields[0];
        let Ok(available) = fields[2].trim().parse::<f64>() else {
            continue;
        };
        if name.contains("Working") {
            balances.working = Some(available);
        } else if name.contains("Utility") {
            balances.utility = Some(available);
        } else if name.contains("Charges Paid") {
            balances.charges_paid = Some(available);
        }
    }
    balances
}

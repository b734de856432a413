use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::info;

use crate::config::MpesaConfig;
use crate::mpesa::error::{MpesaError, MpesaResult};
use crate::mpesa::http::MpesaHttpClient;
use crate::mpesa::types::{
    compact_date, format_msisdn, stk_password, stk_timestamp, AccountBalanceRequest, B2cAck,
    B2cPaymentRequest, QueryAck, StandingOrderAck, StandingOrderRequest, StkPushAck,
    StkPushRequest, TokenResponse, TransactionStatusRequest,
};

/// Synchronous acknowledgment of an STK push. The final result arrives
/// later on the STK callback.
#[derive(Debug, Clone)]
pub struct StkInitiation {
    pub checkout_request_id: String,
    pub merchant_request_id: String,
}

/// Synchronous acknowledgment of a B2C payment request
#[derive(Debug, Clone)]
pub struct B2cInitiation {
    pub conversation_id: String,
}

/// Synchronous acknowledgment of a balance or status query
#[derive(Debug, Clone)]
pub struct QueryInitiation {
    pub originator_conversation_id: String,
    pub conversation_id: Option<String>,
}

/// Synchronous acknowledgment of a standing-order creation
#[derive(Debug, Clone)]
pub struct StandingOrderInitiation {
    pub response_ref_id: String,
    pub raw: JsonValue,
}

/// Parameters for a Ratiba standing-order creation
#[derive(Debug, Clone)]
pub struct StandingOrderParams {
    pub name: String,
    pub amount: u64,
    pub phone_number: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub frequency: String,
    pub account_reference: String,
}

/// Outbound Daraja operations. Implemented by [`MpesaClient`] in
/// production and by stubs in tests.
#[async_trait]
pub trait MpesaGateway: Send + Sync {
    async fn stk_push(&self, amount: u64, phone_number: &str) -> MpesaResult<StkInitiation>;

    async fn b2c_payment(
        &self,
        originator_conversation_id: &str,
        amount: u64,
        phone_number: &str,
        remarks: &str,
        occasion: &str,
    ) -> MpesaResult<B2cInitiation>;

    async fn account_balance(&self, short_code: &str) -> MpesaResult<QueryInitiation>;

    async fn transaction_status(
        &self,
        transaction_id: &str,
        original_conversation_id: Option<&str>,
        party_a: &str,
    ) -> MpesaResult<QueryInitiation>;

    async fn create_standing_order(
        &self,
        params: StandingOrderParams,
    ) -> MpesaResult<StandingOrderInitiation>;
}

pub struct MpesaClient {
    config: MpesaConfig,
    http: MpesaHttpClient,
}

impl MpesaClient {
    pub fn new(config: MpesaConfig) -> MpesaResult<Self> {
        let http = MpesaHttpClient::new(config.request_timeout, config.max_retries)?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    /// Client-credentials token. Fetched on every call; the token endpoint
    /// is cheap and a short-lived token cache is not worth the state.
    async fn access_token(&self) -> MpesaResult<String> {
        let basic = BASE64.encode(format!(
            "{}:{}",
            self.config.consumer_key, self.config.consumer_secret
        ));
        let token: TokenResponse = self
            .http
            .request_json(
                reqwest::Method::GET,
                &self.endpoint("/oauth/v1/generate?grant_type=client_credentials"),
                &format!("Basic {}", basic),
                None,
            )
            .await?;
        Ok(token.access_token)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: JsonValue,
    ) -> MpesaResult<T> {
        let token = self.access_token().await?;
        self.http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint(path),
                &format!("Bearer {}", token),
                Some(&body),
            )
            .await
    }
}

fn encode<T: serde::Serialize>(request: &T) -> MpesaResult<JsonValue> {
    serde_json::to_value(request).map_err(|e| MpesaError::Unavailable {
        message: format!("failed to encode provider request: {}", e),
    })
}

fn require(value: Option<String>, field: &'static str) -> MpesaResult<String> {
    value.filter(|v| !v.is_empty()).ok_or(MpesaError::Unavailable {
        message: format!("provider acknowledgment missing {}", field),
    })
}

#[async_trait]
impl MpesaGateway for MpesaClient {
    async fn stk_push(&self, amount: u64, phone_number: &str) -> MpesaResult<StkInitiation> {
        let timestamp = stk_timestamp(Utc::now());
        let msisdn = format_msisdn(phone_number);
        let request = StkPushRequest {
            business_short_code: self.config.business_shortcode.clone(),
            password: stk_password(&self.config.business_shortcode, &self.config.passkey, &timestamp),
            timestamp,
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount,
            party_a: msisdn.clone(),
            party_b: self.config.business_shortcode.clone(),
            phone_number: msisdn,
            call_back_url: self.config.callback_url("/callbacks/stk"),
            account_reference: "Ratibu".to_string(),
            transaction_desc: "Chama Deposit".to_string(),
        };

        let ack: StkPushAck = self
            .post_json("/mpesa/stkpush/v1/processrequest", encode(&request)?)
            .await?;

        // The sandbox occasionally omits ResponseCode on success; a present
        // non-zero code is an immediate rejection
        if let Some(code) = ack.response_code.as_deref() {
            if code != "0" {
                return Err(MpesaError::Rejected {
                    code: Some(code.to_string()),
                    description: ack
                        .error_message
                        .or(ack.response_description)
                        .unwrap_or_else(|| "STK push failed".to_string()),
                });
            }
        }

        let initiation = StkInitiation {
            checkout_request_id: require(ack.checkout_request_id, "CheckoutRequestID")?,
            merchant_request_id: require(ack.merchant_request_id, "MerchantRequestID")?,
        };
        info!(checkout_request_id = %initiation.checkout_request_id, "STK push accepted");
        Ok(initiation)
    }

    async fn b2c_payment(
        &self,
        originator_conversation_id: &str,
        amount: u64,
        phone_number: &str,
        remarks: &str,
        occasion: &str,
    ) -> MpesaResult<B2cInitiation> {
        let request = B2cPaymentRequest {
            originator_conversation_id: originator_conversation_id.to_string(),
            initiator_name: self.config.initiator_name.clone(),
            security_credential: self.config.security_credential.clone(),
            command_id: "BusinessPayment".to_string(),
            amount,
            party_a: self.config.b2c_shortcode.clone(),
            party_b: format_msisdn(phone_number),
            remarks: remarks.to_string(),
            queue_time_out_url: self.config.callback_url("/callbacks/b2c"),
            result_url: self.config.callback_url("/callbacks/b2c"),
            occasion: occasion.to_string(),
        };

        let ack: B2cAck = self
            .post_json("/mpesa/b2c/v3/paymentrequest", encode(&request)?)
            .await?;

        if ack.response_code.as_deref() != Some("0") {
            return Err(MpesaError::Rejected {
                code: ack.response_code,
                description: ack
                    .response_description
                    .unwrap_or_else(|| "M-Pesa API Error".to_string()),
            });
        }

        let initiation = B2cInitiation {
            conversation_id: require(ack.conversation_id, "ConversationID")?,
        };
        info!(
            originator_conversation_id,
            conversation_id = %initiation.conversation_id,
            "B2C payment accepted"
        );
        Ok(initiation)
    }

    async fn account_balance(&self, short_code: &str) -> MpesaResult<QueryInitiation> {
        let request = AccountBalanceRequest {
            initiator: self.config.initiator_name.clone(),
            security_credential: self.config.security_credential.clone(),
            command_id: "AccountBalance".to_string(),
            party_a: short_code.to_string(),
            identifier_type: "4".to_string(),
            remarks: "Balance Query".to_string(),
            queue_time_out_url: self.config.callback_url("/callbacks/balance"),
            result_url: self.config.callback_url("/callbacks/balance"),
        };

        let ack: QueryAck = self
            .post_json("/mpesa/accountbalance/v1/query", encode(&request)?)
            .await?;

        if let Some(code) = ack.response_code.as_deref() {
            if code != "0" {
                return Err(MpesaError::Rejected {
                    code: Some(code.to_string()),
                    description: ack
                        .response_description
                        .unwrap_or_else(|| "Balance query failed".to_string()),
                });
            }
        }

        Ok(QueryInitiation {
            originator_conversation_id: require(
                ack.originator_conversation_id,
                "OriginatorConversationID",
            )?,
            conversation_id: ack.conversation_id,
        })
    }

    async fn transaction_status(
        &self,
        transaction_id: &str,
        original_conversation_id: Option<&str>,
        party_a: &str,
    ) -> MpesaResult<QueryInitiation> {
        let request = TransactionStatusRequest {
            initiator: self.config.initiator_name.clone(),
            security_credential: self.config.security_credential.clone(),
            command_id: "TransactionStatusQuery".to_string(),
            transaction_id: transaction_id.to_string(),
            original_conversation_id: original_conversation_id.map(|v| v.to_string()),
            party_a: party_a.to_string(),
            identifier_type: "4".to_string(),
            result_url: self.config.callback_url("/callbacks/status"),
            queue_time_out_url: self.config.callback_url("/callbacks/status"),
            remarks: "Status Query".to_string(),
            occasion: "Reconciliation".to_string(),
        };

        let ack: QueryAck = self
            .post_json("/mpesa/transactionstatus/v1/query", encode(&request)?)
            .await?;

        if let Some(code) = ack.response_code.as_deref() {
            if code != "0" {
                return Err(MpesaError::Rejected {
                    code: Some(code.to_string()),
                    description: ack
                        .response_description
                        .unwrap_or_else(|| "Status query failed".to_string()),
                });
            }
        }

        Ok(QueryInitiation {
            originator_conversation_id: require(
                ack.originator_conversation_id,
                "OriginatorConversationID",
            )?,
            conversation_id: ack.conversation_id,
        })
    }

    async fn create_standing_order(
        &self,
        params: StandingOrderParams,
    ) -> MpesaResult<StandingOrderInitiation> {
        let request = StandingOrderRequest {
            standing_order_name: params.name,
            start_date: compact_date(params.start_date),
            end_date: compact_date(params.end_date),
            business_short_code: self.config.business_shortcode.clone(),
            transaction_type: "Standing Order Customer Pay Bill".to_string(),
            receiver_party_identifier_type: "4".to_string(),
            amount: params.amount.to_string(),
            party_a: format_msisdn(&params.phone_number),
            call_back_url: self.config.callback_url("/callbacks/ratiba"),
            account_reference: params.account_reference,
            transaction_desc: "ChamaPayment".to_string(),
            frequency: params.frequency,
        };

        let raw: JsonValue = self
            .post_json("/standingorder/v1/createStandingOrderExternal", encode(&request)?)
            .await?;
        let ack: StandingOrderAck =
            serde_json::from_value(raw.clone()).map_err(|e| MpesaError::Unavailable {
                message: format!("unexpected Ratiba acknowledgment shape: {}", e),
            })?;

        let header = ack.response_header.ok_or(MpesaError::Unavailable {
            message: "Ratiba acknowledgment missing ResponseHeader".to_string(),
        })?;

        // Ratiba signals acceptance with responseCode "200", not "0"
        let code = header
            .response_code
            .as_ref()
            .map(|v| match v {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();
        if code != "200" {
            return Err(MpesaError::Rejected {
                code: Some(code),
                description: header
                    .response_description
                    .unwrap_or_else(|| "Ratiba Request Failed".to_string()),
            });
        }

        Ok(StandingOrderInitiation {
            response_ref_id: require(header.response_ref_id, "responseRefID")?,
            raw,
        })
    }
}

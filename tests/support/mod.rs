//! In-memory store implementations and a stub provider gateway for
//! exercising handlers without a database or network.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use bigdecimal::BigDecimal;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use pesachama_backend::config::{
    AppConfig, DatabaseConfig, LogFormat, LoggingConfig, MpesaConfig, MpesaEnvironment,
    ServerConfig,
};
use pesachama_backend::database::error::{DatabaseError, DatabaseErrorKind};
use pesachama_backend::mpesa::client::{
    B2cInitiation, MpesaGateway, QueryInitiation, StandingOrderInitiation, StandingOrderParams,
    StkInitiation,
};
use pesachama_backend::mpesa::{MpesaError, MpesaResult};
use pesachama_backend::state::AppState;
use pesachama_backend::store::{
    status, AccountBalances, BalanceQueryRecord, BalanceStore, ChamaStore, MemberProfile,
    NewPayout, NewStandingOrder, NewTransaction, PayoutRecord, PayoutStore, StandingOrderRecord,
    StandingOrderStore, StatusQueryRecord, StatusQueryStore, TransactionRecord, TransactionStore,
};
use pesachama_backend::{api, callbacks};

/// Shared in-memory backing for all store traits
#[derive(Default, Clone)]
pub struct InMemory {
    pub transactions: Arc<Mutex<Vec<TransactionRecord>>>,
    pub payouts: Arc<Mutex<Vec<PayoutRecord>>>,
    pub standing_orders: Arc<Mutex<Vec<StandingOrderRecord>>>,
    pub balances: Arc<Mutex<Vec<BalanceQueryRecord>>>,
    pub status_queries: Arc<Mutex<Vec<StatusQueryRecord>>>,
    pub chama_balances: Arc<Mutex<HashMap<Uuid, BigDecimal>>>,
    pub members: Arc<Mutex<Vec<(String, MemberProfile)>>>,
}

impl InMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_chama(&self, chama_id: Uuid, balance: BigDecimal) {
        self.chama_balances.lock().unwrap().insert(chama_id, balance);
    }

    pub fn seed_member(&self, phone_number: &str, member: MemberProfile) {
        self.members
            .lock()
            .unwrap()
            .push((phone_number.to_string(), member));
    }

    pub fn seed_pending_deposit(&self, checkout_request_id: &str, amount: f64) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.transactions.lock().unwrap().push(TransactionRecord {
            id,
            chama_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: BigDecimal::try_from(amount).unwrap(),
            kind: "deposit".to_string(),
            status: status::PENDING.to_string(),
            payment_method: "mpesa".to_string(),
            reference: None,
            description: None,
            mpesa_transaction_id: None,
            metadata: json!({ "checkout_request_id": checkout_request_id }),
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn seed_pending_payout(
        &self,
        originator_conversation_id: &str,
        chama_id: Uuid,
        amount: f64,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.payouts.lock().unwrap().push(PayoutRecord {
            id,
            chama_id,
            user_id: Uuid::new_v4(),
            amount: BigDecimal::try_from(amount).unwrap(),
            phone_number: "254712345678".to_string(),
            status: status::PENDING.to_string(),
            originator_conversation_id: originator_conversation_id.to_string(),
            conversation_id: None,
            result_code: None,
            result_desc: None,
            transaction_id: None,
            remarks: Some("Chama Withdrawal".to_string()),
            completed_at: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn seed_pending_balance_query(&self, originator_conversation_id: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.balances.lock().unwrap().push(BalanceQueryRecord {
            id,
            chama_id: Uuid::new_v4(),
            originator_conversation_id: originator_conversation_id.to_string(),
            conversation_id: None,
            status: status::PENDING.to_string(),
            working_balance: None,
            utility_balance: None,
            charges_paid_balance: None,
            result_desc: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn seed_pending_standing_order(&self, mpesa_response_id: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.standing_orders
            .lock()
            .unwrap()
            .push(StandingOrderRecord {
                id,
                chama_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                name: "Monthly savings".to_string(),
                amount: BigDecimal::try_from(1000.0).unwrap(),
                frequency: "4".to_string(),
                start_date: Utc::now().date_naive(),
                end_date: Utc::now().date_naive(),
                status: status::PENDING.to_string(),
                mpesa_response_id: Some(mpesa_response_id.to_string()),
                mpesa_transaction_id: None,
                metadata: json!({}),
                created_at: now,
                updated_at: now,
            });
        id
    }

    pub fn seed_status_query(
        &self,
        originator_conversation_id: &str,
        target_kind: &str,
        target_reference: &str,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.status_queries.lock().unwrap().push(StatusQueryRecord {
            id,
            originator_conversation_id: originator_conversation_id.to_string(),
            target_kind: target_kind.to_string(),
            target_reference: target_reference.to_string(),
            status: status::PENDING.to_string(),
            transaction_status: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn transaction(&self, id: Uuid) -> TransactionRecord {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .expect("transaction exists")
    }

    pub fn payout(&self, id: Uuid) -> PayoutRecord {
        self.payouts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .expect("payout exists")
    }

    pub fn chama_balance(&self, chama_id: Uuid) -> BigDecimal {
        self.chama_balances
            .lock()
            .unwrap()
            .get(&chama_id)
            .cloned()
            .expect("chama exists")
    }

    pub fn ledger_entries_of_kind(&self, kind: &str) -> Vec<TransactionRecord> {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.kind == kind)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TransactionStore for InMemory {
    async fn insert(&self, record: NewTransaction) -> Result<TransactionRecord, DatabaseError> {
        let now = Utc::now();
        let row = TransactionRecord {
            id: Uuid::new_v4(),
            chama_id: record.chama_id,
            user_id: record.user_id,
            amount: record.amount,
            kind: record.kind,
            status: record.status,
            payment_method: record.payment_method,
            reference: record.reference,
            description: record.description,
            mpesa_transaction_id: None,
            metadata: record.metadata,
            created_at: now,
            updated_at: now,
        };
        self.transactions.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn merge_metadata(&self, id: Uuid, patch: JsonValue) -> Result<(), DatabaseError> {
        let mut rows = self.transactions.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|t| t.id == id) {
            if let (Some(existing), Some(incoming)) =
                (row.metadata.as_object_mut(), patch.as_object())
            {
                for (k, v) in incoming {
                    existing.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(())
    }

    async fn find_by_checkout_request_id(
        &self,
        checkout_request_id: &str,
    ) -> Result<Option<TransactionRecord>, DatabaseError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| {
                t.metadata.get("checkout_request_id").and_then(|v| v.as_str())
                    == Some(checkout_request_id)
            })
            .cloned())
    }

    async fn complete_if_pending(
        &self,
        id: Uuid,
        mpesa_transaction_id: Option<&str>,
        metadata_patch: JsonValue,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self.transactions.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|t| t.id == id && t.status == status::PENDING)
        else {
            return Ok(false);
        };
        row.status = status::COMPLETED.to_string();
        row.mpesa_transaction_id = mpesa_transaction_id.map(|v| v.to_string());
        if let (Some(existing), Some(incoming)) =
            (row.metadata.as_object_mut(), metadata_patch.as_object())
        {
            for (k, v) in incoming {
                existing.insert(k.clone(), v.clone());
            }
        }
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn fail_if_pending(&self, id: Uuid, description: &str) -> Result<bool, DatabaseError> {
        let mut rows = self.transactions.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|t| t.id == id && t.status == status::PENDING)
        else {
            return Ok(false);
        };
        row.status = status::FAILED.to_string();
        row.description = Some(description.to_string());
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn complete_by_reference_if_pending(
        &self,
        reference: &str,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self.transactions.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|t| t.reference.as_deref() == Some(reference) && t.status == status::PENDING)
        else {
            return Ok(false);
        };
        row.status = status::COMPLETED.to_string();
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn total_completed_for_user(&self, user_id: Uuid) -> Result<BigDecimal, DatabaseError> {
        let total = self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                t.user_id == user_id
                    && t.status == status::COMPLETED
                    && (t.kind == "deposit" || t.kind == "contribution")
            })
            .map(|t| t.amount.clone())
            .sum();
        Ok(total)
    }
}

#[async_trait]
impl PayoutStore for InMemory {
    async fn insert(&self, record: NewPayout) -> Result<PayoutRecord, DatabaseError> {
        let now = Utc::now();
        let row = PayoutRecord {
            id: Uuid::new_v4(),
            chama_id: record.chama_id,
            user_id: record.user_id,
            amount: record.amount,
            phone_number: record.phone_number,
            status: status::PENDING.to_string(),
            originator_conversation_id: record.originator_conversation_id,
            conversation_id: None,
            result_code: None,
            result_desc: None,
            transaction_id: None,
            remarks: Some(record.remarks),
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.payouts.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn set_conversation_id(
        &self,
        id: Uuid,
        conversation_id: &str,
    ) -> Result<(), DatabaseError> {
        let mut rows = self.payouts.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|p| p.id == id) {
            row.conversation_id = Some(conversation_id.to_string());
        }
        Ok(())
    }

    async fn find_by_originator_id(
        &self,
        originator_conversation_id: &str,
    ) -> Result<Option<PayoutRecord>, DatabaseError> {
        Ok(self
            .payouts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.originator_conversation_id == originator_conversation_id)
            .cloned())
    }

    async fn complete_with_side_effects(
        &self,
        id: Uuid,
        result_code: &str,
        result_desc: &str,
        transaction_id: Option<&str>,
        ledger: NewTransaction,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self.payouts.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|p| p.id == id && p.status == status::PENDING)
        else {
            return Ok(false);
        };

        // All-or-nothing, like the database transaction: an unknown chama
        // leaves the payout pending and writes no ledger entry
        let mut balances = self.chama_balances.lock().unwrap();
        let Some(balance) = balances.get_mut(&ledger.chama_id) else {
            return Err(DatabaseError::new(DatabaseErrorKind::NotFound {
                entity: "Chama".to_string(),
                id: ledger.chama_id.to_string(),
            }));
        };
        *balance -= ledger.amount.clone();

        row.status = status::COMPLETED.to_string();
        row.result_code = Some(result_code.to_string());
        row.result_desc = Some(result_desc.to_string());
        row.transaction_id = transaction_id.map(|v| v.to_string());
        row.completed_at = Some(Utc::now());
        row.updated_at = Utc::now();

        let now = Utc::now();
        self.transactions.lock().unwrap().push(TransactionRecord {
            id: Uuid::new_v4(),
            chama_id: ledger.chama_id,
            user_id: ledger.user_id,
            amount: ledger.amount,
            kind: ledger.kind,
            status: ledger.status,
            payment_method: ledger.payment_method,
            reference: ledger.reference,
            description: ledger.description,
            mpesa_transaction_id: None,
            metadata: ledger.metadata,
            created_at: now,
            updated_at: now,
        });
        Ok(true)
    }

    async fn fail_if_pending(
        &self,
        id: Uuid,
        result_code: Option<&str>,
        result_desc: &str,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self.payouts.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|p| p.id == id && p.status == status::PENDING)
        else {
            return Ok(false);
        };
        row.status = status::FAILED.to_string();
        row.result_code = result_code.map(|v| v.to_string());
        row.result_desc = Some(result_desc.to_string());
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn complete_by_originator_if_pending(
        &self,
        originator_conversation_id: &str,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self.payouts.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|p| {
            p.originator_conversation_id == originator_conversation_id
                && p.status == status::PENDING
        }) else {
            return Ok(false);
        };
        row.status = status::COMPLETED.to_string();
        row.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl StandingOrderStore for InMemory {
    async fn insert(
        &self,
        record: NewStandingOrder,
    ) -> Result<StandingOrderRecord, DatabaseError> {
        let now = Utc::now();
        let row = StandingOrderRecord {
            id: Uuid::new_v4(),
            chama_id: record.chama_id,
            user_id: record.user_id,
            name: record.name,
            amount: record.amount,
            frequency: record.frequency,
            start_date: record.start_date,
            end_date: record.end_date,
            status: status::PENDING.to_string(),
            mpesa_response_id: None,
            mpesa_transaction_id: None,
            metadata: json!({}),
            created_at: now,
            updated_at: now,
        };
        self.standing_orders.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn set_response_ref(
        &self,
        id: Uuid,
        mpesa_response_id: &str,
        metadata: JsonValue,
    ) -> Result<(), DatabaseError> {
        let mut rows = self.standing_orders.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|o| o.id == id) {
            row.mpesa_response_id = Some(mpesa_response_id.to_string());
            if let (Some(existing), Some(incoming)) =
                (row.metadata.as_object_mut(), metadata.as_object())
            {
                for (k, v) in incoming {
                    existing.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(())
    }

    async fn find_by_response_ref(
        &self,
        mpesa_response_id: &str,
    ) -> Result<Option<StandingOrderRecord>, DatabaseError> {
        Ok(self
            .standing_orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.mpesa_response_id.as_deref() == Some(mpesa_response_id))
            .cloned())
    }

    async fn transition_if_pending(
        &self,
        id: Uuid,
        new_status: &str,
        mpesa_transaction_id: Option<&str>,
        metadata: JsonValue,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self.standing_orders.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|o| o.id == id && o.status == status::PENDING)
        else {
            return Ok(false);
        };
        row.status = new_status.to_string();
        if let Some(txn) = mpesa_transaction_id {
            row.mpesa_transaction_id = Some(txn.to_string());
        }
        if let (Some(existing), Some(incoming)) =
            (row.metadata.as_object_mut(), metadata.as_object())
        {
            for (k, v) in incoming {
                existing.insert(k.clone(), v.clone());
            }
        }
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn fail_if_pending(&self, id: Uuid, description: &str) -> Result<bool, DatabaseError> {
        self.transition_if_pending(
            id,
            status::FAILED,
            None,
            json!({ "failure_reason": description }),
        )
        .await
    }
}

#[async_trait]
impl BalanceStore for InMemory {
    async fn insert_query(
        &self,
        chama_id: Uuid,
        originator_conversation_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<BalanceQueryRecord, DatabaseError> {
        let now = Utc::now();
        let row = BalanceQueryRecord {
            id: Uuid::new_v4(),
            chama_id,
            originator_conversation_id: originator_conversation_id.to_string(),
            conversation_id: conversation_id.map(|v| v.to_string()),
            status: status::PENDING.to_string(),
            working_balance: None,
            utility_balance: None,
            charges_paid_balance: None,
            result_desc: None,
            created_at: now,
            updated_at: now,
        };
        self.balances.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn find_by_originator_id(
        &self,
        originator_conversation_id: &str,
    ) -> Result<Option<BalanceQueryRecord>, DatabaseError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.originator_conversation_id == originator_conversation_id)
            .cloned())
    }

    async fn record_balances_if_pending(
        &self,
        originator_conversation_id: &str,
        balances: &AccountBalances,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self.balances.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|b| {
            b.originator_conversation_id == originator_conversation_id
                && b.status == status::PENDING
        }) else {
            return Ok(false);
        };
        row.status = status::COMPLETED.to_string();
        row.working_balance = balances.working;
        row.utility_balance = balances.utility;
        row.charges_paid_balance = balances.charges_paid;
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn fail_if_pending(
        &self,
        originator_conversation_id: &str,
        description: &str,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self.balances.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|b| {
            b.originator_conversation_id == originator_conversation_id
                && b.status == status::PENDING
        }) else {
            return Ok(false);
        };
        row.status = status::FAILED.to_string();
        row.result_desc = Some(description.to_string());
        row.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl StatusQueryStore for InMemory {
    async fn insert(
        &self,
        originator_conversation_id: &str,
        target_kind: &str,
        target_reference: &str,
    ) -> Result<StatusQueryRecord, DatabaseError> {
        let now = Utc::now();
        let row = StatusQueryRecord {
            id: Uuid::new_v4(),
            originator_conversation_id: originator_conversation_id.to_string(),
            target_kind: target_kind.to_string(),
            target_reference: target_reference.to_string(),
            status: status::PENDING.to_string(),
            transaction_status: None,
            created_at: now,
            updated_at: now,
        };
        self.status_queries.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn find_by_originator_id(
        &self,
        originator_conversation_id: &str,
    ) -> Result<Option<StatusQueryRecord>, DatabaseError> {
        Ok(self
            .status_queries
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.originator_conversation_id == originator_conversation_id)
            .cloned())
    }

    async fn resolve_if_pending(
        &self,
        id: Uuid,
        new_status: &str,
        transaction_status: &str,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self.status_queries.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|q| q.id == id && q.status == status::PENDING)
        else {
            return Ok(false);
        };
        row.status = new_status.to_string();
        row.transaction_status = Some(transaction_status.to_string());
        row.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl ChamaStore for InMemory {
    async fn find_member_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<MemberProfile>, DatabaseError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .find(|(phone, _)| phone == phone_number)
            .map(|(_, member)| member.clone()))
    }
}

/// Stub gateway returning canned acks; records each call made
pub struct StubGateway {
    pub stk: MpesaResult<StkInitiation>,
    pub b2c: MpesaResult<B2cInitiation>,
    pub query: MpesaResult<QueryInitiation>,
    pub standing_order: MpesaResult<StandingOrderInitiation>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl Default for StubGateway {
    fn default() -> Self {
        Self {
            stk: Ok(StkInitiation {
                checkout_request_id: "ws_CO_TEST_1".to_string(),
                merchant_request_id: "29115-TEST-1".to_string(),
            }),
            b2c: Ok(B2cInitiation {
                conversation_id: "AG_TEST_1".to_string(),
            }),
            query: Ok(QueryInitiation {
                originator_conversation_id: "OCID-TEST-1".to_string(),
                conversation_id: Some("AG_TEST_2".to_string()),
            }),
            standing_order: Ok(StandingOrderInitiation {
                response_ref_id: "ref-TEST-1".to_string(),
                raw: json!({ "ResponseHeader": { "responseCode": "200" } }),
            }),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl StubGateway {
    pub fn rejecting_all(description: &str) -> Self {
        let err = MpesaError::Rejected {
            code: Some("1".to_string()),
            description: description.to_string(),
        };
        Self {
            stk: Err(err.clone()),
            b2c: Err(err.clone()),
            query: Err(err.clone()),
            standing_order: Err(err),
            ..Self::default()
        }
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl MpesaGateway for StubGateway {
    async fn stk_push(&self, _amount: u64, _phone_number: &str) -> MpesaResult<StkInitiation> {
        self.record("stk_push");
        self.stk.clone()
    }

    async fn b2c_payment(
        &self,
        _originator_conversation_id: &str,
        _amount: u64,
        _phone_number: &str,
        _remarks: &str,
        _occasion: &str,
    ) -> MpesaResult<B2cInitiation> {
        self.record("b2c_payment");
        self.b2c.clone()
    }

    async fn account_balance(&self, _short_code: &str) -> MpesaResult<QueryInitiation> {
        self.record("account_balance");
        self.query.clone()
    }

    async fn transaction_status(
        &self,
        _transaction_id: &str,
        _original_conversation_id: Option<&str>,
        _party_a: &str,
    ) -> MpesaResult<QueryInitiation> {
        self.record("transaction_status");
        self.query.clone()
    }

    async fn create_standing_order(
        &self,
        _params: StandingOrderParams,
    ) -> MpesaResult<StandingOrderInitiation> {
        self.record("create_standing_order");
        self.standing_order.clone()
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        },
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 5,
            min_connections: 1,
            connection_timeout: 30,
        },
        logging: LoggingConfig {
            level: "INFO".to_string(),
            format: LogFormat::Plain,
        },
        mpesa: MpesaConfig {
            consumer_key: "key".to_string(),
            consumer_secret: "secret".to_string(),
            passkey: "passkey".to_string(),
            business_shortcode: "174379".to_string(),
            b2c_shortcode: "600000".to_string(),
            initiator_name: "testapi".to_string(),
            security_credential: "credential".to_string(),
            environment: MpesaEnvironment::Sandbox,
            callback_base_url: "https://example.com".to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 0,
        },
    }
}

pub fn test_state(gateway: StubGateway) -> (AppState, InMemory) {
    let stores = InMemory::new();
    let state = AppState {
        config: Arc::new(test_config()),
        gateway: Arc::new(gateway),
        transactions: Arc::new(stores.clone()),
        payouts: Arc::new(stores.clone()),
        standing_orders: Arc::new(stores.clone()),
        balances: Arc::new(stores.clone()),
        status_queries: Arc::new(stores.clone()),
        chamas: Arc::new(stores.clone()),
    };
    (state, stores)
}

pub fn test_app(gateway: StubGateway) -> (Router, InMemory) {
    let (state, stores) = test_state(gateway);
    let app = api::router().merge(callbacks::router()).with_state(state);
    (app, stores)
}

//! Store traits and entities for pending M-Pesa operations.
//!
//! Initiators create pending records; the callback reconcilers own every
//! transition out of `pending`. All terminal transitions go through
//! `*_if_pending` methods which must be implemented as compare-and-set
//! updates: they return `true` only for the first application, and callers
//! run side effects (balance decrement, ledger insert) only on `true`.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::error::DatabaseError;

/// Operation statuses shared across the pending-record tables
pub mod status {
    pub const PENDING: &str = "pending";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
    /// Standing orders only
    pub const ACTIVE: &str = "active";
}

/// Row in `transactions`: a deposit awaiting its STK callback, or a ledger
/// entry written as a side effect of a completed operation.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub chama_id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub kind: String,
    pub status: String,
    pub payment_method: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub mpesa_transaction_id: Option<String>,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub chama_id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub kind: String,
    pub status: String,
    pub payment_method: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub metadata: JsonValue,
}

/// Row in `payouts`: a B2C disbursement awaiting its result callback.
#[derive(Debug, Clone, FromRow)]
pub struct PayoutRecord {
    pub id: Uuid,
    pub chama_id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub phone_number: String,
    pub status: String,
    pub originator_conversation_id: String,
    pub conversation_id: Option<String>,
    pub result_code: Option<String>,
    pub result_desc: Option<String>,
    pub transaction_id: Option<String>,
    pub remarks: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayout {
    pub chama_id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub phone_number: String,
    pub originator_conversation_id: String,
    pub remarks: String,
}

/// Row in `standing_orders`: a Ratiba order awaiting activation.
#[derive(Debug, Clone, FromRow)]
pub struct StandingOrderRecord {
    pub id: Uuid,
    pub chama_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount: BigDecimal,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub mpesa_response_id: Option<String>,
    pub mpesa_transaction_id: Option<String>,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStandingOrder {
    pub chama_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount: BigDecimal,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Row in `balance_history`: a snapshot created speculatively when a balance
/// query is initiated and filled in by the balance callback.
#[derive(Debug, Clone, FromRow)]
pub struct BalanceQueryRecord {
    pub id: Uuid,
    pub chama_id: Uuid,
    pub originator_conversation_id: String,
    pub conversation_id: Option<String>,
    pub status: String,
    pub working_balance: Option<f64>,
    pub utility_balance: Option<f64>,
    pub charges_paid_balance: Option<f64>,
    pub result_desc: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parsed sub-account balances from the provider's delimited balance string
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountBalances {
    pub working: Option<f64>,
    pub utility: Option<f64>,
    pub charges_paid: Option<f64>,
}

/// Row in `status_queries`: a transaction-status request carrying an
/// explicit tag for the record it targets, so the status callback can
/// dispatch without sniffing identifier prefixes.
#[derive(Debug, Clone, FromRow)]
pub struct StatusQueryRecord {
    pub id: Uuid,
    pub originator_conversation_id: String,
    pub target_kind: String,
    pub target_reference: String,
    pub status: String,
    pub transaction_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a status query targets
pub mod target_kind {
    pub const DEPOSIT: &str = "deposit";
    pub const WITHDRAWAL: &str = "withdrawal";
}

/// Member profile resolved from a phone number (USSD flows)
#[derive(Debug, Clone, FromRow)]
pub struct MemberProfile {
    pub user_id: Uuid,
    pub first_name: String,
    pub chama_id: Uuid,
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, record: NewTransaction) -> Result<TransactionRecord, DatabaseError>;

    /// Merge keys into `metadata` without clobbering unrelated keys
    async fn merge_metadata(&self, id: Uuid, patch: JsonValue) -> Result<(), DatabaseError>;

    /// Exact, case-sensitive match on `metadata->>'checkout_request_id'`
    async fn find_by_checkout_request_id(
        &self,
        checkout_request_id: &str,
    ) -> Result<Option<TransactionRecord>, DatabaseError>;

    /// Terminal success transition. `metadata_patch` is merged in the same
    /// statement so the receipt details cannot be lost between two writes
    async fn complete_if_pending(
        &self,
        id: Uuid,
        mpesa_transaction_id: Option<&str>,
        metadata_patch: JsonValue,
    ) -> Result<bool, DatabaseError>;

    async fn fail_if_pending(&self, id: Uuid, description: &str) -> Result<bool, DatabaseError>;

    /// Status-callback path: complete a deposit addressed by its reference
    async fn complete_by_reference_if_pending(
        &self,
        reference: &str,
    ) -> Result<bool, DatabaseError>;

    /// Sum of completed deposit/contribution amounts for a member (USSD)
    async fn total_completed_for_user(&self, user_id: Uuid) -> Result<BigDecimal, DatabaseError>;
}

#[async_trait]
pub trait PayoutStore: Send + Sync {
    async fn insert(&self, record: NewPayout) -> Result<PayoutRecord, DatabaseError>;

    async fn set_conversation_id(
        &self,
        id: Uuid,
        conversation_id: &str,
    ) -> Result<(), DatabaseError>;

    async fn find_by_originator_id(
        &self,
        originator_conversation_id: &str,
    ) -> Result<Option<PayoutRecord>, DatabaseError>;

    /// Terminal success transition together with its side effects: the
    /// group balance decrement and the withdrawal ledger entry commit in the
    /// same database transaction as the status flip. If any of the three
    /// writes fails the payout stays pending, so a provider retry can
    /// re-apply the whole set.
    async fn complete_with_side_effects(
        &self,
        id: Uuid,
        result_code: &str,
        result_desc: &str,
        transaction_id: Option<&str>,
        ledger: NewTransaction,
    ) -> Result<bool, DatabaseError>;

    async fn fail_if_pending(
        &self,
        id: Uuid,
        result_code: Option<&str>,
        result_desc: &str,
    ) -> Result<bool, DatabaseError>;

    /// Status-callback path: complete a payout addressed by its originator id
    async fn complete_by_originator_if_pending(
        &self,
        originator_conversation_id: &str,
    ) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait StandingOrderStore: Send + Sync {
    async fn insert(&self, record: NewStandingOrder)
        -> Result<StandingOrderRecord, DatabaseError>;

    async fn set_response_ref(
        &self,
        id: Uuid,
        mpesa_response_id: &str,
        metadata: JsonValue,
    ) -> Result<(), DatabaseError>;

    async fn find_by_response_ref(
        &self,
        mpesa_response_id: &str,
    ) -> Result<Option<StandingOrderRecord>, DatabaseError>;

    /// Transition to `active` or `failed`, persisting the raw callback
    /// payload into metadata for audit
    async fn transition_if_pending(
        &self,
        id: Uuid,
        status: &str,
        mpesa_transaction_id: Option<&str>,
        metadata: JsonValue,
    ) -> Result<bool, DatabaseError>;

    async fn fail_if_pending(&self, id: Uuid, description: &str) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn insert_query(
        &self,
        chama_id: Uuid,
        originator_conversation_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<BalanceQueryRecord, DatabaseError>;

    async fn find_by_originator_id(
        &self,
        originator_conversation_id: &str,
    ) -> Result<Option<BalanceQueryRecord>, DatabaseError>;

    async fn record_balances_if_pending(
        &self,
        originator_conversation_id: &str,
        balances: &AccountBalances,
    ) -> Result<bool, DatabaseError>;

    async fn fail_if_pending(
        &self,
        originator_conversation_id: &str,
        description: &str,
    ) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait StatusQueryStore: Send + Sync {
    async fn insert(
        &self,
        originator_conversation_id: &str,
        target_kind: &str,
        target_reference: &str,
    ) -> Result<StatusQueryRecord, DatabaseError>;

    async fn find_by_originator_id(
        &self,
        originator_conversation_id: &str,
    ) -> Result<Option<StatusQueryRecord>, DatabaseError>;

    async fn resolve_if_pending(
        &self,
        id: Uuid,
        status: &str,
        transaction_status: &str,
    ) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait ChamaStore: Send + Sync {
    /// USSD directory lookup: phone number to member + primary chama
    async fn find_member_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<MemberProfile>, DatabaseError>;
}

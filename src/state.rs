use std::sync::Arc;

use crate::config::AppConfig;
use crate::mpesa::MpesaGateway;
use crate::store::{
    BalanceStore, ChamaStore, PayoutStore, StandingOrderStore, StatusQueryStore, TransactionStore,
};

/// Shared application state. Stores and the provider gateway sit behind
/// trait objects so handlers are testable without a database or network.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn MpesaGateway>,
    pub transactions: Arc<dyn TransactionStore>,
    pub payouts: Arc<dyn PayoutStore>,
    pub standing_orders: Arc<dyn StandingOrderStore>,
    pub balances: Arc<dyn BalanceStore>,
    pub status_queries: Arc<dyn StatusQueryStore>,
    pub chamas: Arc<dyn ChamaStore>,
}

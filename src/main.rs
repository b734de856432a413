use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use pesachama_backend::api;
use pesachama_backend::callbacks;
use pesachama_backend::config::AppConfig;
use pesachama_backend::database::balance_repository::BalanceRepository;
use pesachama_backend::database::chama_repository::ChamaRepository;
use pesachama_backend::database::payout_repository::PayoutRepository;
use pesachama_backend::database::standing_order_repository::StandingOrderRepository;
use pesachama_backend::database::status_query_repository::StatusQueryRepository;
use pesachama_backend::database::transaction_repository::TransactionRepository;
use pesachama_backend::database::{init_pool, PoolConfig};
use pesachama_backend::logging::init_tracing;
use pesachama_backend::middleware::UuidRequestId;
use pesachama_backend::mpesa::MpesaClient;
use pesachama_backend::state::AppState;

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    config.validate()?;
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.mpesa.environment,
        "Starting PesaChama backend service"
    );

    let pool = init_pool(&config.database.url, PoolConfig::from(&config.database)).await?;

    let gateway = MpesaClient::new(config.mpesa.clone())
        .map_err(|e| anyhow::anyhow!("failed to initialize M-Pesa client: {}", e))?;

    let state = AppState {
        config: Arc::new(config.clone()),
        gateway: Arc::new(gateway),
        transactions: Arc::new(TransactionRepository::new(pool.clone())),
        payouts: Arc::new(PayoutRepository::new(pool.clone())),
        standing_orders: Arc::new(StandingOrderRepository::new(pool.clone())),
        balances: Arc::new(BalanceRepository::new(pool.clone())),
        status_queries: Arc::new(StatusQueryRepository::new(pool.clone())),
        chamas: Arc::new(ChamaRepository::new(pool)),
    };

    let app = api::router()
        .merge(callbacks::router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!(%addr, "Listening for requests");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

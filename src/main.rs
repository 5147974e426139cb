use axum::routing::{get, post};
use axum::{Json, Router};
use dotenv::dotenv;
use modelhouse_backend::api::charges::{self, ChargesState};
use modelhouse_backend::charges::service::{ChargeService, ChargeServiceConfig};
use modelhouse_backend::charges::session::MemoryPendingChargeStore;
use modelhouse_backend::config::AppConfig;
use modelhouse_backend::database::ledger_repository::PgLedgerStore;
use modelhouse_backend::database::init_pool_from_config;
use modelhouse_backend::gateway::client::GatewayClient;
use modelhouse_backend::health::{self, HealthStatus};
use modelhouse_backend::logging::init_tracing;
use modelhouse_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};

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

    info!("shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env()?;
    config.validate()?;
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        "starting modelhouse backend service"
    );

    let db_pool = init_pool_from_config(&config.database).await.map_err(|e| {
        error!("failed to initialize database pool: {}", e);
        anyhow::anyhow!(e.to_string())
    })?;

    let gateway = Arc::new(GatewayClient::new(&config.gateway).map_err(|e| {
        error!("failed to initialize card gateway client: {}", e);
        anyhow::anyhow!(e.to_string())
    })?);
    let ledger = Arc::new(PgLedgerStore::new(db_pool.clone()));
    let sessions = Arc::new(MemoryPendingChargeStore::new());
    let charge_service = Arc::new(ChargeService::new(
        gateway,
        ledger,
        sessions,
        ChargeServiceConfig::from_env(),
    ));

    let charges_state = ChargesState {
        service: charge_service,
    };

    let charge_routes = Router::new()
        .route("/api/charges", post(charges::process_charge))
        .route("/api/charges/pin", post(charges::submit_pin))
        .route("/api/charges/otp", post(charges::submit_otp))
        .with_state(charges_state);
    let health_routes = Router::new()
        .route("/health", get(health_handler))
        .with_state(db_pool.clone());

    let app = Router::new()
        .merge(charge_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

async fn health_handler(
    axum::extract::State(pool): axum::extract::State<sqlx::PgPool>,
) -> Json<HealthStatus> {
    Json(health::check(&pool).await)
}

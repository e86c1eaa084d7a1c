//! Auth service: registration, login, token refresh/rotation, the password
//! reset lifecycle, and user profile queries. Publishes
//! `password_reset_requested` events to the `auth:events` stream.

use axum::routing::get;
use axum::{Json, Router};
use axum_helpers::JwtAuth;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::postgres::PgUserRepository;
use domain_users::streams::StreamAuthEventPublisher;
use domain_users::{handlers, AuthEventStream, UserService};
use eyre::WrapErr;
use std::sync::Arc;
use stream_worker::EventProducer;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);
    info!(name = %config.app.name, version = %config.app.version, "Starting auth service");

    let postgres_future = async {
        database::postgres::connect_from_config_with_retry(config.database.clone(), None)
            .await
            .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {e}"))
    };
    let redis_future = async {
        database::redis::connect_from_config_with_retry(config.redis.clone(), None)
            .await
            .map_err(|e| eyre::eyre!("Redis connection failed: {e}"))
    };
    let (db, redis) = tokio::try_join!(postgres_future, redis_future)?;

    let jwt = JwtAuth::new(&config.jwt);
    let producer = EventProducer::from_stream_def::<AuthEventStream>(redis);
    let service = Arc::new(UserService::new(
        Arc::new(PgUserRepository::new(db.clone())),
        Arc::new(StreamAuthEventPublisher::new(producer)),
        jwt.clone(),
    ));

    let app = handlers::router(service, jwt).merge(health_router(&config))
        .layer(TraceLayer::new_for_http());

    let address = config.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("Failed to bind {address}"))?;
    info!(%address, "Auth service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server error")?;

    if let Err(e) = db.close().await {
        error!(error = %e, "Error closing PostgreSQL connection");
    }
    info!("Auth service shutdown complete");
    Ok(())
}

fn health_router(config: &Config) -> Router {
    let payload = serde_json::json!({
        "status": "ok",
        "name": config.app.name,
        "version": config.app.version,
    });
    Router::new().route(
        "/health",
        get(move || {
            let payload = payload.clone();
            async move { Json(payload) }
        }),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

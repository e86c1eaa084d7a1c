//! Notifications service: consumes `tasks:events`, persists per-user
//! notifications, serves the feed API, and pushes live updates over
//! WebSocket. The stream worker runs inside the same process as the
//! HTTP server and shares its shutdown signal.

use axum::routing::get;
use axum::{Json, Router};
use axum_helpers::JwtAuth;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_notifications::postgres::PgNotificationRepository;
use domain_notifications::{handlers, NotificationService, PushRegistry, TaskEventProcessor};
use domain_tasks::{TaskEvent, TaskEventStream};
use eyre::WrapErr;
use std::sync::Arc;
use stream_worker::{StreamWorker, WorkerConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tokio::sync::watch;
use tracing::{error, info};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);
    info!(name = %config.app.name, version = %config.app.version, "Starting notifications service");

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
    let service = Arc::new(NotificationService::new(
        Arc::new(PgNotificationRepository::new(db.clone())),
        PushRegistry::new(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // Short blocking reads so the worker notices shutdown quickly.
    let worker_config = WorkerConfig::from_stream_def::<TaskEventStream>().with_blocking(Some(1000));
    info!(
        stream = %worker_config.stream_name,
        consumer_group = %worker_config.consumer_group,
        consumer_id = %worker_config.consumer_id,
        "Starting task event worker"
    );
    let processor = TaskEventProcessor::new(service.as_ref().clone());
    let worker = StreamWorker::<TaskEvent, _>::new(redis, processor, worker_config);
    let worker_shutdown = shutdown_rx.clone();
    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker.run(worker_shutdown).await {
            error!(error = %e, "Task event worker failed");
        }
    });

    let app = handlers::router(service, jwt).merge(health_router(&config))
        .layer(TraceLayer::new_for_http());

    let address = config.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("Failed to bind {address}"))?;
    info!(%address, "Notifications service listening");

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .wrap_err("Server error")?;

    let _ = worker_handle.await;
    if let Err(e) = db.close().await {
        error!(error = %e, "Error closing PostgreSQL connection");
    }
    info!("Notifications service shutdown complete");
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

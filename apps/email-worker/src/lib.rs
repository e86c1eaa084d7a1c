//! Email worker: consumes `password_reset_requested` events from the
//! `auth:events` stream and delivers password reset mail through an
//! [`EmailProvider`].
//!
//! Delivery is at-least-once and loss-tolerant: a failed send is logged
//! and the entry is acknowledged, matching the bus semantics every other
//! consumer follows.

pub mod processor;
pub mod provider;

use core_config::{app_info, env_or_default, Environment, FromEnv};
use database::redis::RedisConfig;
use domain_users::{AuthEvent, AuthEventStream};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use stream_worker::{StreamWorker, WorkerConfig};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use processor::PasswordResetProcessor;
use provider::TracingEmailProvider;

pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();

    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, "Starting email worker");

    let redis_config = RedisConfig::from_env().wrap_err("Failed to load Redis configuration")?;
    let redis = database::redis::connect_from_config_with_retry(redis_config, None)
        .await
        .wrap_err("Failed to connect to Redis")?;

    let reset_url_base = env_or_default(
        "RESET_URL_BASE",
        "http://localhost:3000/reset-password",
    );

    // Short blocking reads so shutdown is picked up quickly.
    let worker_config = WorkerConfig::from_stream_def::<AuthEventStream>().with_blocking(Some(1000));
    info!(
        stream = %worker_config.stream_name,
        consumer_group = %worker_config.consumer_group,
        consumer_id = %worker_config.consumer_id,
        "Worker configuration loaded"
    );

    let provider = Arc::new(TracingEmailProvider);
    let processor = PasswordResetProcessor::new(provider, reset_url_base);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let worker = StreamWorker::<AuthEvent, _>::new(redis, processor, worker_config);
    worker
        .run(shutdown_rx)
        .await
        .map_err(|e| eyre::eyre!("Worker failed: {e}"))?;

    info!("Email worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

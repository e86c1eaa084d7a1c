//! API gateway: single client entry point. Validates bearer tokens,
//! proxies to the downstream services with the caller's credentials, and
//! enriches history/comment pages with user profiles from the auth service.

use axum::routing::get;
use axum::{Json, Router};
use axum_helpers::JwtAuth;
use core_config::tracing::{init_tracing, install_color_eyre};
use eyre::WrapErr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

mod client;
mod config;
mod enrich;
mod error;
mod routes;

use client::DownstreamClient;
use config::Config;
use enrich::AuthUserResolver;
use routes::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);
    info!(
        name = %config.app.name,
        version = %config.app.version,
        tasks_url = %config.upstream.tasks_url,
        auth_url = %config.upstream.auth_url,
        notifications_url = %config.upstream.notifications_url,
        "Starting gateway"
    );

    let client = DownstreamClient::new(config.upstream.timeout)?;
    let resolver = Arc::new(AuthUserResolver::new(
        client.clone(),
        config.upstream.auth_url.clone(),
    ));
    let jwt = JwtAuth::new(&config.jwt);

    let state = AppState {
        config: config.clone(),
        client,
        resolver,
    };
    let app = routes::router(state, jwt)
        .merge(health_router(&config))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let address = config.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("Failed to bind {address}"))?;
    info!(%address, "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server error")?;

    info!("Gateway shutdown complete");
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

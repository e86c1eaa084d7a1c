//! Gateway routing: inbound bearer validation, verbatim proxying to the
//! downstream services, and enrichment of history/comment pages.

use axum::body::{to_bytes, Body};
use axum::extract::{Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{middleware, Extension, Json, Router};
use axum_helpers::{bearer_auth_middleware, BearerToken, JwtAuth};
use domain_tasks::models::{PageQuery, TaskComment, TaskHistory};
use domain_tasks::Page;
use std::sync::Arc;
use uuid::Uuid;

use crate::client::DownstreamClient;
use crate::config::Config;
use crate::enrich::{enrich_page, UserResolver};
use crate::error::GatewayError;

// Request bodies are JSON DTOs; anything past this is rejected upstream anyway.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client: DownstreamClient,
    pub resolver: Arc<dyn UserResolver>,
}

pub fn router(state: AppState, jwt: JwtAuth) -> Router {
    let public = Router::new()
        .route("/auth/register", post(proxy_auth))
        .route("/auth/login", post(proxy_auth))
        .route("/auth/refresh", post(proxy_auth))
        .route("/auth/forgot-password", post(proxy_auth))
        .route("/auth/reset-password", post(proxy_auth));

    let protected = Router::new()
        .route("/tasks", get(proxy_tasks).post(proxy_tasks))
        .route(
            "/tasks/{id}",
            get(proxy_tasks).patch(proxy_tasks).delete(proxy_tasks),
        )
        .route("/tasks/{id}/history", get(task_history))
        .route("/tasks/{id}/comments", get(task_comments).post(proxy_tasks))
        .route("/notifications", get(proxy_notifications))
        .route("/notifications/{id}/read", patch(proxy_notifications))
        .route("/users", get(proxy_auth))
        .layer(middleware::from_fn_with_state(jwt, bearer_auth_middleware));

    public.merge(protected).with_state(state)
}

async fn proxy_auth(State(state): State<AppState>, request: Request) -> Response {
    let base = state.config.upstream.auth_url.clone();
    forward(&state, &base, request).await
}

async fn proxy_tasks(State(state): State<AppState>, request: Request) -> Response {
    let base = state.config.upstream.tasks_url.clone();
    forward(&state, &base, request).await
}

async fn proxy_notifications(State(state): State<AppState>, request: Request) -> Response {
    let base = state.config.upstream.notifications_url.clone();
    forward(&state, &base, request).await
}

/// Replay the downstream response to the client unchanged, whatever its
/// status. Only hop failures (timeout, transport) map to gateway errors.
async fn forward(state: &AppState, base: &str, request: Request) -> Response {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let url = format!("{base}{path_and_query}");
    let method = request.method().clone();
    let authorization = request.headers().get(AUTHORIZATION).cloned();

    let body = match to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => return GatewayError::Transport(format!("request body error: {e}")).into_response(),
    };

    match state
        .client
        .forward(method, &url, authorization.as_ref(), body)
        .await
    {
        Ok(downstream) => Response::builder()
            .status(downstream.status)
            .header("content-type", "application/json")
            .body(Body::from(downstream.body))
            .unwrap_or_else(|_| {
                GatewayError::Transport("invalid downstream response".to_string()).into_response()
            }),
        Err(e) => e.into_response(),
    }
}

async fn task_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<Response, GatewayError> {
    let url = format!(
        "{}/tasks/{}/history?limit={}&offset={}",
        state.config.upstream.tasks_url, id, page.limit, page.offset
    );
    let upstream: Page<TaskHistory> = state.client.get_json(&url, &token).await?;
    let enriched = enrich_page(upstream, state.resolver.as_ref(), &token).await;
    Ok(Json(enriched).into_response())
}

async fn task_comments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<Response, GatewayError> {
    let url = format!(
        "{}/tasks/{}/comments?limit={}&offset={}",
        state.config.upstream.tasks_url, id, page.limit, page.offset
    );
    let upstream: Page<TaskComment> = state.client.get_json(&url, &token).await?;
    let enriched = enrich_page(upstream, state.resolver.as_ref(), &token).await;
    Ok(Json(enriched).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_helpers::JwtConfig;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            config: Config {
                app: core_config::AppInfo {
                    name: "gateway".to_string(),
                    version: "0.0.0".to_string(),
                },
                server: Default::default(),
                jwt: JwtConfig::new("access-secret", "refresh-secret"),
                upstream: crate::config::UpstreamConfig {
                    tasks_url: "http://localhost:1".to_string(),
                    auth_url: "http://localhost:1".to_string(),
                    notifications_url: "http://localhost:1".to_string(),
                    timeout: Duration::from_secs(1),
                },
                environment: core_config::Environment::Development,
            },
            client: DownstreamClient::new(Duration::from_secs(1)).unwrap(),
            resolver: Arc::new(crate::enrich::MockUserResolver::new()),
        }
    }

    fn app() -> Router {
        let state = test_state();
        let jwt = JwtAuth::new(&state.config.jwt);
        router(state, jwt)
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let response = app()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/tasks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn notifications_require_token() {
        let response = app()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/notifications")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_internal_error() {
        let jwt = JwtAuth::new(&JwtConfig::new("access-secret", "refresh-secret"));
        let token = jwt
            .create_access_token(&Uuid::now_v7().to_string(), "user@example.com")
            .unwrap();

        // Nothing listens on port 1, so the proxied call fails at transport.
        let response = app()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/tasks")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

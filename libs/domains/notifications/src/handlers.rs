//! HTTP and WebSocket handlers for the notifications service.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, patch};
use axum::{middleware, Extension, Json, Router};
use axum_helpers::{bearer_auth_middleware, JwtAuth, JwtClaims};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::NotificationError;
use crate::models::Notification;
use crate::push::PushRegistry;
use crate::service::NotificationService;

#[derive(Clone)]
pub struct NotificationsState {
    pub service: Arc<NotificationService>,
}

/// Build the notifications router. Every route requires a bearer token,
/// including the WebSocket upgrade.
pub fn router(service: Arc<NotificationService>, jwt: JwtAuth) -> Router {
    let state = NotificationsState { service };

    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", patch(mark_read))
        .route("/notifications/ws", get(push_upgrade))
        .layer(middleware::from_fn_with_state(jwt, bearer_auth_middleware))
        .with_state(state)
}

fn claims_user_id(claims: &JwtClaims) -> Result<Uuid, NotificationError> {
    Uuid::parse_str(&claims.sub)
        .map_err(|_| NotificationError::Internal("Invalid user id in token".to_string()))
}

#[utoipa::path(get, path = "/notifications",
    responses((status = 200, body = [Notification])))]
async fn list_notifications(
    State(state): State<NotificationsState>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<Vec<Notification>>, NotificationError> {
    let user_id = claims_user_id(&claims)?;
    let feed = state.service.find_all(user_id).await?;
    Ok(Json(feed))
}

#[utoipa::path(patch, path = "/notifications/{id}/read",
    responses((status = 200, body = Notification), (status = 404)))]
async fn mark_read(
    State(state): State<NotificationsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, NotificationError> {
    let notification = state.service.mark_read(id).await?;
    Ok(Json(notification))
}

async fn push_upgrade(
    State(state): State<NotificationsState>,
    Extension(claims): Extension<JwtClaims>,
    ws: WebSocketUpgrade,
) -> Result<Response, NotificationError> {
    let user_id = claims_user_id(&claims)?;
    let registry = state.service.push_registry();
    Ok(ws.on_upgrade(move |socket| push_socket(socket, registry, user_id)))
}

/// Forwards stored notifications to the client as JSON text frames until
/// the socket closes or a newer connection displaces this one.
async fn push_socket(mut socket: WebSocket, registry: PushRegistry, user_id: Uuid) {
    let (conn_id, mut rx) = registry.register(user_id).await;
    debug!(%user_id, %conn_id, "push connection opened");

    loop {
        tokio::select! {
            outgoing = rx.recv() => match outgoing {
                Some(notification) => {
                    let Ok(json) = serde_json::to_string(&notification) else {
                        continue;
                    };
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                // Sender dropped: a newer connection took over.
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    registry.unregister(user_id, conn_id).await;
    debug!(%user_id, %conn_id, "push connection closed");
}

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::Notification;

type Sender = mpsc::UnboundedSender<Notification>;

/// In-process registry of live push connections, one slot per user.
///
/// A user opening a second connection replaces the first: the previous
/// sender is dropped, which closes the old receiver and lets its socket
/// task wind down.
#[derive(Clone, Default)]
pub struct PushRegistry {
    connections: Arc<RwLock<HashMap<Uuid, (Uuid, Sender)>>>,
}

impl PushRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection for `user_id`, displacing any existing one.
    /// Returns the connection id and the receiving end for the socket task.
    pub async fn register(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = Uuid::now_v7();
        let mut connections = self.connections.write().await;
        if connections.insert(user_id, (conn_id, tx)).is_some() {
            debug!(%user_id, "replaced existing push connection");
        }
        (conn_id, rx)
    }

    /// Removes the user's connection, but only if it is still the one
    /// identified by `conn_id`. A newer connection stays registered.
    pub async fn unregister(&self, user_id: Uuid, conn_id: Uuid) {
        let mut connections = self.connections.write().await;
        if let Some((current, _)) = connections.get(&user_id) {
            if *current == conn_id {
                connections.remove(&user_id);
            }
        }
    }

    /// Delivers a notification to the user's live connection, if any.
    /// Returns whether a connection accepted it.
    pub async fn send(&self, notification: &Notification) -> bool {
        let connections = self.connections.read().await;
        match connections.get(&notification.user_id) {
            Some((_, tx)) => tx.send(notification.clone()).is_ok(),
            None => false,
        }
    }

    pub async fn connected_users(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notification(user_id: Uuid) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            user_id,
            payload: serde_json::json!({"kind": "task_created"}),
            created_at: Utc::now(),
            read_at: None,
        }
    }

    #[tokio::test]
    async fn delivers_to_registered_connection() {
        let registry = PushRegistry::new();
        let user_id = Uuid::now_v7();
        let (_conn, mut rx) = registry.register(user_id).await;

        assert!(registry.send(&notification(user_id)).await);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.user_id, user_id);
    }

    #[tokio::test]
    async fn send_without_connection_reports_no_delivery() {
        let registry = PushRegistry::new();
        assert!(!registry.send(&notification(Uuid::now_v7())).await);
    }

    #[tokio::test]
    async fn second_connection_displaces_first() {
        let registry = PushRegistry::new();
        let user_id = Uuid::now_v7();
        let (first_conn, mut first_rx) = registry.register(user_id).await;
        let (_second_conn, mut second_rx) = registry.register(user_id).await;

        assert!(registry.send(&notification(user_id)).await);
        assert!(second_rx.recv().await.is_some());
        assert!(first_rx.try_recv().is_err());

        // Unregistering the stale connection must not evict the live one.
        registry.unregister(user_id, first_conn).await;
        assert_eq!(registry.connected_users().await, 1);
    }

    #[tokio::test]
    async fn unregister_removes_current_connection() {
        let registry = PushRegistry::new();
        let user_id = Uuid::now_v7();
        let (conn_id, _rx) = registry.register(user_id).await;
        registry.unregister(user_id, conn_id).await;
        assert_eq!(registry.connected_users().await, 0);
        assert!(!registry.send(&notification(user_id)).await);
    }
}

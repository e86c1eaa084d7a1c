//! Email provider seam. Actual wire delivery lives behind this trait;
//! the worker ships with a tracing-backed provider that logs instead of
//! speaking SMTP.

use async_trait::async_trait;
use eyre::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// A rendered email ready for delivery.
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body_text: String,
}

/// Result of handing an email to a provider.
#[derive(Debug)]
pub struct SendResult {
    /// Provider-specific message id.
    pub message_id: String,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &Email) -> Result<SendResult>;

    fn name(&self) -> &'static str;
}

/// Provider that logs the email instead of delivering it.
#[derive(Default)]
pub struct TracingEmailProvider;

#[async_trait]
impl EmailProvider for TracingEmailProvider {
    async fn send(&self, email: &Email) -> Result<SendResult> {
        let message_id = Uuid::new_v4().to_string();
        info!(
            to = %email.to,
            subject = %email.subject,
            %message_id,
            "email delivered (log only)"
        );
        Ok(SendResult { message_id })
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Test provider that captures sent emails.
pub struct CapturingEmailProvider {
    sent: Arc<Mutex<Vec<Email>>>,
    should_fail: bool,
}

impl CapturingEmailProvider {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            should_fail: true,
        }
    }

    pub async fn sent_emails(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }

    pub async fn was_sent_to(&self, address: &str) -> bool {
        self.sent.lock().await.iter().any(|e| e.to == address)
    }
}

impl Default for CapturingEmailProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailProvider for CapturingEmailProvider {
    async fn send(&self, email: &Email) -> Result<SendResult> {
        if self.should_fail {
            return Err(eyre::eyre!("provider unavailable"));
        }
        self.sent.lock().await.push(email.clone());
        Ok(SendResult {
            message_id: Uuid::new_v4().to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "capturing"
    }
}

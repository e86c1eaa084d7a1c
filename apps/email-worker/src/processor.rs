//! Turns auth events into rendered emails.

use async_trait::async_trait;
use domain_users::AuthEvent;
use std::sync::Arc;
use stream_worker::{StreamError, StreamHandler};
use tracing::info;

use crate::provider::{Email, EmailProvider};

pub struct PasswordResetProcessor {
    provider: Arc<dyn EmailProvider>,
    reset_url_base: String,
}

impl PasswordResetProcessor {
    pub fn new(provider: Arc<dyn EmailProvider>, reset_url_base: impl Into<String>) -> Self {
        Self {
            provider,
            reset_url_base: reset_url_base.into(),
        }
    }

    fn render(&self, email: &str, reset_token: &str, username: &str) -> Email {
        let link = format!("{}?token={}", self.reset_url_base, reset_token);
        Email {
            to: email.to_string(),
            subject: "Reset your password".to_string(),
            body_text: format!(
                "Hi {username},\n\n\
                 A password reset was requested for your account. Follow the \
                 link below within the next hour to choose a new password:\n\n\
                 {link}\n\n\
                 If you did not request this, you can ignore this email."
            ),
        }
    }
}

#[async_trait]
impl StreamHandler<AuthEvent> for PasswordResetProcessor {
    async fn handle(&self, event: &AuthEvent) -> Result<(), StreamError> {
        match event {
            AuthEvent::PasswordResetRequested {
                email,
                reset_token,
                username,
            } => {
                let rendered = self.render(email, reset_token, username);
                let result = self
                    .provider
                    .send(&rendered)
                    .await
                    .map_err(|e| StreamError::handler(format!("email send failed: {e}")))?;
                info!(
                    to = %email,
                    provider = %self.provider.name(),
                    message_id = %result.message_id,
                    "password reset email sent"
                );
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "password-reset-processor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CapturingEmailProvider;

    fn event() -> AuthEvent {
        AuthEvent::PasswordResetRequested {
            email: "alice@example.com".to_string(),
            reset_token: "deadbeef".to_string(),
            username: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn sends_reset_email_with_token_link() {
        let provider = Arc::new(CapturingEmailProvider::new());
        let processor = PasswordResetProcessor::new(
            provider.clone(),
            "http://localhost:3000/reset-password",
        );

        processor.handle(&event()).await.unwrap();

        assert!(provider.was_sent_to("alice@example.com").await);
        let sent = provider.sent_emails().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0]
            .body_text
            .contains("http://localhost:3000/reset-password?token=deadbeef"));
        assert!(sent[0].body_text.contains("Hi alice"));
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_handler_error() {
        let provider = Arc::new(CapturingEmailProvider::failing());
        let processor = PasswordResetProcessor::new(provider, "http://localhost/reset");

        let err = processor.handle(&event()).await.unwrap_err();
        assert!(matches!(err, StreamError::Handler(_)));
    }
}

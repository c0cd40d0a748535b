//! Gmail delivery client
//!
//! One concern: submit a pre-built, encoded message on behalf of the
//! authenticated user and hand back the provider-assigned message id.
//! The `MailSender` trait is the seam for testing the pipeline without
//! network access.

use async_trait::async_trait;
use google_gmail1::api::Message;
use std::io::Cursor;
use tracing::{debug, info};

use crate::auth::GmailHub;
use crate::error::{CourierError, Result};
use crate::message::EncodedMessage;

/// Identifier the provider assigns to an accepted message
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub id: String,
    pub thread_id: Option<String>,
}

/// Trait defining the mail delivery operation for easier testing
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Submit one encoded message under `user_id` ("me" for the
    /// authenticated account) and return the provider's message id.
    async fn send(&self, user_id: &str, message: &EncodedMessage) -> Result<SentMessage>;
}

/// Production sender backed by the Gmail API hub
pub struct GmailSender {
    hub: GmailHub,
}

impl GmailSender {
    pub fn new(hub: GmailHub) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &GmailHub {
        &self.hub
    }
}

#[async_trait]
impl MailSender for GmailSender {
    async fn send(&self, user_id: &str, message: &EncodedMessage) -> Result<SentMessage> {
        // The generated send call uploads the RFC 2822 bytes as media
        let raw = message.to_rfc822()?;
        debug!("Submitting {} byte message for {}", raw.len(), user_id);

        let mime_type = "message/rfc822"
            .parse::<mime::Mime>()
            .map_err(|e| CourierError::Unknown(format!("Invalid upload mime type: {}", e)))?;

        let (_, sent) = self
            .hub
            .users()
            .messages_send(Message::default(), user_id)
            .upload(Cursor::new(raw), mime_type)
            .await?;

        let id = sent.id.ok_or_else(|| {
            CourierError::ApiError("Provider response missing message id".to_string())
        })?;

        info!("Message accepted by provider, id {}", id);
        Ok(SentMessage {
            id,
            thread_id: sent.thread_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_sender_returns_provider_id() {
        let mut sender = MockMailSender::new();
        sender
            .expect_send()
            .withf(|user_id, message| user_id == "me" && !message.raw.is_empty())
            .times(1)
            .returning(|_, _| {
                Ok(SentMessage {
                    id: "msg-123".to_string(),
                    thread_id: Some("thread-9".to_string()),
                })
            });

        let encoded = EncodedMessage {
            raw: "dGVzdA==".to_string(),
        };
        let sent = sender.send("me", &encoded).await.unwrap();
        assert_eq!(sent.id, "msg-123");
        assert_eq!(sent.thread_id.as_deref(), Some("thread-9"));
    }

    #[tokio::test]
    async fn test_mock_sender_surfaces_quota_error() {
        let mut sender = MockMailSender::new();
        sender.expect_send().returning(|_, _| {
            Err(CourierError::Forbidden(
                "HTTP 403: sending quota exceeded".to_string(),
            ))
        });

        let encoded = EncodedMessage {
            raw: "dGVzdA==".to_string(),
        };
        let err = sender.send("me", &encoded).await.unwrap_err();
        assert!(err.is_provider_error());
        assert!(err.is_permanent());
    }
}

//! Recording mock notifier for tests.

use crate::traits::{Notifier, NotifierError, NotifyChannel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A notification captured by [`MockNotifier`].
#[derive(Debug, Clone)]
pub struct SentNotification {
    /// Channel the message was sent to.
    pub channel: NotifyChannel,
    /// Rendered message body.
    pub message: String,
    /// Recipient list.
    pub recipients: Vec<String>,
    /// When the send was recorded.
    pub sent_at: DateTime<Utc>,
}

/// A notifier that records every send instead of delivering it.
#[derive(Default)]
pub struct MockNotifier {
    sent: Arc<RwLock<Vec<SentNotification>>>,
    fail_sends: bool,
}

impl MockNotifier {
    /// Creates a new recording notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier whose every send reports failure.
    pub fn failing() -> Self {
        Self {
            sent: Arc::new(RwLock::new(Vec::new())),
            fail_sends: true,
        }
    }

    /// Returns all notifications recorded so far.
    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.read().await.clone()
    }

    /// Returns the number of recorded notifications.
    pub async fn sent_count(&self) -> usize {
        self.sent.read().await.len()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(
        &self,
        channel: NotifyChannel,
        message: &str,
        recipients: &[String],
    ) -> Result<(), NotifierError> {
        self.sent.write().await.push(SentNotification {
            channel,
            message: message.to_string(),
            recipients: recipients.to_vec(),
            sent_at: Utc::now(),
        });

        if self.fail_sends {
            return Err(NotifierError::SendFailed(
                "mock notifier configured to fail".to_string(),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

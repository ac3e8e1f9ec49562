//! Generic webhook notification channel.
//!
//! Sends rendered notification messages as JSON payloads to an arbitrary
//! HTTP endpoint.

use crate::traits::{Notifier, NotifierError, NotifyChannel};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, instrument};

/// A notifier that posts JSON payloads to a webhook URL.
pub struct WebhookNotifier {
    /// The webhook URL to post notifications to.
    url: String,
    /// Additional headers to include in the request.
    headers: HashMap<String, String>,
    /// HTTP client for sending requests.
    #[cfg(not(test))]
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Creates a new webhook notifier.
    pub fn new(url: impl Into<String>) -> Result<Self, NotifierError> {
        let url = url.into();
        if url.is_empty() {
            return Err(NotifierError::InvalidConfig(
                "Webhook URL cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            url,
            headers: HashMap::new(),
            #[cfg(not(test))]
            client: reqwest::Client::new(),
        })
    }

    /// Adds a header to be included in webhook requests.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Adds an authorization header with a bearer token.
    pub fn with_bearer_token(self, token: impl Into<String>) -> Self {
        self.with_header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Creates the JSON payload for a send.
    fn create_payload(
        &self,
        channel: NotifyChannel,
        message: &str,
        recipients: &[String],
    ) -> WebhookPayload {
        WebhookPayload {
            channel: channel.as_str().to_string(),
            message: message.to_string(),
            recipients: recipients.to_vec(),
            sent_at: Utc::now().to_rfc3339(),
        }
    }

    /// Posts the payload to the webhook URL (actual HTTP call).
    #[cfg(not(test))]
    async fn post_payload(&self, payload: &WebhookPayload) -> Result<(), NotifierError> {
        let mut request = self.client.post(&self.url).json(payload);

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifierError::SendFailed(format!("HTTP request failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(NotifierError::RateLimited(
                "Webhook rate limit exceeded".to_string(),
            ))
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            Err(NotifierError::SendFailed(format!(
                "Webhook returned {}: {}",
                status, body
            )))
        }
    }

    /// Mock post for testing.
    #[cfg(test)]
    async fn post_payload(&self, _payload: &WebhookPayload) -> Result<(), NotifierError> {
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, message), fields(url = %self.url))]
    async fn send(
        &self,
        channel: NotifyChannel,
        message: &str,
        recipients: &[String],
    ) -> Result<(), NotifierError> {
        let payload = self.create_payload(channel, message, recipients);
        debug!(channel = %channel, "Posting notification to webhook");

        match self.post_payload(&payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(channel = %channel, error = %e, "Webhook notification failed");
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

/// The JSON payload posted to webhook endpoints.
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    /// Channel the message was addressed to.
    pub channel: String,
    /// Rendered message body.
    pub message: String,
    /// Recipient list.
    pub recipients: Vec<String>,
    /// ISO 8601 timestamp of when the send happened.
    pub sent_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_notifier_creation() {
        let notifier = WebhookNotifier::new("https://example.com/webhook");
        assert!(notifier.is_ok());
        assert_eq!(notifier.unwrap().name(), "webhook");
    }

    #[test]
    fn test_webhook_notifier_empty_url() {
        let result = WebhookNotifier::new("");
        assert!(matches!(result, Err(NotifierError::InvalidConfig(_))));
    }

    #[test]
    fn test_with_bearer_token() {
        let notifier = WebhookNotifier::new("https://example.com/webhook")
            .unwrap()
            .with_bearer_token("my-secret-token");

        assert_eq!(
            notifier.headers.get("Authorization"),
            Some(&"Bearer my-secret-token".to_string())
        );
    }

    #[test]
    fn test_payload_creation() {
        let notifier = WebhookNotifier::new("https://example.com/webhook").unwrap();
        let payload = notifier.create_payload(
            NotifyChannel::PagerDuty,
            "certificate expiring",
            &["oncall@example.com".to_string()],
        );

        assert_eq!(payload.channel, "pagerduty");
        assert_eq!(payload.message, "certificate expiring");
        assert_eq!(payload.recipients.len(), 1);
        assert!(payload.sent_at.contains('T'));
    }

    #[test]
    fn test_payload_serialization() {
        let notifier = WebhookNotifier::new("https://example.com/webhook").unwrap();
        let payload = notifier.create_payload(NotifyChannel::Slack, "msg", &[]);
        let json = serde_json::to_string(&payload).unwrap();

        assert!(json.contains("\"channel\":\"slack\""));
        assert!(json.contains("\"message\":\"msg\""));
        assert!(json.contains("\"sent_at\":"));
    }

    #[tokio::test]
    async fn test_send_in_test_mode() {
        let notifier = WebhookNotifier::new("https://example.com/webhook").unwrap();
        let result = notifier.send(NotifyChannel::Webhook, "body", &[]).await;
        assert!(result.is_ok());
    }
}

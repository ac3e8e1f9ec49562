//! Collaborator trait definitions for Compliance Warden.
//!
//! These interfaces are the seams between the automation engine and the
//! outside world. The engine treats both as fire-and-forget: delivery and
//! execution outcomes are the collaborator's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur when dispatching a notification.
#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),

    #[error("Invalid notifier configuration: {0}")]
    InvalidConfig(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),
}

/// Errors that can occur when dispatching a remediation script.
#[derive(Error, Debug)]
pub enum RemediationError {
    #[error("Failed to dispatch remediation: {0}")]
    DispatchFailed(String),

    #[error("Unknown script reference: {0}")]
    UnknownScript(String),
}

/// Delivery channels a notification step can target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotifyChannel {
    /// Slack webhook or bot integration.
    Slack,
    /// Email delivery.
    Email,
    /// Jira ticket comment or creation.
    Jira,
    /// PagerDuty paging.
    #[serde(rename = "pagerduty")]
    PagerDuty,
    /// Generic webhook for custom integrations.
    Webhook,
}

impl NotifyChannel {
    /// Returns the wire string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyChannel::Slack => "slack",
            NotifyChannel::Email => "email",
            NotifyChannel::Jira => "jira",
            NotifyChannel::PagerDuty => "pagerduty",
            NotifyChannel::Webhook => "webhook",
        }
    }
}

impl std::fmt::Display for NotifyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivers rendered notification messages to a channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a rendered message to the given channel and recipients.
    async fn send(
        &self,
        channel: NotifyChannel,
        message: &str,
        recipients: &[String],
    ) -> Result<(), NotifierError>;

    /// Name of this notifier implementation.
    fn name(&self) -> &str;
}

/// Dispatches remediation scripts to an external runner.
///
/// The engine records the dispatch; it never executes remediation code
/// itself.
#[async_trait]
pub trait RemediationRunner: Send + Sync {
    /// Hands a script reference and its parameters to the runner.
    async fn run(
        &self,
        script: &str,
        parameters: &HashMap<String, serde_json::Value>,
    ) -> Result<(), RemediationError>;

    /// Name of this runner implementation.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_as_str() {
        assert_eq!(NotifyChannel::Slack.as_str(), "slack");
        assert_eq!(NotifyChannel::Email.as_str(), "email");
        assert_eq!(NotifyChannel::Jira.as_str(), "jira");
        assert_eq!(NotifyChannel::PagerDuty.as_str(), "pagerduty");
        assert_eq!(NotifyChannel::Webhook.as_str(), "webhook");
    }

    #[test]
    fn test_channel_serialization() {
        let json = serde_json::to_string(&NotifyChannel::PagerDuty).unwrap();
        assert_eq!(json, "\"pagerduty\"");
        let parsed: NotifyChannel = serde_json::from_str("\"slack\"").unwrap();
        assert_eq!(parsed, NotifyChannel::Slack);
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let parsed: Result<NotifyChannel, _> = serde_json::from_str("\"carrier_pigeon\"");
        assert!(parsed.is_err());
    }
}

//! Notification delivery implementations.

pub mod mock;
pub mod webhook;

pub use mock::{MockNotifier, SentNotification};
pub use webhook::WebhookNotifier;

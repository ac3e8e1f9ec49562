//! # cw-connectors
//!
//! Collaborator seams for Compliance Warden.
//!
//! The engine core never talks to external systems directly. This crate
//! defines the trait interfaces it dispatches through — notification
//! delivery and remediation execution — together with a recording mock for
//! tests and a generic webhook notifier as the shipped real channel.

pub mod notify;
pub mod remediation;
pub mod traits;

pub use notify::{MockNotifier, SentNotification, WebhookNotifier};
pub use remediation::{MockRemediationRunner, ScriptInvocation};
pub use traits::{
    NotifierError, NotifyChannel, Notifier, RemediationError, RemediationRunner,
};

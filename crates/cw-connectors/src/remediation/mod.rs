//! Remediation runner implementations.

pub mod mock;

pub use mock::{MockRemediationRunner, ScriptInvocation};

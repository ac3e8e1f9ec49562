//! # cw-observability
//!
//! Logging and execution audit infrastructure for Compliance Warden.
//!
//! This crate provides structured logging with tracing and the append-only
//! execution ledger that records the outcome of every playbook run.

pub mod ledger;
pub mod logging;

pub use ledger::{ExecutionLedger, ExecutionOutcome, ExecutionRecord};
pub use logging::{init_logging, init_logging_with_config, LoggingConfig};

//! # cw-core
//!
//! Core detection and automation engine for Compliance Warden.
//!
//! This crate provides the violation model, detection rules and checks, the
//! playbook trigger matcher and step executor, the incident lifecycle
//! manager, and the orchestration entry point that ties them together.

pub mod asset;
pub mod automation;
pub mod detection;
pub mod incident;
pub mod playbook;
pub mod policy;
pub mod violation;

pub use asset::{
    CertificateInfo, DnsRecord, DomainRecord, FactCache, IpRecord, IpReputation, MonitoredAsset,
};
pub use automation::{AutomationConfig, AutomationEngine, AutomationError};
pub use detection::{DetectionEngine, DetectionError, DetectionRule, RuleCondition, RuleOperator};
pub use incident::{
    Incident, IncidentError, IncidentEvent, IncidentEventType, IncidentManager, IncidentStatus,
    IncidentUpdate, Priority,
};
pub use playbook::{
    ActionConfig, ActionKind, ConditionConfig, DelayConfig, ExecutorError, NotificationConfig,
    Playbook, PlaybookStep, PlaybookTrigger, RemediationConfig, StepConfig, StepExecutor,
    TriggerType,
};
pub use policy::{CompliancePolicy, SYSTEM_POLICY_ID, SYSTEM_POLICY_NAME};
pub use violation::{
    AssetType, Evidence, RemediationAction, RemediationStatus, RemediationType, Severity,
    Violation, ViolationError, ViolationStatus,
};

// Re-exported collaborator seams so engine callers need only this crate.
pub use cw_connectors::{Notifier, NotifyChannel, RemediationRunner};
pub use cw_observability::{ExecutionLedger, ExecutionOutcome, ExecutionRecord};

//! Violation data models for Compliance Warden.
//!
//! A violation is a detected deviation between observed infrastructure state
//! and a compliance expectation. Violations are immutable at creation except
//! for their status, which moves forward through a fixed lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Severity levels for violations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational - no immediate action required
    Info,
    /// Low severity
    Low,
    /// Medium severity
    Medium,
    /// High severity - requires attention
    High,
    /// Critical - immediate response required
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "Info"),
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// Asset families the detection engine monitors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    /// A DNS domain.
    Domain,
    /// An IP address.
    Ip,
    /// A TLS certificate.
    Certificate,
    /// A cloud resource (bucket, instance, etc.).
    CloudResource,
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Domain => write!(f, "domain"),
            AssetType::Ip => write!(f, "ip"),
            AssetType::Certificate => write!(f, "certificate"),
            AssetType::CloudResource => write!(f, "cloud_resource"),
        }
    }
}

/// Status of a violation in its response lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViolationStatus {
    /// Newly detected, not yet worked.
    Open,
    /// Being investigated by an analyst or automation.
    Investigating,
    /// Remediation in progress.
    Remediating,
    /// Confirmed and fixed.
    Resolved,
    /// Determined to be a false positive.
    FalsePositive,
}

impl ViolationStatus {
    /// Position of the status on the forward-only lifecycle.
    /// `FalsePositive` sits outside the ordering and is reachable from anywhere.
    fn rank(&self) -> Option<u8> {
        match self {
            ViolationStatus::Open => Some(0),
            ViolationStatus::Investigating => Some(1),
            ViolationStatus::Remediating => Some(2),
            ViolationStatus::Resolved => Some(3),
            ViolationStatus::FalsePositive => None,
        }
    }

    /// Returns true if a transition from `self` to `to` is permitted.
    pub fn can_transition_to(&self, to: ViolationStatus) -> bool {
        if to == ViolationStatus::FalsePositive {
            return *self != ViolationStatus::FalsePositive;
        }
        match (self.rank(), to.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }
}

impl std::fmt::Display for ViolationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationStatus::Open => write!(f, "Open"),
            ViolationStatus::Investigating => write!(f, "Investigating"),
            ViolationStatus::Remediating => write!(f, "Remediating"),
            ViolationStatus::Resolved => write!(f, "Resolved"),
            ViolationStatus::FalsePositive => write!(f, "False Positive"),
        }
    }
}

/// Errors raised by violation state handling.
#[derive(Error, Debug)]
pub enum ViolationError {
    #[error("Invalid status transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ViolationStatus,
        to: ViolationStatus,
    },
}

/// A piece of evidence attached to a violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// Kind of evidence (e.g., "fact_snapshot").
    pub evidence_type: String,
    /// What the evidence shows.
    pub description: String,
    /// Opaque data blob, typically the serialized raw fact.
    pub data: serde_json::Value,
    /// When the evidence was captured.
    pub timestamp: DateTime<Utc>,
}

impl Evidence {
    /// Captures a serialized fact snapshot as evidence.
    pub fn fact_snapshot(description: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            evidence_type: "fact_snapshot".to_string(),
            description: description.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// How a remediation action is carried out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemediationType {
    /// Requires a human.
    Manual,
    /// Can be dispatched to a remediation runner.
    Automated,
}

/// Progress of a remediation action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemediationStatus {
    /// Not yet started.
    Pending,
    /// Being worked.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Attempted and failed.
    Failed,
}

/// A remediation action attached to a violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationAction {
    /// How the action is carried out.
    pub remediation_type: RemediationType,
    /// Progress of the action.
    pub status: RemediationStatus,
    /// What needs to be done.
    pub description: String,
}

impl RemediationAction {
    /// The default action seeded on every detected violation.
    pub fn pending_manual(description: impl Into<String>) -> Self {
        Self {
            remediation_type: RemediationType::Manual,
            status: RemediationStatus::Pending,
            description: description.into(),
        }
    }
}

/// A detected compliance violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Unique identifier.
    pub id: Uuid,
    /// Originating policy id ("system" when no policy matched).
    pub policy_id: String,
    /// Originating policy name.
    pub policy_name: String,
    /// The monitored asset the violation was raised against.
    pub asset_id: Uuid,
    /// Family of the asset.
    pub asset_type: AssetType,
    /// Human-meaningful asset identifier (domain name, IP, cert subject).
    pub asset_identifier: String,
    /// Severity of the violation.
    pub severity: Severity,
    /// Lifecycle status.
    pub status: ViolationStatus,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Ordered evidence items.
    pub evidence: Vec<Evidence>,
    /// Ordered remediation actions.
    pub remediation_actions: Vec<RemediationAction>,
    /// When the violation was detected.
    pub detected_at: DateTime<Utc>,
    /// When the violation was resolved, if it has been.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Violation {
    /// Creates a new open violation.
    pub fn new(
        asset_id: Uuid,
        asset_type: AssetType,
        asset_identifier: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            policy_id: crate::policy::SYSTEM_POLICY_ID.to_string(),
            policy_name: crate::policy::SYSTEM_POLICY_NAME.to_string(),
            asset_id,
            asset_type,
            asset_identifier: asset_identifier.into(),
            severity,
            status: ViolationStatus::Open,
            title: title.into(),
            description: description.into(),
            evidence: Vec::new(),
            remediation_actions: Vec::new(),
            detected_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Sets the originating policy.
    pub fn with_policy(mut self, policy_id: impl Into<String>, policy_name: impl Into<String>) -> Self {
        self.policy_id = policy_id.into();
        self.policy_name = policy_name.into();
        self
    }

    /// Attaches an evidence item.
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    /// Attaches a remediation action.
    pub fn with_remediation(mut self, action: RemediationAction) -> Self {
        self.remediation_actions.push(action);
        self
    }

    /// Moves the violation to a new status.
    ///
    /// Transitions only go forward through the lifecycle; `FalsePositive` is
    /// reachable from any state. Reaching `Resolved` stamps `resolved_at`.
    pub fn transition_status(&mut self, to: ViolationStatus) -> Result<(), ViolationError> {
        if !self.status.can_transition_to(to) {
            return Err(ViolationError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        if to == ViolationStatus::Resolved {
            self.resolved_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_violation() -> Violation {
        Violation::new(
            Uuid::new_v4(),
            AssetType::Certificate,
            "api.example.com",
            Severity::High,
            "Certificate expiring soon",
            "Certificate expires in 21 days",
        )
    }

    #[test]
    fn test_new_violation_defaults() {
        let v = open_violation();
        assert_eq!(v.status, ViolationStatus::Open);
        assert_eq!(v.policy_id, "system");
        assert!(v.evidence.is_empty());
        assert!(v.resolved_at.is_none());
    }

    #[test]
    fn test_forward_transitions_allowed() {
        let mut v = open_violation();
        v.transition_status(ViolationStatus::Investigating).unwrap();
        v.transition_status(ViolationStatus::Remediating).unwrap();
        v.transition_status(ViolationStatus::Resolved).unwrap();
        assert!(v.resolved_at.is_some());
    }

    #[test]
    fn test_skipping_forward_allowed() {
        let mut v = open_violation();
        v.transition_status(ViolationStatus::Resolved).unwrap();
        assert_eq!(v.status, ViolationStatus::Resolved);
    }

    #[test]
    fn test_backward_transition_rejected() {
        let mut v = open_violation();
        v.transition_status(ViolationStatus::Remediating).unwrap();
        let err = v.transition_status(ViolationStatus::Open);
        assert!(matches!(
            err,
            Err(ViolationError::InvalidTransition { .. })
        ));
        assert_eq!(v.status, ViolationStatus::Remediating);
    }

    #[test]
    fn test_false_positive_from_any_state() {
        let mut v = open_violation();
        v.transition_status(ViolationStatus::Resolved).unwrap();
        v.transition_status(ViolationStatus::FalsePositive).unwrap();
        assert_eq!(v.status, ViolationStatus::FalsePositive);
    }

    #[test]
    fn test_no_transition_out_of_false_positive() {
        let mut v = open_violation();
        v.transition_status(ViolationStatus::FalsePositive).unwrap();
        assert!(v.transition_status(ViolationStatus::Resolved).is_err());
        assert!(v.transition_status(ViolationStatus::FalsePositive).is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"critical\""
        );
        let parsed: Severity = serde_json::from_str("\"info\"").unwrap();
        assert_eq!(parsed, Severity::Info);
    }

    #[test]
    fn test_asset_type_serialization() {
        assert_eq!(
            serde_json::to_string(&AssetType::CloudResource).unwrap(),
            "\"cloud_resource\""
        );
    }

    #[test]
    fn test_violation_serialization_roundtrip() {
        let v = open_violation()
            .with_policy("pol-7", "TLS baseline")
            .with_evidence(Evidence::fact_snapshot(
                "certificate snapshot",
                serde_json::json!({"days_until_expiry": 21}),
            ))
            .with_remediation(RemediationAction::pending_manual("Renew the certificate"));

        let json = serde_json::to_string(&v).unwrap();
        let parsed: Violation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, v.id);
        assert_eq!(parsed.policy_id, "pol-7");
        assert_eq!(parsed.evidence.len(), 1);
        assert_eq!(
            parsed.remediation_actions[0].status,
            RemediationStatus::Pending
        );
    }
}

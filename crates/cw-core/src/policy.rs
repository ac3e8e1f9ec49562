//! Compliance policy reference model.
//!
//! Policies are parsed and owned by an external collaborator; the core
//! consumes the list only to attach a best-effort policy linkage to
//! generated violations.

use serde::{Deserialize, Serialize};

/// Sentinel policy id used when no matching policy exists for a violation.
pub const SYSTEM_POLICY_ID: &str = "system";
/// Sentinel policy name paired with [`SYSTEM_POLICY_ID`].
pub const SYSTEM_POLICY_NAME: &str = "System";

/// A compliance policy as seen by the detection engine.
///
/// No schema validation is performed here; the shape mirrors what the policy
/// ingestion collaborator produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompliancePolicy {
    /// Unique identifier for the policy.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Compliance framework the policy belongs to (e.g., "SOC2", "TLS baseline").
    pub framework: String,
    /// Whether the policy is currently active.
    pub enabled: bool,
}

impl CompliancePolicy {
    /// Creates a new enabled policy.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        framework: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            framework: framework.into(),
            enabled: true,
        }
    }

    /// Sets the enabled status.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns true if the policy's framework or name contains the keyword
    /// (case-insensitive).
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.framework.to_lowercase().contains(&keyword)
            || self.name.to_lowercase().contains(&keyword)
    }
}

/// Finds the first enabled policy matching any of the given keywords.
///
/// Returns the sentinel (`"system"`, `"System"`) pair when nothing matches.
pub fn link_policy(policies: &[CompliancePolicy], keywords: &[&str]) -> (String, String) {
    for policy in policies.iter().filter(|p| p.enabled) {
        if keywords.iter().any(|k| policy.matches_keyword(k)) {
            return (policy.id.clone(), policy.name.clone());
        }
    }
    (SYSTEM_POLICY_ID.to_string(), SYSTEM_POLICY_NAME.to_string())
}

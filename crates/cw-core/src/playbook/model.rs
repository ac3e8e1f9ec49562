//! Playbook data structures.
//!
//! A playbook is a declarative, triggerable graph of response steps. Steps
//! carry typed configuration payloads and reference each other by id through
//! `on_success` / `on_failure` transitions; an absent reference makes the
//! transition terminal.

use crate::violation::{AssetType, Severity, Violation};
use chrono::{DateTime, Utc};
use cw_connectors::NotifyChannel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::incident::IncidentStatus;

/// Trigger families a playbook can react to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Fired for every detected violation.
    #[default]
    Violation,
}

/// The predicate deciding whether a playbook applies to a violation.
///
/// All configured parts are conjunctive; an empty set or absent field is
/// vacuously true.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlaybookTrigger {
    /// Trigger family.
    #[serde(default)]
    pub trigger_type: TriggerType,
    /// Severities that match; empty matches any.
    #[serde(default)]
    pub severities: Vec<Severity>,
    /// Asset types that match; empty matches any.
    #[serde(default)]
    pub asset_types: Vec<AssetType>,
    /// Exact policy id to match; absent matches any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
}

impl PlaybookTrigger {
    /// Creates a trigger that matches every violation.
    pub fn any_violation() -> Self {
        Self::default()
    }

    /// Restricts the trigger to the given severities.
    pub fn with_severities(mut self, severities: Vec<Severity>) -> Self {
        self.severities = severities;
        self
    }

    /// Restricts the trigger to the given asset types.
    pub fn with_asset_types(mut self, asset_types: Vec<AssetType>) -> Self {
        self.asset_types = asset_types;
        self
    }

    /// Restricts the trigger to an exact policy id.
    pub fn with_policy_id(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = Some(policy_id.into());
        self
    }

    /// Returns true if every configured predicate accepts the violation.
    pub fn matches(&self, violation: &Violation) -> bool {
        if !self.severities.is_empty() && !self.severities.contains(&violation.severity) {
            return false;
        }
        if !self.asset_types.is_empty() && !self.asset_types.contains(&violation.asset_type) {
            return false;
        }
        if let Some(policy_id) = &self.policy_id {
            if *policy_id != violation.policy_id {
                return false;
            }
        }
        true
    }
}

/// The fixed action vocabulary for action steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Create a new incident from the violation and bind it to the run.
    CreateIncident,
    /// Update the bound incident's status.
    UpdateStatus,
    /// Assign the bound incident.
    Assign,
    /// Raise the bound incident's priority.
    Escalate,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::CreateIncident => write!(f, "create_incident"),
            ActionKind::UpdateStatus => write!(f, "update_status"),
            ActionKind::Assign => write!(f, "assign"),
            ActionKind::Escalate => write!(f, "escalate"),
        }
    }
}

/// Configuration for an action step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionConfig {
    /// Which action to perform.
    pub action: ActionKind,
    /// Target status for `update_status`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IncidentStatus>,
    /// Assignee for `assign`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

/// Configuration for a notification step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    /// Channel to dispatch to.
    pub channel: NotifyChannel,
    /// Message template. Supports literal substitution of
    /// `{{violation_title}}`, `{{violation_description}}`, `{{severity}}`,
    /// and `{{incident_id}}`.
    pub template: String,
    /// Recipients for the channel.
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Configuration for a delay step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelayConfig {
    /// How long to suspend the run, in seconds.
    pub duration_secs: u64,
}

/// Configuration for a condition step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionConfig {
    /// Field to resolve: `acknowledged` or `severity`; anything else is
    /// undefined and never matches.
    pub field: String,
    /// Literal the resolved value must equal exactly (no type coercion).
    pub equals: serde_json::Value,
}

/// Configuration for a remediation step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemediationConfig {
    /// Script reference handed to the remediation runner.
    pub script: String,
    /// Parameters passed along with the reference.
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

/// Typed configuration payload for a playbook step.
///
/// Step kinds are a closed vocabulary: unknown tags are rejected when a
/// playbook is deserialized rather than silently succeeding at run time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
    /// Incident lifecycle action.
    Action(ActionConfig),
    /// Stakeholder notification.
    Notification(NotificationConfig),
    /// Timed suspension of the run.
    Delay(DelayConfig),
    /// Branch on a resolved field value.
    Condition(ConditionConfig),
    /// Dispatch a remediation script reference.
    Remediation(RemediationConfig),
}

/// A step within a playbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookStep {
    /// Identifier, unique within the playbook.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Typed configuration.
    pub config: StepConfig,
    /// Step to run when this one succeeds; absent ends the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<String>,
    /// Step to run when this one fails; absent ends the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<String>,
}

impl PlaybookStep {
    /// Creates a terminal step with the given configuration.
    pub fn new(id: impl Into<String>, name: impl Into<String>, config: StepConfig) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            config,
            on_success: None,
            on_failure: None,
        }
    }

    /// Sets the success transition.
    pub fn with_on_success(mut self, step_id: impl Into<String>) -> Self {
        self.on_success = Some(step_id.into());
        self
    }

    /// Sets the failure transition.
    pub fn with_on_failure(mut self, step_id: impl Into<String>) -> Self {
        self.on_failure = Some(step_id.into());
        self
    }
}

/// A declarative, triggerable graph of response steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    /// Unique identifier.
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// Optional description of what the playbook does.
    pub description: Option<String>,
    /// Predicate deciding when the playbook applies.
    pub trigger: PlaybookTrigger,
    /// Ordered steps; the first is the run's start state.
    pub steps: Vec<PlaybookStep>,
    /// Whether the playbook is currently enabled.
    pub enabled: bool,
    /// When the playbook last ran (success or failure).
    pub last_run: Option<DateTime<Utc>>,
    /// When the playbook was created.
    pub created_at: DateTime<Utc>,
    /// When the playbook was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Playbook {
    /// Creates a new enabled playbook with no steps.
    pub fn new(name: impl Into<String>, trigger: PlaybookTrigger) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            trigger,
            steps: Vec::new(),
            enabled: true,
            last_run: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a step.
    pub fn with_step(mut self, step: PlaybookStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Sets the steps.
    pub fn with_steps(mut self, steps: Vec<PlaybookStep>) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the enabled status.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Looks up a step by id.
    pub fn step(&self, step_id: &str) -> Option<&PlaybookStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Returns the run's start step, if any steps are declared.
    pub fn first_step(&self) -> Option<&PlaybookStep> {
        self.steps.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(severity: Severity, asset_type: AssetType) -> Violation {
        Violation::new(
            Uuid::new_v4(),
            asset_type,
            "203.0.113.9",
            severity,
            "Test violation",
            "A violation used by trigger tests",
        )
    }

    #[test]
    fn test_empty_trigger_matches_anything() {
        let trigger = PlaybookTrigger::any_violation();
        assert!(trigger.matches(&violation(Severity::Info, AssetType::Domain)));
        assert!(trigger.matches(&violation(Severity::Critical, AssetType::Ip)));
    }

    #[test]
    fn test_trigger_severity_membership() {
        let trigger = PlaybookTrigger::any_violation()
            .with_severities(vec![Severity::Critical, Severity::High]);
        assert!(trigger.matches(&violation(Severity::Critical, AssetType::Ip)));
        assert!(!trigger.matches(&violation(Severity::Medium, AssetType::Ip)));
    }

    #[test]
    fn test_trigger_is_conjunctive() {
        // severity={critical} AND asset_type={ip} must not match a critical
        // domain violation.
        let trigger = PlaybookTrigger::any_violation()
            .with_severities(vec![Severity::Critical])
            .with_asset_types(vec![AssetType::Ip]);

        assert!(!trigger.matches(&violation(Severity::Critical, AssetType::Domain)));
        assert!(trigger.matches(&violation(Severity::Critical, AssetType::Ip)));
    }

    #[test]
    fn test_trigger_policy_id_exact_match() {
        let trigger = PlaybookTrigger::any_violation().with_policy_id("pol-7");

        let mut v = violation(Severity::High, AssetType::Certificate);
        assert!(!trigger.matches(&v));

        v = v.with_policy("pol-7", "TLS baseline");
        assert!(trigger.matches(&v));
    }

    #[test]
    fn test_step_lookup() {
        let playbook = Playbook::new("test", PlaybookTrigger::any_violation())
            .with_step(PlaybookStep::new(
                "create",
                "Create incident",
                StepConfig::Action(ActionConfig {
                    action: ActionKind::CreateIncident,
                    status: None,
                    assignee: None,
                }),
            ))
            .with_step(PlaybookStep::new(
                "notify",
                "Notify SOC",
                StepConfig::Notification(NotificationConfig {
                    channel: NotifyChannel::Slack,
                    template: "{{violation_title}}".to_string(),
                    recipients: vec![],
                }),
            ));

        assert!(playbook.step("create").is_some());
        assert!(playbook.step("missing").is_none());
        assert_eq!(playbook.first_step().unwrap().id, "create");
    }

    #[test]
    fn test_playbook_defaults() {
        let playbook = Playbook::new("test", PlaybookTrigger::any_violation());
        assert!(playbook.enabled);
        assert!(playbook.last_run.is_none());
        assert!(playbook.first_step().is_none());
    }

    #[test]
    fn test_step_config_serialization() {
        let config = StepConfig::Action(ActionConfig {
            action: ActionKind::CreateIncident,
            status: None,
            assignee: None,
        });
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"type\":\"action\""));
        assert!(json.contains("\"action\":\"create_incident\""));

        let parsed: StepConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_step_type_rejected() {
        let json = r#"{"type":"teleport","destination":"nowhere"}"#;
        let parsed: Result<StepConfig, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unknown_action_kind_rejected() {
        let json = r#"{"type":"action","action":"self_destruct"}"#;
        let parsed: Result<StepConfig, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_playbook_serialization_roundtrip() {
        let playbook = Playbook::new(
            "critical-response",
            PlaybookTrigger::any_violation().with_severities(vec![Severity::Critical]),
        )
        .with_description("Escalates critical violations")
        .with_step(
            PlaybookStep::new(
                "wait",
                "Wait for acknowledgement",
                StepConfig::Delay(DelayConfig { duration_secs: 300 }),
            )
            .with_on_success("check"),
        )
        .with_step(PlaybookStep::new(
            "check",
            "Check acknowledgement",
            StepConfig::Condition(ConditionConfig {
                field: "acknowledged".to_string(),
                equals: serde_json::json!(true),
            }),
        ));

        let json = serde_json::to_string(&playbook).unwrap();
        let parsed: Playbook = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, playbook.id);
        assert_eq!(parsed.steps.len(), 2);
        assert_eq!(parsed.steps[0].on_success.as_deref(), Some("check"));
    }
}

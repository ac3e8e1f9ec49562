//! Declarative detection rules.
//!
//! Rules are registered at startup and individually toggleable. Each enabled
//! rule whose asset-type scope matches is evaluated against the asset's
//! serialized fact snapshot; a match raises a violation with the rule's
//! severity.

use crate::violation::{AssetType, Severity};
use serde::{Deserialize, Serialize};

/// Comparison operators for rule conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    /// Exact equality.
    Equals,
    /// String/array contains value.
    Contains,
    /// String matches regex pattern.
    Regex,
    /// Value is a member of the configured set.
    In,
    /// Value is not a member of the configured set.
    NotIn,
    /// Numeric greater-than.
    GreaterThan,
    /// Numeric less-than.
    LessThan,
}

/// A condition over a named field of the fact snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleCondition {
    /// Field to resolve, with dotted-path support for nested objects.
    pub field: String,
    /// Comparison operator.
    pub operator: RuleOperator,
    /// Expected value.
    pub value: serde_json::Value,
}

impl RuleCondition {
    /// Creates a new condition.
    pub fn new(field: impl Into<String>, operator: RuleOperator, value: serde_json::Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Evaluates the condition against a fact snapshot.
    ///
    /// An unresolvable field evaluates to false.
    pub fn evaluate(&self, facts: &serde_json::Value) -> bool {
        match resolve_path(facts, &self.field) {
            Some(actual) => compare(actual, self.operator, &self.value),
            None => false,
        }
    }
}

/// Resolves a dotted path within a JSON value.
fn resolve_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for part in path.split('.') {
        match current {
            serde_json::Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Compares an actual JSON value against an expected value using the operator.
fn compare(actual: &serde_json::Value, op: RuleOperator, expected: &serde_json::Value) -> bool {
    match op {
        RuleOperator::Equals => actual == expected,
        RuleOperator::Contains => match (actual, expected) {
            (serde_json::Value::String(haystack), serde_json::Value::String(needle)) => {
                haystack.contains(needle.as_str())
            }
            (serde_json::Value::Array(arr), _) => arr.contains(expected),
            _ => false,
        },
        RuleOperator::Regex => match (actual, expected) {
            (serde_json::Value::String(s), serde_json::Value::String(pattern)) => {
                regex::Regex::new(pattern)
                    .map(|re| re.is_match(s))
                    .unwrap_or(false)
            }
            _ => false,
        },
        RuleOperator::In => match expected {
            serde_json::Value::Array(arr) => arr.contains(actual),
            _ => false,
        },
        RuleOperator::NotIn => match expected {
            serde_json::Value::Array(arr) => !arr.contains(actual),
            _ => true,
        },
        RuleOperator::GreaterThan => compare_numeric(actual, expected, |a, b| a > b),
        RuleOperator::LessThan => compare_numeric(actual, expected, |a, b| a < b),
    }
}

/// Helper to compare two JSON values numerically, with a lexicographic
/// fallback for string pairs.
fn compare_numeric(
    a: &serde_json::Value,
    b: &serde_json::Value,
    cmp: fn(f64, f64) -> bool,
) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(a_num), Some(b_num)) => cmp(a_num, b_num),
        _ => match (a.as_str(), b.as_str()) {
            (Some(a_str), Some(b_str)) => {
                let ord = a_str.cmp(b_str);
                cmp(ord as i8 as f64, 0.0)
            }
            _ => false,
        },
    }
}

/// Extracts a numeric value from a JSON value.
fn as_f64(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse::<f64>().ok(),
        serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// A declarative detection rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRule {
    /// Unique identifier for the rule.
    pub id: String,
    /// Human-readable name, used as the violation title on a match.
    pub name: String,
    /// Optional description of what the rule detects.
    pub description: Option<String>,
    /// Severity of violations raised by this rule.
    pub severity: Severity,
    /// Asset family the rule applies to.
    pub asset_type: AssetType,
    /// Condition evaluated against the asset's fact snapshot.
    pub condition: RuleCondition,
    /// Whether the rule is currently active.
    pub enabled: bool,
}

impl DetectionRule {
    /// Creates a new enabled rule.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        severity: Severity,
        asset_type: AssetType,
        condition: RuleCondition,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            severity,
            asset_type,
            condition,
            enabled: true,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the enabled status.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns true if this rule matches the given fact snapshot.
    pub fn matches(&self, facts: &serde_json::Value) -> bool {
        self.enabled && self.condition.evaluate(facts)
    }
}

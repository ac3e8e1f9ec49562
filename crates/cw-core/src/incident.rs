//! Incident data models and lifecycle management.
//!
//! Incidents are created from violations by the playbook executor. The
//! [`IncidentManager`] exclusively owns incident state once created; the
//! executor holds only a transient id binding during a run and routes every
//! mutation through the manager's API so the timeline stays consistent.

use crate::violation::{Severity, Violation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Errors raised by incident lifecycle handling.
#[derive(Error, Debug)]
pub enum IncidentError {
    #[error("Incident not found: {0}")]
    NotFound(Uuid),
}

/// Status of an incident in its response lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Newly created, response not yet started.
    Open,
    /// Being worked by a responder or automation.
    Investigating,
    /// Impact contained, cleanup pending.
    Mitigated,
    /// Fully resolved and closed.
    Closed,
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::Open => write!(f, "Open"),
            IncidentStatus::Investigating => write!(f, "Investigating"),
            IncidentStatus::Mitigated => write!(f, "Mitigated"),
            IncidentStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// Response priority, derived from the originating violation's severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Immediate response.
    P1,
    /// Response within hours.
    P2,
    /// Response within days.
    P3,
    /// Best-effort.
    P4,
}

impl Priority {
    /// Maps a violation severity to a response priority.
    pub fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Priority::P1,
            Severity::High => Priority::P2,
            Severity::Medium => Priority::P3,
            Severity::Low | Severity::Info => Priority::P4,
        }
    }

    /// Returns the next-higher priority, saturating at P1.
    pub fn raised(&self) -> Self {
        match self {
            Priority::P1 | Priority::P2 => Priority::P1,
            Priority::P3 => Priority::P2,
            Priority::P4 => Priority::P3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::P1 => write!(f, "P1"),
            Priority::P2 => write!(f, "P2"),
            Priority::P3 => write!(f, "P3"),
            Priority::P4 => write!(f, "P4"),
        }
    }
}

/// Types of events recorded on an incident timeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentEventType {
    /// Incident was created.
    Created,
    /// Fields were updated.
    Updated,
    /// Free-text comment.
    Comment,
    /// Status changed.
    StatusChange,
    /// Assignee changed.
    Assignment,
    /// Priority was escalated.
    Escalation,
}

/// An entry on an incident's append-only timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentEvent {
    /// Unique event id.
    pub id: Uuid,
    /// Kind of event.
    pub event_type: IncidentEventType,
    /// Who caused the event (user or system component).
    pub actor: String,
    /// What happened.
    pub description: String,
    /// Optional structured payload.
    pub data: Option<serde_json::Value>,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
}

impl IncidentEvent {
    /// Creates a new timeline event.
    pub fn new(
        event_type: IncidentEventType,
        actor: impl Into<String>,
        description: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            actor: actor.into(),
            description: description.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// A tracked response record created from one or more violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Unique identifier.
    pub id: Uuid,
    /// Short title, inherited from the originating violation.
    pub title: String,
    /// Longer description, inherited from the originating violation.
    pub description: String,
    /// Severity, inherited from the originating violation.
    pub severity: Severity,
    /// Lifecycle status.
    pub status: IncidentStatus,
    /// Response priority derived from severity.
    pub priority: Priority,
    /// Current assignee, if any.
    pub assignee: Option<String>,
    /// Violations this incident tracks.
    pub violation_ids: Vec<Uuid>,
    /// Append-only timeline of events.
    pub timeline: Vec<IncidentEvent>,
    /// When the incident was created.
    pub created_at: DateTime<Utc>,
    /// When the incident was last mutated.
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied to an incident via [`IncidentManager::update_incident`].
#[derive(Debug, Clone, Default)]
pub struct IncidentUpdate {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<IncidentStatus>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New assignee.
    pub assignee: Option<String>,
}

/// Owns incident state and enforces the timeline mutation discipline.
pub struct IncidentManager {
    incidents: Arc<RwLock<HashMap<Uuid, Incident>>>,
    /// Actor recorded on events authored by the manager itself.
    actor: String,
}

impl Default for IncidentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IncidentManager {
    /// Creates a manager whose own events are attributed to "system".
    pub fn new() -> Self {
        Self::with_actor("system")
    }

    /// Creates a manager with a custom actor for manager-authored events.
    pub fn with_actor(actor: impl Into<String>) -> Self {
        Self {
            incidents: Arc::new(RwLock::new(HashMap::new())),
            actor: actor.into(),
        }
    }

    /// Creates a new incident from a violation.
    ///
    /// Title, description, and severity are inherited; priority is derived
    /// from severity; the timeline is seeded with a single `created` event.
    pub async fn create_from_violation(&self, violation: &Violation) -> Incident {
        let now = Utc::now();
        let incident = Incident {
            id: Uuid::new_v4(),
            title: violation.title.clone(),
            description: violation.description.clone(),
            severity: violation.severity,
            status: IncidentStatus::Open,
            priority: Priority::from_severity(violation.severity),
            assignee: None,
            violation_ids: vec![violation.id],
            timeline: vec![IncidentEvent::new(
                IncidentEventType::Created,
                self.actor.clone(),
                format!("Incident created from violation {}", violation.id),
                None,
            )],
            created_at: now,
            updated_at: now,
        };

        info!(
            incident_id = %incident.id,
            violation_id = %violation.id,
            priority = %incident.priority,
            "Incident created"
        );

        self.incidents
            .write()
            .await
            .insert(incident.id, incident.clone());
        incident
    }

    /// Appends a timeline event and refreshes `updated_at`.
    ///
    /// This is the only sanctioned path for timeline mutation.
    pub async fn add_event(
        &self,
        incident_id: Uuid,
        event_type: IncidentEventType,
        description: impl Into<String>,
        actor: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Result<(), IncidentError> {
        let mut incidents = self.incidents.write().await;
        let incident = incidents
            .get_mut(&incident_id)
            .ok_or(IncidentError::NotFound(incident_id))?;

        incident
            .timeline
            .push(IncidentEvent::new(event_type, actor, description, data));
        incident.updated_at = Utc::now();
        debug!(incident_id = %incident_id, event_type = ?event_type, "Timeline event appended");
        Ok(())
    }

    /// Applies a shallow field merge and refreshes `updated_at`.
    ///
    /// Does NOT append a timeline event; callers needing an audit trail must
    /// call [`Self::add_event`] explicitly. Returns the updated incident, or
    /// `None` if the id is unknown.
    pub async fn update_incident(
        &self,
        incident_id: Uuid,
        update: IncidentUpdate,
    ) -> Option<Incident> {
        let mut incidents = self.incidents.write().await;
        let incident = incidents.get_mut(&incident_id)?;

        if let Some(title) = update.title {
            incident.title = title;
        }
        if let Some(description) = update.description {
            incident.description = description;
        }
        if let Some(status) = update.status {
            incident.status = status;
        }
        if let Some(priority) = update.priority {
            incident.priority = priority;
        }
        if let Some(assignee) = update.assignee {
            incident.assignee = Some(assignee);
        }
        incident.updated_at = Utc::now();
        Some(incident.clone())
    }

    /// Adds a violation reference to an existing incident.
    pub async fn link_violation(
        &self,
        incident_id: Uuid,
        violation_id: Uuid,
    ) -> Result<(), IncidentError> {
        let mut incidents = self.incidents.write().await;
        let incident = incidents
            .get_mut(&incident_id)
            .ok_or(IncidentError::NotFound(incident_id))?;
        if !incident.violation_ids.contains(&violation_id) {
            incident.violation_ids.push(violation_id);
            incident.updated_at = Utc::now();
        }
        Ok(())
    }

    /// Looks up an incident by id.
    pub async fn get_incident(&self, incident_id: Uuid) -> Option<Incident> {
        self.incidents.read().await.get(&incident_id).cloned()
    }

    /// Returns all incidents.
    pub async fn list_incidents(&self) -> Vec<Incident> {
        self.incidents.read().await.values().cloned().collect()
    }
}

//! Playbook step executor.
//!
//! The executor walks a playbook's step graph for a single violation:
//! starting at the first declared step, it runs each step's typed handler
//! and follows the `on_success` / `on_failure` transition for the handler's
//! outcome until a transition is absent. An unresolved step-id reference
//! terminates the run rather than erroring; a per-run step budget bounds
//! cyclic graphs.
//!
//! Handler outcomes are three-valued: `Ok(true)` / `Ok(false)` route the
//! transition, `Err` aborts the whole run (cancellation, budget exhaustion,
//! or a lost incident binding).

use crate::incident::{IncidentEventType, IncidentManager, IncidentUpdate};
use crate::playbook::model::{
    ActionConfig, ActionKind, ConditionConfig, DelayConfig, NotificationConfig, Playbook,
    PlaybookStep, RemediationConfig, StepConfig,
};
use crate::violation::Violation;
use cw_connectors::{Notifier, RemediationRunner};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Default upper bound on steps executed in one run.
pub const DEFAULT_STEP_BUDGET: usize = 32;

/// Errors that abort a playbook run.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Run cancelled while executing step {step_id}")]
    Cancelled { step_id: String },

    #[error("Step budget of {limit} exceeded; step graph may be cyclic")]
    StepBudgetExceeded { limit: usize },

    #[error("Incident error: {0}")]
    Incident(#[from] crate::incident::IncidentError),
}

/// Executes one playbook run against a violation.
pub struct StepExecutor<'a> {
    playbook: &'a Playbook,
    violation: &'a Violation,
    incidents: &'a IncidentManager,
    notifier: &'a dyn Notifier,
    remediation: &'a dyn RemediationRunner,
    cancel: CancellationToken,
    actor: String,
    step_budget: usize,
}

impl<'a> StepExecutor<'a> {
    /// Creates an executor for one playbook run.
    pub fn new(
        playbook: &'a Playbook,
        violation: &'a Violation,
        incidents: &'a IncidentManager,
        notifier: &'a dyn Notifier,
        remediation: &'a dyn RemediationRunner,
    ) -> Self {
        Self {
            playbook,
            violation,
            incidents,
            notifier,
            remediation,
            cancel: CancellationToken::new(),
            actor: "automation".to_string(),
            step_budget: DEFAULT_STEP_BUDGET,
        }
    }

    /// Sets the cancellation token the run's delay steps race against.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets the actor recorded on incident events authored by this run.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Sets the per-run step budget.
    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = step_budget;
        self
    }

    /// Walks the step graph to a terminal state.
    ///
    /// Returns the id of the incident bound by the run, if a
    /// `create_incident` step executed.
    #[instrument(
        skip(self),
        fields(playbook = %self.playbook.name, violation_id = %self.violation.id)
    )]
    pub async fn run(&self) -> Result<Option<Uuid>, ExecutorError> {
        let mut bound: Option<Uuid> = None;
        let mut current = self.playbook.first_step();
        let mut executed = 0usize;

        while let Some(step) = current {
            if executed >= self.step_budget {
                return Err(ExecutorError::StepBudgetExceeded {
                    limit: self.step_budget,
                });
            }
            executed += 1;

            let succeeded = self.execute_step(step, &mut bound).await?;
            debug!(step_id = %step.id, succeeded, "Step executed");

            let next_id = if succeeded {
                step.on_success.as_deref()
            } else {
                step.on_failure.as_deref()
            };

            current = match next_id {
                None => None,
                Some(id) => match self.playbook.step(id) {
                    Some(next) => Some(next),
                    None => {
                        warn!(
                            step_id = %step.id,
                            missing = id,
                            "Transition references unknown step; terminating run"
                        );
                        None
                    }
                },
            };
        }

        info!(steps = executed, incident = ?bound, "Playbook run complete");
        Ok(bound)
    }

    /// Dispatches one step to its typed handler.
    async fn execute_step(
        &self,
        step: &PlaybookStep,
        bound: &mut Option<Uuid>,
    ) -> Result<bool, ExecutorError> {
        match &step.config {
            StepConfig::Action(config) => self.handle_action(config, bound).await,
            StepConfig::Notification(config) => self.handle_notification(config, *bound).await,
            StepConfig::Delay(config) => self.handle_delay(config, step).await,
            StepConfig::Condition(config) => self.handle_condition(config, *bound).await,
            StepConfig::Remediation(config) => self.handle_remediation(config).await,
        }
    }

    async fn handle_action(
        &self,
        config: &ActionConfig,
        bound: &mut Option<Uuid>,
    ) -> Result<bool, ExecutorError> {
        match config.action {
            ActionKind::CreateIncident => {
                let incident = self.incidents.create_from_violation(self.violation).await;
                if let Some(previous) = bound.replace(incident.id) {
                    warn!(
                        previous = %previous,
                        replacement = %incident.id,
                        "Second create_incident in one run; rebinding incident reference"
                    );
                }
                Ok(true)
            }
            ActionKind::UpdateStatus => {
                let Some(incident_id) = *bound else {
                    warn!("update_status step with no bound incident");
                    return Ok(false);
                };
                let Some(status) = config.status else {
                    warn!("update_status step missing target status");
                    return Ok(false);
                };
                if self
                    .incidents
                    .update_incident(
                        incident_id,
                        IncidentUpdate {
                            status: Some(status),
                            ..Default::default()
                        },
                    )
                    .await
                    .is_none()
                {
                    warn!(incident_id = %incident_id, "Bound incident vanished");
                    return Ok(false);
                }
                self.incidents
                    .add_event(
                        incident_id,
                        IncidentEventType::StatusChange,
                        format!("Status changed to {}", status),
                        &self.actor,
                        Some(serde_json::json!({ "status": status })),
                    )
                    .await?;
                Ok(true)
            }
            ActionKind::Assign => {
                let Some(incident_id) = *bound else {
                    warn!("assign step with no bound incident");
                    return Ok(false);
                };
                let Some(assignee) = config.assignee.clone() else {
                    warn!("assign step missing assignee");
                    return Ok(false);
                };
                if self
                    .incidents
                    .update_incident(
                        incident_id,
                        IncidentUpdate {
                            assignee: Some(assignee.clone()),
                            ..Default::default()
                        },
                    )
                    .await
                    .is_none()
                {
                    warn!(incident_id = %incident_id, "Bound incident vanished");
                    return Ok(false);
                }
                self.incidents
                    .add_event(
                        incident_id,
                        IncidentEventType::Assignment,
                        format!("Assigned to {}", assignee),
                        &self.actor,
                        Some(serde_json::json!({ "assignee": assignee })),
                    )
                    .await?;
                Ok(true)
            }
            ActionKind::Escalate => {
                let Some(incident_id) = *bound else {
                    warn!("escalate step with no bound incident");
                    return Ok(false);
                };
                let Some(incident) = self.incidents.get_incident(incident_id).await else {
                    warn!(incident_id = %incident_id, "Bound incident vanished");
                    return Ok(false);
                };
                let raised = incident.priority.raised();
                if self
                    .incidents
                    .update_incident(
                        incident_id,
                        IncidentUpdate {
                            priority: Some(raised),
                            ..Default::default()
                        },
                    )
                    .await
                    .is_none()
                {
                    warn!(incident_id = %incident_id, "Bound incident vanished");
                    return Ok(false);
                }
                self.incidents
                    .add_event(
                        incident_id,
                        IncidentEventType::Escalation,
                        format!("Priority escalated from {} to {}", incident.priority, raised),
                        &self.actor,
                        Some(serde_json::json!({
                            "from": incident.priority,
                            "to": raised,
                        })),
                    )
                    .await?;
                Ok(true)
            }
        }
    }

    async fn handle_notification(
        &self,
        config: &NotificationConfig,
        bound: Option<Uuid>,
    ) -> Result<bool, ExecutorError> {
        let message = render_template(&config.template, self.violation, bound);

        // Fire-and-forget: the step succeeds once the message is constructed.
        if let Err(e) = self
            .notifier
            .send(config.channel, &message, &config.recipients)
            .await
        {
            warn!(channel = %config.channel, error = %e, "Notification dispatch failed");
        }
        Ok(true)
    }

    async fn handle_delay(
        &self,
        config: &DelayConfig,
        step: &PlaybookStep,
    ) -> Result<bool, ExecutorError> {
        debug!(duration_secs = config.duration_secs, "Suspending run");
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ExecutorError::Cancelled {
                step_id: step.id.clone(),
            }),
            _ = tokio::time::sleep(Duration::from_secs(config.duration_secs)) => Ok(true),
        }
    }

    async fn handle_condition(
        &self,
        config: &ConditionConfig,
        bound: Option<Uuid>,
    ) -> Result<bool, ExecutorError> {
        let resolved = match config.field.as_str() {
            "acknowledged" => {
                let acknowledged = match bound {
                    Some(incident_id) => self
                        .incidents
                        .get_incident(incident_id)
                        .await
                        .map(|i| i.assignee.is_some())
                        .unwrap_or(false),
                    None => false,
                };
                Some(serde_json::json!(acknowledged))
            }
            "severity" => serde_json::to_value(self.violation.severity).ok(),
            _ => None,
        };

        Ok(resolved.as_ref() == Some(&config.equals))
    }

    async fn handle_remediation(&self, config: &RemediationConfig) -> Result<bool, ExecutorError> {
        info!(script = %config.script, "Dispatching remediation script reference");
        if let Err(e) = self
            .remediation
            .run(&config.script, &config.parameters)
            .await
        {
            warn!(script = %config.script, error = %e, "Remediation dispatch failed");
        }
        Ok(true)
    }
}

/// Renders a notification template by literal placeholder substitution.
fn render_template(template: &str, violation: &Violation, incident_id: Option<Uuid>) -> String {
    let incident_ref = incident_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    template
        .replace("{{violation_title}}", &violation.title)
        .replace("{{violation_description}}", &violation.description)
        .replace("{{severity}}", &violation.severity.to_string())
        .replace("{{incident_id}}", &incident_ref)
}

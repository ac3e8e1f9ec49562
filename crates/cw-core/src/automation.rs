//! Automation engine: the orchestration entry point.
//!
//! The engine owns the playbook registry and the execution ledger, and wires
//! the step executor to the incident lifecycle manager and the collaborator
//! seams. Playbooks within one `execute_playbooks` call run strictly
//! sequentially in registration order; a failure in one run is isolated at
//! the playbook boundary and never aborts its siblings.

use crate::incident::{Incident, IncidentManager};
use crate::playbook::executor::{ExecutorError, StepExecutor};
use crate::playbook::model::Playbook;
use crate::violation::Violation;
use anyhow::Context;
use chrono::Utc;
use cw_connectors::{Notifier, RemediationRunner};
use cw_observability::{ExecutionLedger, ExecutionOutcome};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Errors raised by the automation engine's management API.
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Playbook not found: {0}")]
    PlaybookNotFound(Uuid),
}

/// Configuration for the automation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Actor recorded on incident events authored by the engine.
    #[serde(default = "default_actor")]
    pub actor: String,

    /// Upper bound on steps executed in a single playbook run.
    #[serde(default = "default_step_budget")]
    pub max_steps_per_run: usize,

    /// Maximum entries retained by the execution ledger.
    #[serde(default = "default_ledger_capacity")]
    pub ledger_capacity: usize,
}

fn default_actor() -> String {
    "automation".to_string()
}

fn default_step_budget() -> usize {
    crate::playbook::executor::DEFAULT_STEP_BUDGET
}

fn default_ledger_capacity() -> usize {
    1024
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            actor: default_actor(),
            max_steps_per_run: default_step_budget(),
            ledger_capacity: default_ledger_capacity(),
        }
    }
}

impl AutomationConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

/// Correlates violations with playbooks and drives their execution.
pub struct AutomationEngine {
    config: AutomationConfig,
    /// Registered playbooks, in registration order.
    playbooks: Arc<RwLock<Vec<Playbook>>>,
    incidents: Arc<IncidentManager>,
    ledger: Arc<ExecutionLedger>,
    notifier: Arc<dyn Notifier>,
    remediation: Arc<dyn RemediationRunner>,
}

impl AutomationEngine {
    /// Creates an engine with default configuration.
    pub fn new(notifier: Arc<dyn Notifier>, remediation: Arc<dyn RemediationRunner>) -> Self {
        Self::with_config(AutomationConfig::default(), notifier, remediation)
    }

    /// Creates an engine with the given configuration.
    pub fn with_config(
        config: AutomationConfig,
        notifier: Arc<dyn Notifier>,
        remediation: Arc<dyn RemediationRunner>,
    ) -> Self {
        let incidents = Arc::new(IncidentManager::with_actor(config.actor.clone()));
        let ledger = Arc::new(ExecutionLedger::new(config.ledger_capacity));
        Self {
            config,
            playbooks: Arc::new(RwLock::new(Vec::new())),
            incidents,
            ledger,
            notifier,
            remediation,
        }
    }

    /// The incident lifecycle manager owned by this engine.
    pub fn incidents(&self) -> Arc<IncidentManager> {
        Arc::clone(&self.incidents)
    }

    /// The execution ledger owned by this engine.
    pub fn ledger(&self) -> Arc<ExecutionLedger> {
        Arc::clone(&self.ledger)
    }

    /// Registers a playbook. Returns its id.
    pub async fn add_playbook(&self, playbook: Playbook) -> Uuid {
        let id = playbook.id;
        info!(playbook_id = %id, name = %playbook.name, "Playbook registered");
        self.playbooks.write().await.push(playbook);
        id
    }

    /// Looks up a playbook by id.
    pub async fn get_playbook(&self, id: Uuid) -> Option<Playbook> {
        self.playbooks
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    /// Returns all playbooks in registration order.
    pub async fn list_playbooks(&self) -> Vec<Playbook> {
        self.playbooks.read().await.clone()
    }

    /// Enables a playbook by id.
    pub async fn enable_playbook(&self, id: Uuid) -> Result<(), AutomationError> {
        self.set_playbook_enabled(id, true).await
    }

    /// Disables a playbook by id.
    pub async fn disable_playbook(&self, id: Uuid) -> Result<(), AutomationError> {
        self.set_playbook_enabled(id, false).await
    }

    async fn set_playbook_enabled(&self, id: Uuid, enabled: bool) -> Result<(), AutomationError> {
        let mut playbooks = self.playbooks.write().await;
        let playbook = playbooks
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(AutomationError::PlaybookNotFound(id))?;
        playbook.enabled = enabled;
        playbook.updated_at = Utc::now();
        Ok(())
    }

    /// Removes a playbook by id.
    pub async fn delete_playbook(&self, id: Uuid) -> Result<(), AutomationError> {
        let mut playbooks = self.playbooks.write().await;
        let position = playbooks
            .iter()
            .position(|p| p.id == id)
            .ok_or(AutomationError::PlaybookNotFound(id))?;
        playbooks.remove(position);
        Ok(())
    }

    /// Executes every enabled, matching playbook for the violation.
    ///
    /// Runs sequentially in registration order. Each run's failure is
    /// isolated: it is logged, recorded as a `failure` ledger entry, and the
    /// remaining playbooks still run. Returns the incidents bound by the
    /// runs, in execution order.
    pub async fn execute_playbooks(&self, violation: &Violation) -> Vec<Incident> {
        self.execute_playbooks_with_cancel(violation, CancellationToken::new())
            .await
    }

    /// Like [`Self::execute_playbooks`], but delay steps race against the
    /// given token so a supervisor can abort the scan without waiting out
    /// pending delays.
    #[instrument(skip(self, violation, cancel), fields(violation_id = %violation.id))]
    pub async fn execute_playbooks_with_cancel(
        &self,
        violation: &Violation,
        cancel: CancellationToken,
    ) -> Vec<Incident> {
        let matched: Vec<Playbook> = self
            .playbooks
            .read()
            .await
            .iter()
            .filter(|p| p.enabled && p.trigger.matches(violation))
            .cloned()
            .collect();

        info!(count = matched.len(), "Playbooks triggered");

        let mut created = Vec::new();

        for playbook in &matched {
            let executor = StepExecutor::new(
                playbook,
                violation,
                &self.incidents,
                self.notifier.as_ref(),
                self.remediation.as_ref(),
            )
            .with_actor(self.config.actor.clone())
            .with_step_budget(self.config.max_steps_per_run)
            .with_cancellation(cancel.clone());

            let result = executor.run().await;
            self.stamp_last_run(playbook.id).await;

            match result {
                Ok(bound) => {
                    self.ledger
                        .record(playbook.id, ExecutionOutcome::Success)
                        .await;
                    if let Some(incident_id) = bound {
                        if let Some(incident) = self.incidents.get_incident(incident_id).await {
                            created.push(incident);
                        }
                    }
                }
                Err(e) => {
                    error!(
                        playbook_id = %playbook.id,
                        name = %playbook.name,
                        error = %e,
                        "Playbook run failed"
                    );
                    self.ledger
                        .record(playbook.id, ExecutionOutcome::Failure)
                        .await;

                    // A cancelled scan stops here; remaining playbooks would
                    // only observe the same cancelled token.
                    if matches!(e, ExecutorError::Cancelled { .. }) {
                        warn!("Scan cancelled; skipping remaining playbooks");
                        break;
                    }
                }
            }
        }

        created
    }

    async fn stamp_last_run(&self, playbook_id: Uuid) {
        let mut playbooks = self.playbooks.write().await;
        if let Some(playbook) = playbooks.iter_mut().find(|p| p.id == playbook_id) {
            playbook.last_run = Some(Utc::now());
        }
    }
}

//! Execution ledger for Compliance Warden.
//!
//! The ledger is an append-only record of playbook run outcomes, kept in a
//! bounded in-memory window for observability surfaces to read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Outcome of a single playbook run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The run reached a terminal state without an uncaught fault.
    Success,
    /// The run was aborted by an uncaught fault or cancellation.
    Failure,
}

impl std::fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionOutcome::Success => write!(f, "success"),
            ExecutionOutcome::Failure => write!(f, "failure"),
        }
    }
}

/// A single entry in the execution ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique entry ID.
    pub id: Uuid,
    /// The playbook that was executed.
    pub playbook_id: Uuid,
    /// When the run finished.
    pub executed_at: DateTime<Utc>,
    /// Outcome of the run.
    pub outcome: ExecutionOutcome,
}

/// Append-only ledger of playbook run outcomes.
///
/// Entries past the configured capacity are evicted oldest-first.
pub struct ExecutionLedger {
    entries: Arc<RwLock<VecDeque<ExecutionRecord>>>,
    capacity: usize,
    log_to_tracing: bool,
}

impl ExecutionLedger {
    /// Creates a new ledger holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            log_to_tracing: true,
        }
    }

    /// Creates a ledger that does not mirror entries to tracing.
    pub fn without_tracing(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            log_to_tracing: false,
        }
    }

    /// Appends a run outcome for the given playbook.
    pub async fn record(&self, playbook_id: Uuid, outcome: ExecutionOutcome) {
        let entry = ExecutionRecord {
            id: Uuid::new_v4(),
            playbook_id,
            executed_at: Utc::now(),
            outcome,
        };

        if self.log_to_tracing {
            info!(
                playbook_id = %entry.playbook_id,
                outcome = %entry.outcome,
                "Playbook run recorded"
            );
        }

        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns the most recent `n` entries in chronological order.
    pub async fn recent(&self, n: usize) -> Vec<ExecutionRecord> {
        let entries = self.entries.read().await;
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Returns all entries for a specific playbook, oldest first.
    pub async fn for_playbook(&self, playbook_id: Uuid) -> Vec<ExecutionRecord> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.playbook_id == playbook_id)
            .cloned()
            .collect()
    }

    /// Returns the number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if the ledger holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

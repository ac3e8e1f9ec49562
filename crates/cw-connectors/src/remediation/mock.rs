//! Recording mock remediation runner for tests.

use crate::traits::{RemediationError, RemediationRunner};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A remediation dispatch captured by [`MockRemediationRunner`].
#[derive(Debug, Clone)]
pub struct ScriptInvocation {
    /// Script reference that was dispatched.
    pub script: String,
    /// Parameters passed along with the reference.
    pub parameters: HashMap<String, serde_json::Value>,
    /// When the dispatch was recorded.
    pub dispatched_at: DateTime<Utc>,
}

/// A remediation runner that records every dispatch instead of running it.
#[derive(Default)]
pub struct MockRemediationRunner {
    invocations: Arc<RwLock<Vec<ScriptInvocation>>>,
}

impl MockRemediationRunner {
    /// Creates a new recording runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all dispatches recorded so far.
    pub async fn invocations(&self) -> Vec<ScriptInvocation> {
        self.invocations.read().await.clone()
    }

    /// Returns the number of recorded dispatches.
    pub async fn invocation_count(&self) -> usize {
        self.invocations.read().await.len()
    }
}

#[async_trait]
impl RemediationRunner for MockRemediationRunner {
    async fn run(
        &self,
        script: &str,
        parameters: &HashMap<String, serde_json::Value>,
    ) -> Result<(), RemediationError> {
        self.invocations.write().await.push(ScriptInvocation {
            script: script.to_string(),
            parameters: parameters.clone(),
            dispatched_at: Utc::now(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

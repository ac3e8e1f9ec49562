//! Playbook model, trigger matching, and step execution.

pub mod executor;
pub mod model;

pub use executor::{ExecutorError, StepExecutor};
pub use model::{
    ActionConfig, ActionKind, ConditionConfig, DelayConfig, NotificationConfig, Playbook,
    PlaybookStep, PlaybookTrigger, RemediationConfig, StepConfig, TriggerType,
};

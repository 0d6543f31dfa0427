//! Execution context and progress types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::step::WorkflowDefinition;

/// Data extracted over the course of one run, keyed by step id or variable
/// name depending on the producing step kind.
pub type ExtractedData = Map<String, Value>;

/// Per-run execution context. One context per run; never shared across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub execution_id: String,
    pub workflow_id: String,
    pub user_id: String,
    pub definition: WorkflowDefinition,

    /// Variable bindings, shared across the steps of this run. Mutable:
    /// `set_variable` and `extract_to_variable` write here, and `loop`
    /// exposes transient bindings for the duration of its own execution.
    #[serde(default)]
    pub variables: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(
        execution_id: impl Into<String>,
        workflow_id: impl Into<String>,
        user_id: impl Into<String>,
        definition: WorkflowDefinition,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            workflow_id: workflow_id.into(),
            user_id: user_id.into(),
            definition,
            variables: Map::new(),
        }
    }

    /// Seed initial variable bindings.
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }
}

/// Progress snapshot reported before each step dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionProgress {
    /// 1-based index of the step about to execute.
    pub current_step: usize,
    pub total_steps: usize,
    /// Rounded percentage, reaching exactly 100 on the last step.
    pub percentage: u8,
    /// Present from the second step onward, once there is a sample to
    /// extrapolate from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_remaining_ms: Option<u64>,
}

/// Log severity carried on `on_log` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_serialization() {
        let progress = ExecutionProgress {
            current_step: 2,
            total_steps: 4,
            percentage: 50,
            estimated_remaining_ms: Some(1200),
        };
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["percentage"], 50);
        assert_eq!(json["estimated_remaining_ms"], 1200);
    }

    #[test]
    fn test_progress_eta_omitted_when_absent() {
        let progress = ExecutionProgress {
            current_step: 1,
            total_steps: 4,
            percentage: 25,
            estimated_remaining_ms: None,
        };
        let json = serde_json::to_value(&progress).unwrap();
        assert!(json.get("estimated_remaining_ms").is_none());
    }

    #[test]
    fn test_log_level_wire_format() {
        assert_eq!(serde_json::to_value(LogLevel::Warn).unwrap(), "warn");
    }
}

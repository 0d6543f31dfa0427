//! Step execution result types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of a single step execution.
///
/// Operation handlers return this for expected failures (missing required
/// config fields, selector not found, navigation timeouts) instead of
/// propagating an error; the engine decides whether the run aborts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepResult {
    /// Whether the step succeeded.
    pub success: bool,

    /// Structured output (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error message if the step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Screenshot bytes captured on failure, when enabled. Kept out of the
    /// wire format; callers forward the handle instead of the buffer.
    #[serde(skip)]
    pub screenshot: Option<Bytes>,
}

impl StepResult {
    /// Create a successful result without data.
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            screenshot: None,
        }
    }

    /// Create a successful result with structured output.
    pub fn with_data(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            screenshot: None,
        }
    }

    /// Create a failed result.
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            screenshot: None,
        }
    }

    /// Attach a screenshot to the result.
    pub fn with_screenshot(mut self, screenshot: Bytes) -> Self {
        self.screenshot = Some(screenshot);
        self
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;

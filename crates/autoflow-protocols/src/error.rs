//! Error taxonomy for sessions and runs.

use bytes::Bytes;
use thiserror::Error;

/// Browser session errors surfaced by capability providers.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Browser not found. Please install Google Chrome or Chromium.")]
    BrowserNotFound,

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned from the top-level execute call.
///
/// Step-level validation and capability failures do not appear here
/// directly; they become failed step results first, and the single failure
/// that aborts the run surfaces as [`EngineError::StepFailed`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Could not obtain a browser session. Fatal for the run; the invoking
    /// worker marks the execution failed.
    #[error("Failed to acquire browser session: {0}")]
    Acquisition(String),

    /// A step failed and the remaining sequence was aborted.
    #[error("Step '{step_id}' failed: {message}")]
    StepFailed {
        step_id: String,
        message: String,
        /// Best-effort full-page screenshot captured at the point of
        /// failure, when `screenshot_on_error` is enabled.
        screenshot: Option<Bytes>,
    },

    /// The engine is draining; no new runs are admitted.
    #[error("Engine is shutting down")]
    ShuttingDown,
}

impl EngineError {
    /// The id of the failing step, when the error is step-scoped.
    pub fn step_id(&self) -> Option<&str> {
        match self {
            Self::StepFailed { step_id, .. } => Some(step_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failed_display() {
        let err = EngineError::StepFailed {
            step_id: "step-3".to_string(),
            message: "URL is required for navigate step".to_string(),
            screenshot: None,
        };
        assert!(err.to_string().contains("step-3"));
        assert!(err.to_string().contains("URL is required"));
        assert_eq!(err.step_id(), Some("step-3"));
    }

    #[test]
    fn test_acquisition_display() {
        let err = EngineError::Acquisition("Connection failed: refused".to_string());
        assert!(err.to_string().contains("acquire browser session"));
        assert_eq!(err.step_id(), None);
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::ElementNotFound("#missing".to_string());
        assert!(err.to_string().contains("#missing"));
    }
}

//! Engine configuration.

use serde::{Deserialize, Serialize};

use autoflow_protocols::SessionConfig;

/// An inclusive millisecond range for randomized delays.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }
}

/// Immutable per-engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Run locally launched browsers headless.
    pub headless: bool,

    /// Per-operation timeout bound to each run's page.
    pub timeout_ms: u64,

    /// Process-wide bound on runs holding a browser session simultaneously.
    pub max_concurrent: usize,

    /// Capture a best-effort full-page screenshot when a step fails.
    pub screenshot_on_error: bool,

    /// Hard cap on `loop` step iterations regardless of requested count or
    /// matched element count.
    pub max_loop_iterations: usize,

    /// Attach runs to this pre-provisioned debugging endpoint instead of
    /// launching a local browser.
    pub remote_endpoint: Option<String>,

    /// Randomized pause between steps.
    pub step_delay: DelayRange,

    /// Randomized pause before risky interactions (click, fill).
    pub action_delay: DelayRange,

    /// Randomized per-character pause while filling inputs.
    pub typing_delay: DelayRange,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_ms: 30_000,
            max_concurrent: 2,
            screenshot_on_error: true,
            max_loop_iterations: 100,
            remote_endpoint: None,
            step_delay: DelayRange::new(500, 1_500),
            action_delay: DelayRange::new(100, 400),
            typing_delay: DelayRange::new(30, 120),
        }
    }
}

impl EngineConfig {
    /// Derive the per-run session configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            headless: self.headless,
            timeout_ms: self.timeout_ms,
            remote_endpoint: self.remote_endpoint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.max_loop_iterations, 100);
        assert!(config.screenshot_on_error);
        assert!(config.headless);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"max_concurrent": 5, "headless": false}"#).unwrap();
        assert_eq!(config.max_concurrent, 5);
        assert!(!config.headless);
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn test_session_config_derivation() {
        let mut config = EngineConfig::default();
        config.remote_endpoint = Some("http://10.0.0.5:9222".to_string());
        let session = config.session_config();
        assert_eq!(session.timeout_ms, 30_000);
        assert_eq!(session.remote_endpoint.as_deref(), Some("http://10.0.0.5:9222"));
    }
}

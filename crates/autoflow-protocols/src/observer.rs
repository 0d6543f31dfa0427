//! Execution observer definitions.
//!
//! Observers receive telemetry as a run progresses. The engine awaits each
//! hook before proceeding, so delivery is at-most-once per step and in step
//! order; a slow sink throttles the run's wall-clock time but never its
//! correctness.

use async_trait::async_trait;

use crate::error::EngineError;
use crate::result::StepResult;
use crate::types::{ExecutionProgress, ExtractedData, LogLevel};

/// Telemetry hooks invoked by the engine during a run.
///
/// Every hook defaults to a no-op, so an embedder implements only what it
/// consumes, and the engine behaves identically when nothing is supplied.
#[async_trait]
pub trait ExecutionObserver: Send + Sync {
    /// Progress snapshot, before each step dispatch.
    async fn on_progress(&self, progress: &ExecutionProgress) {
        let _ = progress;
    }

    /// Log line, optionally scoped to a step.
    async fn on_log(&self, level: LogLevel, message: &str, step_id: Option<&str>) {
        let _ = (level, message, step_id);
    }

    /// A step finished successfully.
    async fn on_step_complete(&self, step_id: &str, result: &StepResult) {
        let _ = (step_id, result);
    }

    /// A step failed and the run is aborting.
    async fn on_error(&self, error: &EngineError, step_id: Option<&str>) {
        let _ = (error, step_id);
    }

    /// All steps completed; final extracted data.
    async fn on_complete(&self, extracted: &ExtractedData) {
        let _ = extracted;
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl ExecutionObserver for NoopObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_observer_accepts_all_events() {
        let observer = NoopObserver;
        observer
            .on_progress(&ExecutionProgress {
                current_step: 1,
                total_steps: 1,
                percentage: 100,
                estimated_remaining_ms: None,
            })
            .await;
        observer.on_log(LogLevel::Info, "hello", None).await;
        observer
            .on_step_complete("step-1", &StepResult::ok())
            .await;
        observer.on_complete(&ExtractedData::new()).await;
    }
}

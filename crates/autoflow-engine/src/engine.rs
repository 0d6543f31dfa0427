//! The workflow engine: admission, run lifecycle, and the step interpreter.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use autoflow_protocols::{
    BrowserProvider, BrowserSession, EngineError, ExecutionContext, ExecutionProgress,
    ExecutionObserver, ExtractedData, LogLevel, NoopObserver, StepKind,
};

use crate::config::EngineConfig;
use crate::ops;
use crate::pacing::{DelaySource, Pacing, UniformDelay};
use crate::registry::SessionRegistry;
use crate::slots::SlotManager;
use crate::variables::resolve_config;

/// Executes workflow definitions against a browser capability provider.
///
/// One engine instance owns its own concurrency budget and session
/// registry, so independent instances (e.g. under test) never
/// cross-contaminate.
pub struct WorkflowEngine {
    config: EngineConfig,
    provider: Arc<dyn BrowserProvider>,
    slots: SlotManager,
    registry: SessionRegistry,
    pacing: Pacing,
}

impl WorkflowEngine {
    /// Create an engine with the default (uniformly random) pacing source.
    pub fn new(config: EngineConfig, provider: Arc<dyn BrowserProvider>) -> Self {
        Self::with_delay_source(config, provider, Arc::new(UniformDelay))
    }

    /// Create an engine with an injected delay source (deterministic tests).
    pub fn with_delay_source(
        config: EngineConfig,
        provider: Arc<dyn BrowserProvider>,
        source: Arc<dyn DelaySource>,
    ) -> Self {
        Self {
            slots: SlotManager::new(config.max_concurrent),
            registry: SessionRegistry::new(),
            pacing: Pacing::new(&config, source),
            provider,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sessions currently held by in-flight runs.
    pub fn live_sessions(&self) -> usize {
        self.registry.live_count()
    }

    /// Execute a workflow without telemetry. Identical behavior to
    /// [`execute_observed`](Self::execute_observed) with no-op callbacks.
    pub async fn execute(&self, context: ExecutionContext) -> Result<ExtractedData, EngineError> {
        self.execute_observed(context, Arc::new(NoopObserver)).await
    }

    /// Execute a workflow, reporting telemetry through the observer.
    ///
    /// Resolves to the final extracted data after `on_complete`, or to
    /// [`EngineError::StepFailed`] after exactly one `on_error` - never a
    /// silent partial success. The run's browser session is released on
    /// every exit path.
    pub async fn execute_observed(
        &self,
        mut context: ExecutionContext,
        observer: Arc<dyn ExecutionObserver>,
    ) -> Result<ExtractedData, EngineError> {
        let _permit = self.slots.acquire().await?;

        let session = match self.provider.acquire(&self.config.session_config()).await {
            Ok(session) => session,
            Err(e) => {
                let error = EngineError::Acquisition(e.to_string());
                observer.on_error(&error, None).await;
                return Err(error);
            }
        };

        info!(
            execution_id = %context.execution_id,
            workflow_id = %context.workflow_id,
            steps = context.definition.len(),
            "Starting workflow run"
        );

        self.registry.register(&context.execution_id, session.clone());
        let result = self.run(&mut context, &session, observer.as_ref()).await;
        self.registry.release(&context.execution_id).await;

        result
    }

    /// Drain the engine: stop admitting runs and force-close every live
    /// session. In-flight operations fail with a session-closed error.
    pub async fn shutdown(&self) {
        info!(live = self.registry.live_count(), "Engine shutting down");
        self.slots.close();
        self.registry.shutdown().await;
        self.provider.shutdown().await;
    }

    /// The interpreter: one pass over the step sequence, no revisit.
    async fn run(
        &self,
        context: &mut ExecutionContext,
        session: &Arc<dyn BrowserSession>,
        observer: &dyn ExecutionObserver,
    ) -> Result<ExtractedData, EngineError> {
        let steps = context.definition.steps.clone();
        let total = steps.len();
        let started = Instant::now();
        let mut extracted = ExtractedData::new();

        for (index, step) in steps.iter().enumerate() {
            // Resolved copy; the authored step stays untouched.
            let resolved = resolve_config(&step.config, &context.variables);

            let progress = progress_at(index, total, &started);
            observer.on_progress(&progress).await;
            observer
                .on_log(
                    LogLevel::Info,
                    &format!("Executing step {}/{}: {}", index + 1, total, step.kind),
                    Some(&step.id),
                )
                .await;
            debug!(step_id = %step.id, kind = %step.kind, "Dispatching step");

            let mut op_ctx = ops::StepCtx {
                step_id: &step.id,
                config: resolved,
                session,
                engine: &self.config,
                pacing: &self.pacing,
                variables: &mut context.variables,
                extracted: &mut extracted,
            };
            let result = ops::dispatch(&step.kind, &mut op_ctx).await;

            if !result.success {
                let message = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "Step failed".to_string());

                let screenshot = if self.config.screenshot_on_error {
                    match session.screenshot(true).await {
                        Ok(bytes) => Some(bytes),
                        Err(e) => {
                            warn!(step_id = %step.id, "Failure screenshot failed: {}", e);
                            observer
                                .on_log(
                                    LogLevel::Warn,
                                    &format!("Could not capture failure screenshot: {e}"),
                                    Some(&step.id),
                                )
                                .await;
                            None
                        }
                    }
                } else {
                    None
                };

                let error = EngineError::StepFailed {
                    step_id: step.id.clone(),
                    message,
                    screenshot,
                };
                observer.on_error(&error, Some(&step.id)).await;
                return Err(error);
            }

            // Step-id-keyed data. Variable-keyed writes (set_variable,
            // extract_to_variable) already happened inside the handler.
            if let Some(kind) = StepKind::parse(&step.kind) {
                if matches!(kind, StepKind::Extract | StepKind::Conditional | StepKind::Loop) {
                    if let Some(data) = result.data.clone() {
                        extracted.insert(step.id.clone(), data);
                    }
                }
            }

            observer.on_step_complete(&step.id, &result).await;

            if index + 1 < total {
                self.pacing.between_steps().await;
            }
        }

        info!(
            execution_id = %context.execution_id,
            keys = extracted.len(),
            "Workflow run completed"
        );
        observer.on_complete(&extracted).await;
        Ok(extracted)
    }
}

/// Progress for the step at `index` (0-based) out of `total`. The estimate
/// appears from the second step onward, extrapolated from elapsed time.
fn progress_at(index: usize, total: usize, started: &Instant) -> ExecutionProgress {
    let current = index + 1;
    let percentage = ((current as f64 / total as f64) * 100.0).round() as u8;
    let estimated_remaining_ms = if index >= 1 {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        Some((elapsed_ms / index as u64) * (total - index) as u64)
    } else {
        None
    };

    ExecutionProgress {
        current_step: current,
        total_steps: total,
        percentage,
        estimated_remaining_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_progress_percentage_rounds() {
        let started = Instant::now();
        assert_eq!(progress_at(0, 3, &started).percentage, 33);
        assert_eq!(progress_at(1, 3, &started).percentage, 67);
        assert_eq!(progress_at(2, 3, &started).percentage, 100);
    }

    #[test]
    fn test_progress_eta_from_second_step() {
        let started = Instant::now() - Duration::from_millis(1000);
        assert!(progress_at(0, 4, &started).estimated_remaining_ms.is_none());

        let eta = progress_at(2, 4, &started).estimated_remaining_ms.unwrap();
        // ~500ms per completed step, 2 remaining.
        assert!(eta >= 900 && eta <= 1100, "eta was {eta}");
    }

    #[test]
    fn test_progress_final_step_is_100() {
        let started = Instant::now();
        assert_eq!(progress_at(9, 10, &started).percentage, 100);
    }
}

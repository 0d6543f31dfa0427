//! Human-behavior timing.
//!
//! Randomized inter-step and intra-interaction delays make automated runs
//! pace like a person. The random source sits behind a trait so tests make
//! timing deterministic.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::config::{DelayRange, EngineConfig};

/// Picks a delay within an inclusive millisecond range.
pub trait DelaySource: Send + Sync {
    fn pick_ms(&self, min_ms: u64, max_ms: u64) -> u64;
}

/// Uniformly-random delays (the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformDelay;

impl DelaySource for UniformDelay {
    fn pick_ms(&self, min_ms: u64, max_ms: u64) -> u64 {
        if min_ms >= max_ms {
            return min_ms;
        }
        rand::thread_rng().gen_range(min_ms..=max_ms)
    }
}

/// Zero delays, for deterministic tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelaySource for NoDelay {
    fn pick_ms(&self, _min_ms: u64, _max_ms: u64) -> u64 {
        0
    }
}

/// Injects pauses between steps, before risky interactions, and per typed
/// character.
#[derive(Clone)]
pub struct Pacing {
    step: DelayRange,
    action: DelayRange,
    typing: DelayRange,
    source: Arc<dyn DelaySource>,
}

impl Pacing {
    pub fn new(config: &EngineConfig, source: Arc<dyn DelaySource>) -> Self {
        Self {
            step: config.step_delay,
            action: config.action_delay,
            typing: config.typing_delay,
            source,
        }
    }

    /// Pause between two steps.
    pub async fn between_steps(&self) {
        self.sleep(self.step).await;
    }

    /// Pause before a click or fill.
    pub async fn before_action(&self) {
        self.sleep(self.action).await;
    }

    /// Delay to apply after typing one character.
    pub fn typing_pause(&self) -> Duration {
        Duration::from_millis(self.source.pick_ms(self.typing.min_ms, self.typing.max_ms))
    }

    async fn sleep(&self, range: DelayRange) {
        let ms = self.source.pick_ms(range.min_ms, range.max_ms);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDelay(u64);

    impl DelaySource for FixedDelay {
        fn pick_ms(&self, _min_ms: u64, _max_ms: u64) -> u64 {
            self.0
        }
    }

    #[test]
    fn test_uniform_stays_in_range() {
        let source = UniformDelay;
        for _ in 0..200 {
            let ms = source.pick_ms(100, 400);
            assert!((100..=400).contains(&ms));
        }
    }

    #[test]
    fn test_uniform_degenerate_range() {
        assert_eq!(UniformDelay.pick_ms(250, 250), 250);
        assert_eq!(UniformDelay.pick_ms(300, 100), 300);
    }

    #[tokio::test]
    async fn test_injected_source_controls_timing() {
        let pacing = Pacing::new(&EngineConfig::default(), Arc::new(FixedDelay(0)));
        let start = std::time::Instant::now();
        pacing.between_steps().await;
        pacing.before_action().await;
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(pacing.typing_pause(), Duration::ZERO);
    }
}

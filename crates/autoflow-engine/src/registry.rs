//! Live session registry.
//!
//! Tracks every browser session currently held by a run so an engine-level
//! shutdown can force-close everything outstanding. Each close is
//! best-effort: failures are logged and swallowed, never escalated, and
//! never mask a run's primary error.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use autoflow_protocols::BrowserSession;

/// Registry of live browser sessions, keyed by execution id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<dyn BrowserSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a session for the given run.
    pub fn register(&self, execution_id: &str, session: Arc<dyn BrowserSession>) {
        self.sessions
            .lock()
            .insert(execution_id.to_string(), session);
        debug!(execution_id, "Registered browser session");
    }

    /// Remove and close the run's session. Called on every exit path.
    pub async fn release(&self, execution_id: &str) {
        let session = self.sessions.lock().remove(execution_id);
        if let Some(session) = session {
            if let Err(e) = session.close().await {
                warn!(execution_id, "Failed to close browser session: {}", e);
            }
            debug!(execution_id, "Released browser session");
        }
    }

    /// Force-close every registered session (drain-on-exit). In-flight
    /// operations on those sessions fail with a session-closed error.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, Arc<dyn BrowserSession>)> =
            self.sessions.lock().drain().collect();

        for (execution_id, session) in drained {
            if let Err(e) = session.close().await {
                warn!(execution_id, "Failed to force-close session: {}", e);
            }
        }
    }

    /// Number of live sessions.
    pub fn live_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

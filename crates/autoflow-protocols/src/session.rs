//! Browser capability traits.
//!
//! The engine never talks to a browser directly; it consumes these traits.
//! The production implementation lives in `autoflow-browser` (CDP over
//! WebSocket); tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;

/// Per-run session configuration, derived from the engine config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Launch a headless instance when no remote endpoint is configured.
    pub headless: bool,

    /// Per-operation timeout bound to the session's page.
    pub timeout_ms: u64,

    /// Attach to a pre-provisioned remote debugging endpoint instead of
    /// launching locally.
    #[serde(default)]
    pub remote_endpoint: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_ms: 30_000,
            remote_endpoint: None,
        }
    }
}

/// Element state a `wait` operation can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    Visible,
    Hidden,
    Attached,
}

impl WaitState {
    /// Parse a state string, defaulting to `Visible` for unknown values.
    pub fn parse(state: &str) -> Self {
        match state {
            "hidden" => Self::Hidden,
            "attached" => Self::Attached,
            _ => Self::Visible,
        }
    }
}

/// Page-level browser primitives, exclusively owned by one run.
///
/// Every method is bounded by the session's configured per-operation
/// timeout; a timeout surfaces as [`SessionError::Timeout`] and is treated
/// by the engine as an ordinary handler failure.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    // Navigation
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    // Pointer interaction
    async fn click(&self, selector: &str) -> Result<(), SessionError>;
    async fn right_click(&self, selector: &str) -> Result<(), SessionError>;
    async fn double_click(&self, selector: &str) -> Result<(), SessionError>;
    async fn hover(&self, selector: &str) -> Result<(), SessionError>;
    async fn drag_and_drop(&self, source: &str, target: &str) -> Result<(), SessionError>;
    async fn scroll_by(&self, x: f64, y: f64) -> Result<(), SessionError>;
    async fn scroll_to(&self, selector: &str) -> Result<(), SessionError>;

    // Keyboard interaction
    async fn focus(&self, selector: &str) -> Result<(), SessionError>;
    async fn clear(&self, selector: &str) -> Result<(), SessionError>;
    async fn insert_text(&self, text: &str) -> Result<(), SessionError>;
    async fn press_key(&self, key: &str) -> Result<(), SessionError>;

    // Querying and extraction
    async fn exists(&self, selector: &str) -> Result<bool, SessionError>;
    async fn is_visible(&self, selector: &str) -> Result<bool, SessionError>;
    async fn count(&self, selector: &str) -> Result<usize, SessionError>;
    async fn get_text(&self, selector: &str) -> Result<String, SessionError>;
    async fn get_texts(&self, selector: &str) -> Result<Vec<String>, SessionError>;
    async fn get_htmls(&self, selector: &str) -> Result<Vec<String>, SessionError>;
    async fn get_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, SessionError>;
    async fn get_attributes(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Vec<Option<String>>, SessionError>;
    async fn wait_for(
        &self,
        selector: &str,
        state: WaitState,
        timeout_ms: u64,
    ) -> Result<(), SessionError>;

    // Scripting
    async fn evaluate(&self, script: &str) -> Result<Value, SessionError>;

    // Page state
    async fn set_cookie(
        &self,
        name: &str,
        value: &str,
        domain: Option<&str>,
    ) -> Result<(), SessionError>;
    async fn get_cookie(&self, name: &str) -> Result<Option<String>, SessionError>;
    async fn set_local_storage(&self, key: &str, value: &str) -> Result<(), SessionError>;
    async fn get_local_storage(&self, key: &str) -> Result<Option<String>, SessionError>;
    async fn select_option(&self, selector: &str, value: &str) -> Result<(), SessionError>;

    // Transfers
    async fn screenshot(&self, full_page: bool) -> Result<Bytes, SessionError>;
    async fn download(&self, url: &str) -> Result<Bytes, SessionError>;

    /// Tear down the session: page first, then its isolated context. Called
    /// on every exit path. The browser process itself belongs to the
    /// provider.
    async fn close(&self) -> Result<(), SessionError>;
}

/// Acquires browser sessions for workflow runs.
///
/// Selection between a local headless launch and a remote pre-provisioned
/// endpoint is a configuration detail hidden behind `acquire`.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn acquire(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn BrowserSession>, SessionError>;

    /// Release provider-owned resources (e.g. a locally launched browser
    /// process). Sessions are closed individually by the engine's registry.
    async fn shutdown(&self) {}
}

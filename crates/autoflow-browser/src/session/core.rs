//! Session struct, command dispatch and shared page helpers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::client::CdpClient;
use crate::error::CdpError;

/// One page in one isolated browser context, exclusively owned by a run.
pub struct CdpSession {
    pub(super) client: Arc<CdpClient>,
    pub(super) target_id: String,
    pub(super) context_id: String,
    pub(super) session_id: String,
    /// Per-operation bound: applied to every dispatched command and to
    /// polling loops (navigation readiness, waits).
    pub(super) timeout_ms: u64,
}

impl CdpSession {
    pub(crate) fn new(
        client: Arc<CdpClient>,
        target_id: String,
        context_id: String,
        session_id: String,
        timeout_ms: u64,
    ) -> Self {
        Self {
            client,
            target_id,
            context_id,
            session_id,
            timeout_ms,
        }
    }

    /// Send a page-level CDP command, bounded by the session's configured
    /// per-operation timeout.
    pub(crate) async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.client
            .call(
                method,
                params,
                Some(&self.session_id),
                Duration::from_millis(self.timeout_ms),
            )
            .await
    }

    /// Enable the CDP domains session operations rely on.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        self.call("Network.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Evaluate a JavaScript expression and return its value.
    pub(super) async fn eval(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Viewport-relative center of the first element matching `selector`.
    pub(super) async fn element_center(&self, selector: &str) -> Result<(f64, f64), CdpError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return null; \
             el.scrollIntoView({{block: 'center', inline: 'center'}}); \
             const r = el.getBoundingClientRect(); \
             return {{x: r.x + r.width / 2, y: r.y + r.height / 2}}; }})()",
            sel = js_string(selector),
        );

        let value = self.eval(&script).await?;
        if value.is_null() {
            return Err(CdpError::ElementNotFound(selector.to_string()));
        }

        let x = value["x"].as_f64().unwrap_or(0.0);
        let y = value["y"].as_f64().unwrap_or(0.0);
        Ok((x, y))
    }

    /// One mouse press/release pair at the given point.
    pub(super) async fn mouse_click(
        &self,
        x: f64,
        y: f64,
        button: &str,
        click_count: u32,
    ) -> Result<(), CdpError> {
        for event in ["mousePressed", "mouseReleased"] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event,
                    "x": x,
                    "y": y,
                    "button": button,
                    "clickCount": click_count,
                })),
            )
            .await?;
        }
        Ok(())
    }

    pub(super) async fn mouse_move(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({"type": "mouseMoved", "x": x, "y": y})),
        )
        .await?;
        Ok(())
    }

    /// Poll `document.readyState` until the page is usable.
    pub(super) async fn wait_for_ready(&self) -> Result<(), CdpError> {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(self.timeout_ms);

        loop {
            let state = self.eval("document.readyState").await?;
            if let Some(state) = state.as_str() {
                if state == "complete" || state == "interactive" {
                    return Ok(());
                }
            }

            if start.elapsed() > timeout {
                return Err(CdpError::Timeout("Page load timeout".to_string()));
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Current page URL, used as cookie scope when no domain is given.
    pub(super) async fn current_url(&self) -> Result<String, CdpError> {
        let value = self.eval("window.location.href").await?;
        Ok(value.as_str().unwrap_or("about:blank").to_string())
    }
}

/// Embed a Rust string into a JavaScript expression as a quoted literal.
pub(super) fn js_string(s: &str) -> String {
    // serde_json string encoding is valid JS string syntax.
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

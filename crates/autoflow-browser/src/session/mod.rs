//! [`BrowserSession`] implementation over CDP.
//!
//! Pointer input goes through `Input.dispatchMouseEvent` at real element
//! coordinates; querying and page state go through `Runtime.evaluate` with
//! selectors embedded as escaped string literals.

mod core;

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{debug, warn};

use autoflow_protocols::{BrowserSession, SessionError, WaitState};

use crate::error::CdpError;
use self::core::js_string;

pub use self::core::CdpSession;

impl CdpSession {
    /// `true` when the element exists and occupies layout space.
    async fn visible(&self, selector: &str) -> Result<bool, CdpError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             const r = el.getBoundingClientRect(); \
             const style = window.getComputedStyle(el); \
             return r.width > 0 && r.height > 0 && style.visibility !== 'hidden' \
                 && style.display !== 'none'; }})()",
            sel = js_string(selector),
        );
        Ok(self.eval(&script).await?.as_bool().unwrap_or(false))
    }

    async fn attached(&self, selector: &str) -> Result<bool, CdpError> {
        let script = format!(
            "document.querySelector({sel}) !== null",
            sel = js_string(selector),
        );
        Ok(self.eval(&script).await?.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;

        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            if !error.is_empty() {
                return Err(CdpError::NavigationFailed(error.to_string()).into());
            }
        }

        self.wait_for_ready().await?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        let (x, y) = self.element_center(selector).await?;
        self.mouse_move(x, y).await?;
        self.mouse_click(x, y, "left", 1).await?;
        Ok(())
    }

    async fn right_click(&self, selector: &str) -> Result<(), SessionError> {
        let (x, y) = self.element_center(selector).await?;
        self.mouse_move(x, y).await?;
        self.mouse_click(x, y, "right", 1).await?;
        Ok(())
    }

    async fn double_click(&self, selector: &str) -> Result<(), SessionError> {
        let (x, y) = self.element_center(selector).await?;
        self.mouse_move(x, y).await?;
        for click_count in [1, 2] {
            self.mouse_click(x, y, "left", click_count).await?;
        }
        Ok(())
    }

    async fn hover(&self, selector: &str) -> Result<(), SessionError> {
        let (x, y) = self.element_center(selector).await?;
        self.mouse_move(x, y).await?;
        Ok(())
    }

    async fn drag_and_drop(&self, source: &str, target: &str) -> Result<(), SessionError> {
        let (sx, sy) = self.element_center(source).await?;
        let (tx, ty) = self.element_center(target).await?;

        self.mouse_move(sx, sy).await?;
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": "mousePressed",
                "x": sx, "y": sy,
                "button": "left",
                "clickCount": 1,
            })),
        )
        .await?;
        // An intermediate move makes drag handlers fire reliably.
        self.mouse_move((sx + tx) / 2.0, (sy + ty) / 2.0).await?;
        self.mouse_move(tx, ty).await?;
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": "mouseReleased",
                "x": tx, "y": ty,
                "button": "left",
                "clickCount": 1,
            })),
        )
        .await?;
        Ok(())
    }

    async fn scroll_by(&self, x: f64, y: f64) -> Result<(), SessionError> {
        self.eval(&format!("window.scrollBy({x}, {y})")).await?;
        Ok(())
    }

    async fn scroll_to(&self, selector: &str) -> Result<(), SessionError> {
        // element_center scrolls the element into view as a side effect.
        self.element_center(selector).await?;
        Ok(())
    }

    async fn focus(&self, selector: &str) -> Result<(), SessionError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             el.focus(); return true; }})()",
            sel = js_string(selector),
        );
        if !self.eval(&script).await?.as_bool().unwrap_or(false) {
            return Err(CdpError::ElementNotFound(selector.to_string()).into());
        }
        Ok(())
    }

    async fn clear(&self, selector: &str) -> Result<(), SessionError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             el.value = ''; \
             el.dispatchEvent(new Event('input', {{bubbles: true}})); \
             el.dispatchEvent(new Event('change', {{bubbles: true}})); \
             return true; }})()",
            sel = js_string(selector),
        );
        if !self.eval(&script).await?.as_bool().unwrap_or(false) {
            return Err(CdpError::ElementNotFound(selector.to_string()).into());
        }
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> Result<(), SessionError> {
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), SessionError> {
        for event in ["keyDown", "keyUp"] {
            self.call(
                "Input.dispatchKeyEvent",
                Some(json!({"type": event, "key": key})),
            )
            .await?;
        }
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool, SessionError> {
        Ok(self.attached(selector).await?)
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, SessionError> {
        Ok(self.visible(selector).await?)
    }

    async fn count(&self, selector: &str) -> Result<usize, SessionError> {
        let script = format!(
            "document.querySelectorAll({sel}).length",
            sel = js_string(selector),
        );
        Ok(self.eval(&script).await?.as_u64().unwrap_or(0) as usize)
    }

    async fn get_text(&self, selector: &str) -> Result<String, SessionError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             return el ? (el.textContent ?? '') : null; }})()",
            sel = js_string(selector),
        );
        let value = self.eval(&script).await?;
        match value.as_str() {
            Some(text) => Ok(text.to_string()),
            None => Err(CdpError::ElementNotFound(selector.to_string()).into()),
        }
    }

    async fn get_texts(&self, selector: &str) -> Result<Vec<String>, SessionError> {
        let script = format!(
            "Array.from(document.querySelectorAll({sel})).map(el => el.textContent ?? '')",
            sel = js_string(selector),
        );
        let value = self.eval(&script).await?;
        Ok(string_array(value))
    }

    async fn get_htmls(&self, selector: &str) -> Result<Vec<String>, SessionError> {
        let script = format!(
            "Array.from(document.querySelectorAll({sel})).map(el => el.outerHTML)",
            sel = js_string(selector),
        );
        let value = self.eval(&script).await?;
        Ok(string_array(value))
    }

    async fn get_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) return {{missing: true}}; \
             return {{value: el.getAttribute({attr})}}; }})()",
            sel = js_string(selector),
            attr = js_string(name),
        );
        let value = self.eval(&script).await?;
        if value["missing"].as_bool() == Some(true) {
            return Err(CdpError::ElementNotFound(selector.to_string()).into());
        }
        Ok(value["value"].as_str().map(str::to_string))
    }

    async fn get_attributes(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Vec<Option<String>>, SessionError> {
        let script = format!(
            "Array.from(document.querySelectorAll({sel})).map(el => el.getAttribute({attr}))",
            sel = js_string(selector),
            attr = js_string(name),
        );
        let value = self.eval(&script).await?;
        let items = value
            .as_array()
            .map(|arr| {
                arr.iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(items)
    }

    async fn wait_for(
        &self,
        selector: &str,
        state: WaitState,
        timeout_ms: u64,
    ) -> Result<(), SessionError> {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            let satisfied = match state {
                WaitState::Attached => self.attached(selector).await?,
                WaitState::Visible => self.visible(selector).await?,
                WaitState::Hidden => !self.visible(selector).await?,
            };
            if satisfied {
                return Ok(());
            }

            if start.elapsed() > timeout {
                return Err(CdpError::Timeout(format!(
                    "Waiting for selector '{}' timed out",
                    selector
                ))
                .into());
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, SessionError> {
        Ok(self.eval(script).await?)
    }

    async fn set_cookie(
        &self,
        name: &str,
        value: &str,
        domain: Option<&str>,
    ) -> Result<(), SessionError> {
        let mut params = json!({
            "name": name,
            "value": value,
            "path": "/",
        });
        match domain {
            Some(domain) => params["domain"] = json!(domain),
            None => params["url"] = json!(self.current_url().await?),
        }

        let result = self.call("Network.setCookie", Some(params)).await?;
        if result["success"].as_bool() == Some(false) {
            return Err(CdpError::InvalidResponse(format!("Cookie '{name}' rejected")).into());
        }
        Ok(())
    }

    async fn get_cookie(&self, name: &str) -> Result<Option<String>, SessionError> {
        let url = self.current_url().await?;
        let result = self
            .call("Network.getCookies", Some(json!({"urls": [url]})))
            .await?;

        let value = result["cookies"]
            .as_array()
            .and_then(|cookies| {
                cookies
                    .iter()
                    .find(|c| c["name"].as_str() == Some(name))
                    .and_then(|c| c["value"].as_str())
            })
            .map(str::to_string);
        Ok(value)
    }

    async fn set_local_storage(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let script = format!(
            "localStorage.setItem({key}, {value})",
            key = js_string(key),
            value = js_string(value),
        );
        self.eval(&script).await?;
        Ok(())
    }

    async fn get_local_storage(&self, key: &str) -> Result<Option<String>, SessionError> {
        let script = format!("localStorage.getItem({key})", key = js_string(key));
        let value = self.eval(&script).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) return 'missing'; \
             el.value = {val}; \
             el.dispatchEvent(new Event('input', {{bubbles: true}})); \
             el.dispatchEvent(new Event('change', {{bubbles: true}})); \
             return el.value === {val} ? 'ok' : 'nomatch'; }})()",
            sel = js_string(selector),
            val = js_string(value),
        );
        match self.eval(&script).await?.as_str() {
            Some("ok") => Ok(()),
            Some("nomatch") => Err(CdpError::JavaScript(format!(
                "No option with value '{value}' in {selector}"
            ))
            .into()),
            _ => Err(CdpError::ElementNotFound(selector.to_string()).into()),
        }
    }

    async fn screenshot(&self, full_page: bool) -> Result<Bytes, SessionError> {
        let result = self
            .call(
                "Page.captureScreenshot",
                Some(json!({
                    "format": "png",
                    "captureBeyondViewport": full_page,
                })),
            )
            .await?;

        let data = result["data"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| CdpError::InvalidResponse(format!("Bad screenshot payload: {e}")))?;
        Ok(Bytes::from(bytes))
    }

    async fn download(&self, url: &str) -> Result<Bytes, SessionError> {
        // Fetch inside the page so cookies and auth headers apply.
        let script = format!(
            "(async () => {{ const resp = await fetch({url}); \
             if (!resp.ok) throw new Error('HTTP ' + resp.status); \
             const buf = await resp.arrayBuffer(); \
             const bytes = new Uint8Array(buf); \
             let binary = ''; \
             for (let i = 0; i < bytes.length; i += 0x8000) {{ \
                 binary += String.fromCharCode.apply(null, bytes.subarray(i, i + 0x8000)); \
             }} \
             return btoa(binary); }})()",
            url = js_string(url),
        );

        let value = self.eval(&script).await?;
        let data = value
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing download payload".to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| CdpError::InvalidResponse(format!("Bad download payload: {e}")))?;

        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(Bytes::from(bytes))
    }

    async fn close(&self) -> Result<(), SessionError> {
        // Page first, then its context; each best-effort so a dead target
        // does not leak the context.
        if let Err(e) = self.client.close_target(&self.target_id).await {
            warn!("Failed to close target {}: {}", self.target_id, e);
        }
        self.client.dispose_context(&self.context_id).await?;

        debug!("Closed session {}", self.session_id);
        Ok(())
    }
}

fn string_array(value: Value) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|v| v.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

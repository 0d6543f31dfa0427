//! Navigation and page-level handlers: navigate, wait, scroll, screenshot.

use std::time::Duration;

use base64::Engine as _;
use serde_json::json;
use tracing::debug;

use autoflow_protocols::{StepResult, WaitState};

use super::{bool_field, capability_failure, f64_field, str_field, u64_field, StepCtx};

pub(crate) async fn navigate(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(url) = str_field(&ctx.config, "url") else {
        return StepResult::fail("URL is required for navigate step");
    };

    match ctx.session.navigate(url).await {
        Ok(()) => {
            debug!(url, "Navigated");
            StepResult::with_data(json!({ "url": url }))
        }
        Err(e) => capability_failure(e),
    }
}

/// Wait for a fixed duration or for a selector to reach a state. Exactly
/// one path runs; the selector wins when both are configured.
pub(crate) async fn wait(ctx: &mut StepCtx<'_>) -> StepResult {
    if let Some(selector) = str_field(&ctx.config, "selector") {
        let state = str_field(&ctx.config, "state")
            .map(WaitState::parse)
            .unwrap_or(WaitState::Visible);
        let timeout_ms = u64_field(&ctx.config, "timeout").unwrap_or(ctx.engine.timeout_ms);

        return match ctx.session.wait_for(selector, state, timeout_ms).await {
            Ok(()) => StepResult::with_data(json!({ "selector": selector })),
            Err(e) => capability_failure(e),
        };
    }

    let Some(duration_ms) = u64_field(&ctx.config, "duration") else {
        return StepResult::fail("Duration or selector is required for wait step");
    };

    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
    StepResult::with_data(json!({ "waited_ms": duration_ms }))
}

pub(crate) async fn scroll(ctx: &mut StepCtx<'_>) -> StepResult {
    if let Some(selector) = str_field(&ctx.config, "selector") {
        return match ctx.session.scroll_to(selector).await {
            Ok(()) => StepResult::with_data(json!({ "selector": selector })),
            Err(e) => capability_failure(e),
        };
    }

    let x = f64_field(&ctx.config, "x").unwrap_or(0.0);
    let y = f64_field(&ctx.config, "y").unwrap_or(0.0);
    match ctx.session.scroll_by(x, y).await {
        Ok(()) => StepResult::with_data(json!({ "x": x, "y": y })),
        Err(e) => capability_failure(e),
    }
}

pub(crate) async fn screenshot(ctx: &mut StepCtx<'_>) -> StepResult {
    let full_page = bool_field(&ctx.config, "fullPage");

    match ctx.session.screenshot(full_page).await {
        Ok(bytes) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            StepResult::with_data(json!({
                "fullPage": full_page,
                "bytes": bytes.len(),
                "base64": encoded,
            }))
            .with_screenshot(bytes)
        }
        Err(e) => capability_failure(e),
    }
}

//! User interaction handlers: clicks, hover, keyboard, fill, drag, select.

use serde_json::json;
use tracing::debug;

use autoflow_protocols::{StepKind, StepResult};

use super::{capability_failure, str_field, value_as_text, StepCtx};

/// Shared handler for `click`, `right_click` and `double_click`.
pub(crate) async fn click(ctx: &mut StepCtx<'_>, kind: StepKind) -> StepResult {
    let Some(selector) = str_field(&ctx.config, "selector") else {
        return StepResult::fail(format!("Selector is required for {} step", kind.as_str()));
    };

    ctx.pacing.before_action().await;

    let outcome = match kind {
        StepKind::RightClick => ctx.session.right_click(selector).await,
        StepKind::DoubleClick => ctx.session.double_click(selector).await,
        _ => ctx.session.click(selector).await,
    };

    match outcome {
        Ok(()) => {
            debug!(selector, kind = kind.as_str(), "Clicked");
            StepResult::with_data(json!({ "selector": selector }))
        }
        Err(e) => capability_failure(e),
    }
}

pub(crate) async fn hover(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(selector) = str_field(&ctx.config, "selector") else {
        return StepResult::fail("Selector is required for hover step");
    };

    match ctx.session.hover(selector).await {
        Ok(()) => StepResult::with_data(json!({ "selector": selector })),
        Err(e) => capability_failure(e),
    }
}

pub(crate) async fn press_key(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(key) = str_field(&ctx.config, "key") else {
        return StepResult::fail("Key is required for press_key step");
    };

    match ctx.session.press_key(key).await {
        Ok(()) => StepResult::with_data(json!({ "key": key })),
        Err(e) => capability_failure(e),
    }
}

/// Fill an input by typing character by character, with a small randomized
/// pause per character.
pub(crate) async fn fill(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(selector) = str_field(&ctx.config, "selector") else {
        return StepResult::fail("Selector is required for fill step");
    };
    let Some(value) = ctx.config.get("value") else {
        return StepResult::fail("Value is required for fill step");
    };
    let text = value_as_text(value);

    ctx.pacing.before_action().await;

    if let Err(e) = ctx.session.focus(selector).await {
        return capability_failure(e);
    }
    if let Err(e) = ctx.session.clear(selector).await {
        return capability_failure(e);
    }

    let mut buf = [0u8; 4];
    for ch in text.chars() {
        if let Err(e) = ctx.session.insert_text(ch.encode_utf8(&mut buf)).await {
            return capability_failure(e);
        }
        let pause = ctx.pacing.typing_pause();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    debug!(selector, chars = text.chars().count(), "Filled input");
    StepResult::with_data(json!({ "selector": selector, "chars": text.chars().count() }))
}

pub(crate) async fn drag_drop(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(source) = str_field(&ctx.config, "sourceSelector") else {
        return StepResult::fail("Source selector is required for drag_drop step");
    };
    let Some(target) = str_field(&ctx.config, "targetSelector") else {
        return StepResult::fail("Target selector is required for drag_drop step");
    };

    match ctx.session.drag_and_drop(source, target).await {
        Ok(()) => StepResult::with_data(json!({ "source": source, "target": target })),
        Err(e) => capability_failure(e),
    }
}

pub(crate) async fn select_dropdown(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(selector) = str_field(&ctx.config, "selector") else {
        return StepResult::fail("Selector is required for select_dropdown step");
    };
    let Some(value) = ctx.config.get("value") else {
        return StepResult::fail("Value is required for select_dropdown step");
    };
    let value = value_as_text(value);

    match ctx.session.select_option(selector, &value).await {
        Ok(()) => StepResult::with_data(json!({ "selector": selector, "value": value })),
        Err(e) => capability_failure(e),
    }
}

//! Data extraction handlers: extract, extract_to_variable, execute_js,
//! download_file.

use serde_json::{json, Value};
use tracing::debug;

use autoflow_protocols::{SessionError, StepResult};

use super::{bool_field, capability_failure, str_field, StepCtx};

/// Pull text, attribute or element-list data out of the page.
///
/// Single or multiple extraction; attribute extraction falls back to
/// trimmed text content; an optional `fieldName` wraps the returned shape.
pub(crate) async fn extract(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(selector) = str_field(&ctx.config, "selector") else {
        return StepResult::fail("Selector is required for extract step");
    };
    let attribute = str_field(&ctx.config, "attribute").map(str::to_string);
    let multiple = bool_field(&ctx.config, "multiple");

    let value = match extract_value(ctx, selector, attribute.as_deref(), multiple).await {
        Ok(value) => value,
        Err(e) => return capability_failure(e),
    };

    let data = match str_field(&ctx.config, "fieldName") {
        Some(field) => json!({ field: value }),
        None => value,
    };

    debug!(selector, multiple, "Extracted data");
    StepResult::with_data(data)
}

/// Like `extract`, but stores the result in the run's variable bindings so
/// later steps can reference it through `${name}` templates.
pub(crate) async fn extract_to_variable(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(selector) = str_field(&ctx.config, "selector") else {
        return StepResult::fail("Selector is required for extract_to_variable step");
    };
    let Some(name) = str_field(&ctx.config, "variableName").map(str::to_string) else {
        return StepResult::fail("Variable name is required for extract_to_variable step");
    };
    let attribute = str_field(&ctx.config, "attribute").map(str::to_string);
    let multiple = bool_field(&ctx.config, "multiple");

    let value = match extract_value(ctx, selector, attribute.as_deref(), multiple).await {
        Ok(value) => value,
        Err(e) => return capability_failure(e),
    };

    ctx.variables.insert(name.clone(), value.clone());
    ctx.extracted.insert(name.clone(), value.clone());

    StepResult::with_data(json!({ "variable": name, "value": value }))
}

async fn extract_value(
    ctx: &StepCtx<'_>,
    selector: &str,
    attribute: Option<&str>,
    multiple: bool,
) -> Result<Value, SessionError> {
    let value = match (multiple, attribute) {
        (false, None) => Value::String(ctx.session.get_text(selector).await?.trim().to_string()),
        (false, Some(attr)) => match ctx.session.get_attribute(selector, attr).await? {
            Some(v) => Value::String(v),
            None => Value::Null,
        },
        (true, None) => Value::Array(
            ctx.session
                .get_texts(selector)
                .await?
                .into_iter()
                .map(|t| Value::String(t.trim().to_string()))
                .collect(),
        ),
        (true, Some(attr)) => Value::Array(
            ctx.session
                .get_attributes(selector, attr)
                .await?
                .into_iter()
                .map(|v| v.map(Value::String).unwrap_or(Value::Null))
                .collect(),
        ),
    };
    Ok(value)
}

pub(crate) async fn execute_js(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(script) = str_field(&ctx.config, "script") else {
        return StepResult::fail("Script is required for execute_js step");
    };

    match ctx.session.evaluate(script).await {
        Ok(value) => StepResult::with_data(value),
        Err(e) => capability_failure(e),
    }
}

pub(crate) async fn download_file(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(url) = str_field(&ctx.config, "url") else {
        return StepResult::fail("URL is required for download_file step");
    };

    let bytes = match ctx.session.download(url).await {
        Ok(bytes) => bytes,
        Err(e) => return capability_failure(e),
    };

    let mut data = json!({ "url": url, "bytes": bytes.len() });
    if let Some(path) = str_field(&ctx.config, "savePath") {
        if let Err(e) = tokio::fs::write(path, &bytes).await {
            return StepResult::fail(format!("Failed to save download to {path}: {e}"));
        }
        data["path"] = json!(path);
    }

    debug!(url, bytes = bytes.len(), "Downloaded file");
    StepResult::with_data(data)
}

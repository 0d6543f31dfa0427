//! Operation handlers.
//!
//! One handler per step kind. Each handler independently validates its
//! required config fields and returns a failed [`StepResult`] for expected
//! errors (missing fields, capability failures) - it never panics and never
//! propagates an error type of its own.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use autoflow_protocols::{BrowserSession, SessionError, StepKind, StepResult};

use crate::config::EngineConfig;
use crate::pacing::Pacing;

mod control;
mod extraction;
mod interaction;
mod navigation;
mod state;

/// Everything a handler may touch while executing one step.
pub(crate) struct StepCtx<'a> {
    pub step_id: &'a str,
    /// Resolved copy of the step's config (variables already substituted).
    pub config: Map<String, Value>,
    pub session: &'a Arc<dyn BrowserSession>,
    pub engine: &'a EngineConfig,
    pub pacing: &'a Pacing,
    /// Run-scoped variable bindings.
    pub variables: &'a mut Map<String, Value>,
    /// Run-scoped extracted data. Handlers that key by variable name write
    /// here directly; step-id-keyed data is merged by the interpreter.
    pub extracted: &'a mut Map<String, Value>,
}

/// Dispatch a step to its handler. Unknown kinds fail explicitly.
pub(crate) async fn dispatch(kind: &str, ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(kind) = StepKind::parse(kind) else {
        return StepResult::fail(format!("Unknown step type: {kind}"));
    };
    trace!(step_id = %ctx.step_id, kind = kind.as_str(), "Running operation handler");

    match kind {
        StepKind::Navigate => navigation::navigate(ctx).await,
        StepKind::Wait => navigation::wait(ctx).await,
        StepKind::Scroll => navigation::scroll(ctx).await,
        StepKind::Screenshot => navigation::screenshot(ctx).await,
        StepKind::Click => interaction::click(ctx, kind).await,
        StepKind::RightClick => interaction::click(ctx, kind).await,
        StepKind::DoubleClick => interaction::click(ctx, kind).await,
        StepKind::Hover => interaction::hover(ctx).await,
        StepKind::PressKey => interaction::press_key(ctx).await,
        StepKind::Fill => interaction::fill(ctx).await,
        StepKind::DragDrop => interaction::drag_drop(ctx).await,
        StepKind::SelectDropdown => interaction::select_dropdown(ctx).await,
        StepKind::Extract => extraction::extract(ctx).await,
        StepKind::ExtractToVariable => extraction::extract_to_variable(ctx).await,
        StepKind::ExecuteJs => extraction::execute_js(ctx).await,
        StepKind::DownloadFile => extraction::download_file(ctx).await,
        StepKind::SetVariable => state::set_variable(ctx).await,
        StepKind::SetCookie => state::set_cookie(ctx).await,
        StepKind::GetCookie => state::get_cookie(ctx).await,
        StepKind::SetLocalstorage => state::set_localstorage(ctx).await,
        StepKind::GetLocalstorage => state::get_localstorage(ctx).await,
        StepKind::Conditional => control::conditional(ctx).await,
        StepKind::Loop => control::run_loop(ctx).await,
    }
}

// ---------------------------------------------------------------------------
// Shared config accessors
// ---------------------------------------------------------------------------

/// Read a string field.
pub(crate) fn str_field<'m>(config: &'m Map<String, Value>, key: &str) -> Option<&'m str> {
    config.get(key).and_then(Value::as_str)
}

/// Read a numeric field, accepting JSON numbers and numeric strings
/// (variable substitution often turns numbers into strings).
pub(crate) fn u64_field(config: &Map<String, Value>, key: &str) -> Option<u64> {
    match config.get(key) {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a float field with the same number-or-string leniency.
pub(crate) fn f64_field(config: &Map<String, Value>, key: &str) -> Option<f64> {
    match config.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a boolean field, defaulting to false.
pub(crate) fn bool_field(config: &Map<String, Value>, key: &str) -> bool {
    match config.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

/// Render a config value as the text a user would type or compare.
pub(crate) fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Turn a capability failure into a failed step result.
pub(crate) fn capability_failure(error: SessionError) -> StepResult {
    StepResult::fail(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_u64_field_accepts_numeric_strings() {
        let cfg = config(json!({"count": "42", "timeout": 100, "bad": "x"}));
        assert_eq!(u64_field(&cfg, "count"), Some(42));
        assert_eq!(u64_field(&cfg, "timeout"), Some(100));
        assert_eq!(u64_field(&cfg, "bad"), None);
        assert_eq!(u64_field(&cfg, "missing"), None);
    }

    #[test]
    fn test_bool_field_defaults_false() {
        let cfg = config(json!({"a": true, "b": "true", "c": "yes"}));
        assert!(bool_field(&cfg, "a"));
        assert!(bool_field(&cfg, "b"));
        assert!(!bool_field(&cfg, "c"));
        assert!(!bool_field(&cfg, "missing"));
    }

    #[test]
    fn test_value_as_text() {
        assert_eq!(value_as_text(&json!("abc")), "abc");
        assert_eq!(value_as_text(&json!(5)), "5");
        assert_eq!(value_as_text(&json!(true)), "true");
    }
}

//! Evaluation primitives named like control flow: conditional and loop.
//!
//! Under the current contract neither alters which steps run. `conditional`
//! only records a boolean; `loop` repeats a fixed built-in extraction body,
//! never a nested sub-sequence. Branching semantics must not be inferred
//! from the names.

use serde_json::{json, Value};
use tracing::debug;

use autoflow_protocols::StepResult;

use super::{capability_failure, str_field, u64_field, value_as_text, StepCtx};

/// Variable names reserved by the loop handler; they exist only while the
/// loop step executes and are removed immediately after.
const LOOP_VARIABLES: &[&str] = &[
    "loopIndex",
    "loopTotal",
    "loopIteration",
    "loopElementText",
    "loopElementHTML",
];

/// Evaluate one of five condition kinds and store the boolean plus
/// metadata into the run's extracted data. Pure evaluation: the result
/// never skips or branches subsequent steps.
pub(crate) async fn conditional(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(condition) = str_field(&ctx.config, "conditionType").map(str::to_string) else {
        return StepResult::fail("Condition type is required for conditional step");
    };

    let result = match condition.as_str() {
        "element_exists" => {
            let Some(selector) = str_field(&ctx.config, "selector") else {
                return StepResult::fail("Selector is required for conditional step");
            };
            match ctx.session.exists(selector).await {
                Ok(found) => found,
                Err(e) => return capability_failure(e),
            }
        }
        "element_visible" => {
            let Some(selector) = str_field(&ctx.config, "selector") else {
                return StepResult::fail("Selector is required for conditional step");
            };
            match ctx.session.is_visible(selector).await {
                Ok(visible) => visible,
                Err(e) => return capability_failure(e),
            }
        }
        "text_contains" => {
            let Some(selector) = str_field(&ctx.config, "selector") else {
                return StepResult::fail("Selector is required for conditional step");
            };
            let Some(expected) = str_field(&ctx.config, "text") else {
                return StepResult::fail("Text is required for conditional step");
            };
            match ctx.session.get_text(selector).await {
                Ok(text) => text.contains(expected),
                Err(e) => return capability_failure(e),
            }
        }
        "comparison" | "value_comparison" => {
            let (Some(left), Some(right)) = (ctx.config.get("left"), ctx.config.get("right"))
            else {
                return StepResult::fail(
                    "Left and right values are required for conditional step",
                );
            };
            let operator = str_field(&ctx.config, "operator").unwrap_or("equals");
            match compare(left, right, operator) {
                Some(outcome) => outcome,
                None => {
                    return StepResult::fail(format!(
                        "Unknown comparison operator: {operator}"
                    ))
                }
            }
        }
        "custom_script" | "script" => {
            let Some(script) = str_field(&ctx.config, "script") else {
                return StepResult::fail("Script is required for conditional step");
            };
            match ctx.session.evaluate(script).await {
                Ok(value) => truthy(&value),
                Err(e) => return capability_failure(e),
            }
        }
        other => {
            return StepResult::fail(format!("Unknown condition type: {other}"));
        }
    };

    debug!(condition = %condition, result, "Evaluated condition");
    StepResult::with_data(json!({
        "conditionType": condition,
        "result": result,
    }))
}

/// Six-operator value comparison. Ordering operators compare numerically
/// when both operands parse as numbers, otherwise lexicographically.
fn compare(left: &Value, right: &Value, operator: &str) -> Option<bool> {
    let l = value_as_text(left);
    let r = value_as_text(right);

    let outcome = match operator {
        "equals" => l == r,
        "not_equals" => l != r,
        "contains" => l.contains(&r),
        "not_contains" => !l.contains(&r),
        "greater_than" => match (l.trim().parse::<f64>(), r.trim().parse::<f64>()) {
            (Ok(a), Ok(b)) => a > b,
            _ => l > r,
        },
        "less_than" => match (l.trim().parse::<f64>(), r.trim().parse::<f64>()) {
            (Ok(a), Ok(b)) => a < b,
            _ => l < r,
        },
        _ => return None,
    };
    Some(outcome)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Transient per-iteration state, alive only while the loop step runs.
struct LoopContext {
    total_iterations: usize,
    current_iteration: usize,
    current_element: Option<(String, String)>,
    should_break: bool,
}

/// Iterate over matched elements or a fixed count, capped by the engine's
/// iteration limit. Element loops extract text and HTML per iteration into
/// a results array; an optional `breakCondition` script stops early.
pub(crate) async fn run_loop(ctx: &mut StepCtx<'_>) -> StepResult {
    let loop_type = str_field(&ctx.config, "loopType").unwrap_or("count");
    let cap = ctx.engine.max_loop_iterations;

    let (total, elements) = match loop_type {
        "count" => {
            let Some(count) = u64_field(&ctx.config, "count") else {
                return StepResult::fail("Count is required for loop step");
            };
            (count as usize, None)
        }
        "elements" => {
            let Some(selector) = str_field(&ctx.config, "selector") else {
                return StepResult::fail("Selector is required for loop step");
            };
            let texts = match ctx.session.get_texts(selector).await {
                Ok(texts) => texts,
                Err(e) => return capability_failure(e),
            };
            let htmls = match ctx.session.get_htmls(selector).await {
                Ok(htmls) => htmls,
                Err(e) => return capability_failure(e),
            };
            (texts.len(), Some((texts, htmls)))
        }
        other => {
            return StepResult::fail(format!("Unknown loop type: {other}"));
        }
    };

    let planned = total.min(cap);
    if planned < total {
        debug!(total, cap, "Loop capped at iteration limit");
    }

    let break_condition = str_field(&ctx.config, "breakCondition").map(str::to_string);
    let mut results = Vec::with_capacity(planned);
    let mut state = LoopContext {
        total_iterations: planned,
        current_iteration: 0,
        current_element: None,
        should_break: false,
    };

    while state.current_iteration < state.total_iterations && !state.should_break {
        let index = state.current_iteration;

        state.current_element = elements.as_ref().map(|(texts, htmls)| {
            (
                texts.get(index).cloned().unwrap_or_default(),
                htmls.get(index).cloned().unwrap_or_default(),
            )
        });

        ctx.variables.insert("loopIndex".into(), json!(index));
        ctx.variables.insert("loopTotal".into(), json!(planned));
        ctx.variables.insert("loopIteration".into(), json!(index + 1));

        if let Some((text, html)) = &state.current_element {
            ctx.variables
                .insert("loopElementText".into(), json!(text.trim()));
            ctx.variables.insert("loopElementHTML".into(), json!(html));
            results.push(json!({
                "index": index,
                "text": text.trim(),
                "html": html,
            }));
        } else {
            results.push(json!({ "index": index }));
        }

        if let Some(script) = &break_condition {
            match ctx.session.evaluate(script).await {
                Ok(value) => state.should_break = truthy(&value),
                Err(e) => {
                    clear_loop_variables(ctx);
                    return capability_failure(e);
                }
            }
        }

        state.current_iteration += 1;
    }

    let iterations = state.current_iteration;
    clear_loop_variables(ctx);

    debug!(iterations, total, "Loop finished");
    StepResult::with_data(json!({
        "iterations": iterations,
        "totalElements": total,
        "results": results,
    }))
}

fn clear_loop_variables(ctx: &mut StepCtx<'_>) {
    for name in LOOP_VARIABLES {
        ctx.variables.remove(*name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compare_equals() {
        assert_eq!(compare(&json!("a"), &json!("a"), "equals"), Some(true));
        assert_eq!(compare(&json!("a"), &json!("b"), "equals"), Some(false));
        assert_eq!(compare(&json!(5), &json!("5"), "equals"), Some(true));
    }

    #[test]
    fn test_compare_ordering_numeric() {
        assert_eq!(compare(&json!("10"), &json!("9"), "greater_than"), Some(true));
        assert_eq!(compare(&json!(2), &json!(10), "less_than"), Some(true));
    }

    #[test]
    fn test_compare_contains() {
        assert_eq!(
            compare(&json!("hello world"), &json!("world"), "contains"),
            Some(true)
        );
        assert_eq!(
            compare(&json!("hello"), &json!("world"), "not_contains"),
            Some(true)
        );
    }

    #[test]
    fn test_compare_unknown_operator() {
        assert_eq!(compare(&json!(1), &json!(2), "approximately"), None);
    }

    #[test]
    fn test_truthy() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("x")));
        assert!(truthy(&json!([])));
    }
}

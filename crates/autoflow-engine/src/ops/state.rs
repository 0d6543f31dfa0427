//! Run-state and page-state handlers: variables, cookies, local storage.

use serde_json::json;

use autoflow_protocols::StepResult;

use super::{capability_failure, str_field, value_as_text, StepCtx};

/// Bind a value to a run variable. The value is also mirrored into the
/// extracted data under the variable name.
pub(crate) async fn set_variable(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(name) = str_field(&ctx.config, "variableName").map(str::to_string) else {
        return StepResult::fail("Variable name is required for set_variable step");
    };
    let Some(value) = ctx.config.get("variableValue").cloned() else {
        return StepResult::fail("Variable value is required for set_variable step");
    };

    ctx.variables.insert(name.clone(), value.clone());
    ctx.extracted.insert(name.clone(), value.clone());

    StepResult::with_data(json!({ "variable": name, "value": value }))
}

pub(crate) async fn set_cookie(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(name) = str_field(&ctx.config, "name") else {
        return StepResult::fail("Name is required for set_cookie step");
    };
    let Some(value) = ctx.config.get("value") else {
        return StepResult::fail("Value is required for set_cookie step");
    };
    let value = value_as_text(value);
    let domain = str_field(&ctx.config, "domain");

    match ctx.session.set_cookie(name, &value, domain).await {
        Ok(()) => StepResult::with_data(json!({ "name": name })),
        Err(e) => capability_failure(e),
    }
}

pub(crate) async fn get_cookie(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(name) = str_field(&ctx.config, "name") else {
        return StepResult::fail("Name is required for get_cookie step");
    };

    match ctx.session.get_cookie(name).await {
        Ok(value) => StepResult::with_data(json!({ "name": name, "value": value })),
        Err(e) => capability_failure(e),
    }
}

pub(crate) async fn set_localstorage(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(key) = str_field(&ctx.config, "key") else {
        return StepResult::fail("Key is required for set_localstorage step");
    };
    let Some(value) = ctx.config.get("value") else {
        return StepResult::fail("Value is required for set_localstorage step");
    };
    let value = value_as_text(value);

    match ctx.session.set_local_storage(key, &value).await {
        Ok(()) => StepResult::with_data(json!({ "key": key })),
        Err(e) => capability_failure(e),
    }
}

pub(crate) async fn get_localstorage(ctx: &mut StepCtx<'_>) -> StepResult {
    let Some(key) = str_field(&ctx.config, "key") else {
        return StepResult::fail("Key is required for get_localstorage step");
    };

    match ctx.session.get_local_storage(key).await {
        Ok(value) => StepResult::with_data(json!({ "key": key, "value": value })),
        Err(e) => capability_failure(e),
    }
}

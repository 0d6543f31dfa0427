use bytes::Bytes;
use serde_json::json;

use super::StepResult;

#[test]
fn test_ok_result() {
    let result = StepResult::ok();
    assert!(result.success);
    assert!(result.data.is_none());
    assert!(result.error.is_none());
}

#[test]
fn test_with_data() {
    let result = StepResult::with_data(json!({"count": 3}));
    assert!(result.success);
    assert_eq!(result.data.unwrap()["count"], 3);
}

#[test]
fn test_fail_result() {
    let result = StepResult::fail("URL is required for navigate step");
    assert!(!result.success);
    assert!(result.error.unwrap().contains("URL is required"));
}

#[test]
fn test_screenshot_not_serialized() {
    let result = StepResult::fail("boom").with_screenshot(Bytes::from_static(b"png"));
    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("screenshot").is_none());
    assert_eq!(json["error"], "boom");
}

//! CDP wire message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP response or event message.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Error payload inside a response.
#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// Browser version info from `/json/version`.
///
/// Note: Chrome returns PascalCase field names for this endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "Protocol-Version")]
    pub protocol_version: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_empty_fields() {
        let request = CdpRequest {
            id: 7,
            method: "Page.enable".to_string(),
            params: None,
            session_id: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, json!({"id": 7, "method": "Page.enable"}));
    }

    #[test]
    fn test_request_renames_session_id() {
        let request = CdpRequest {
            id: 1,
            method: "Page.navigate".to_string(),
            params: Some(json!({"url": "https://example.com"})),
            session_id: Some("S1".to_string()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["sessionId"], "S1");
        assert_eq!(json["params"]["url"], "https://example.com");
    }

    #[test]
    fn test_response_with_error() {
        let resp: CdpResponse = serde_json::from_value(json!({
            "id": 3,
            "error": {"code": -32000, "message": "No node found"}
        }))
        .unwrap();
        assert_eq!(resp.id, Some(3));
        let error = resp.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "No node found");
    }

    #[test]
    fn test_event_has_no_id() {
        let resp: CdpResponse = serde_json::from_value(json!({
            "method": "Page.loadEventFired",
            "params": {},
            "sessionId": "S1"
        }))
        .unwrap();
        assert!(resp.id.is_none());
        assert_eq!(resp.method.as_deref(), Some("Page.loadEventFired"));
        assert_eq!(resp.session_id.as_deref(), Some("S1"));
    }

    #[test]
    fn test_browser_version_pascal_case() {
        let version: BrowserVersion = serde_json::from_value(json!({
            "Browser": "Chrome/131.0.0.0",
            "Protocol-Version": "1.3",
            "webSocketDebuggerUrl": "ws://localhost:9222/devtools/browser/abc"
        }))
        .unwrap();
        assert_eq!(version.browser, "Chrome/131.0.0.0");
        assert_eq!(version.protocol_version, "1.3");
        assert!(version.web_socket_debugger_url.starts_with("ws://"));
    }
}

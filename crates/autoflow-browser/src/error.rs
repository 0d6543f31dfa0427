//! CDP error types and their mapping onto the capability boundary.

use thiserror::Error;

use autoflow_protocols::SessionError;

/// Errors from the CDP client, launcher and sessions.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to the browser.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Browser not reachable at the debugging endpoint.
    #[error("Browser not available at {0}. Start Chrome with: chrome --remote-debugging-port=9222")]
    BrowserNotAvailable(String),

    /// No Chrome or Chromium executable on this machine.
    #[error("Chrome executable not found")]
    ChromeNotFound,

    /// The browser process could not be started.
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Error response from the protocol itself.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error during endpoint discovery.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Navigation failed.
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Element not found.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// JavaScript execution error.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// Timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Session closed.
    #[error("Session closed")]
    SessionClosed,

    /// Invalid response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}

impl From<CdpError> for SessionError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::ConnectionFailed(m)
            | CdpError::WebSocket(m)
            | CdpError::Http(m)
            | CdpError::BrowserNotAvailable(m) => SessionError::ConnectionFailed(m),
            CdpError::ChromeNotFound => SessionError::BrowserNotFound,
            CdpError::LaunchFailed(m) => SessionError::LaunchFailed(m),
            CdpError::NavigationFailed(m) => SessionError::NavigationFailed(m),
            CdpError::ElementNotFound(m) => SessionError::ElementNotFound(m),
            CdpError::JavaScript(m) => SessionError::JavaScript(m),
            CdpError::Timeout(m) => SessionError::Timeout(m),
            CdpError::SessionClosed => SessionError::SessionClosed,
            CdpError::InvalidResponse(m) => SessionError::InvalidResponse(m),
            CdpError::Protocol { code, message } => {
                SessionError::ActionFailed(format!("{message} (code: {code})"))
            }
            CdpError::Serialization(e) => SessionError::Serialization(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_to_session_errors() {
        let e: SessionError = CdpError::ElementNotFound("#missing".into()).into();
        assert!(matches!(e, SessionError::ElementNotFound(_)));

        let e: SessionError = CdpError::ChromeNotFound.into();
        assert!(matches!(e, SessionError::BrowserNotFound));

        let e: SessionError = CdpError::Protocol {
            code: -32000,
            message: "No node found".into(),
        }
        .into();
        assert!(e.to_string().contains("-32000"));
    }
}

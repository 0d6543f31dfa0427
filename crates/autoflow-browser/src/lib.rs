//! # AutoFlow Browser
//!
//! The production [`BrowserProvider`] implementation: Chrome DevTools
//! Protocol over WebSocket. Each acquired session gets its own isolated
//! browser context and page inside a shared browser process, which the
//! provider launches locally (headless) or reaches through a remote
//! debugging endpoint.
//!
//! [`BrowserProvider`]: autoflow_protocols::BrowserProvider

mod client;
mod error;
mod launcher;
mod protocol;
mod provider;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use provider::CdpBrowserProvider;
pub use session::CdpSession;

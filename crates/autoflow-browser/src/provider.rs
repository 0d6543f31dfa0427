//! The CDP [`BrowserProvider`]: one shared browser process, one isolated
//! context and page per acquired session.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use autoflow_protocols::{BrowserProvider, BrowserSession, SessionConfig, SessionError};

use crate::client::CdpClient;
use crate::error::CdpError;
use crate::launcher;
use crate::session::CdpSession;

struct Browser {
    client: Arc<CdpClient>,
    /// Present only when we launched the process ourselves. Remote
    /// endpoints are never killed.
    process: Option<Child>,
}

/// Lazily connects to a browser on first acquire; launched locally unless
/// the session config names a remote debugging endpoint.
#[derive(Default)]
pub struct CdpBrowserProvider {
    browser: Mutex<Option<Browser>>,
}

impl CdpBrowserProvider {
    pub fn new() -> Self {
        Self::default()
    }

    async fn ensure_connected(&self, config: &SessionConfig) -> Result<Arc<CdpClient>, CdpError> {
        let mut browser = self.browser.lock().await;
        if let Some(browser) = browser.as_ref() {
            return Ok(browser.client.clone());
        }

        let (client, process) = match &config.remote_endpoint {
            Some(endpoint) => {
                info!("Attaching to remote browser at {}", endpoint);
                (CdpClient::connect(endpoint).await?, None)
            }
            None => {
                let launched = launcher::launch(config.headless).await?;
                (
                    CdpClient::connect(&launched.endpoint).await?,
                    Some(launched.child),
                )
            }
        };

        let client = Arc::new(client);
        *browser = Some(Browser {
            client: client.clone(),
            process,
        });
        Ok(client)
    }
}

#[async_trait]
impl BrowserProvider for CdpBrowserProvider {
    async fn acquire(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn BrowserSession>, SessionError> {
        let client = self.ensure_connected(config).await?;

        let context_id = client.create_browser_context().await?;

        let session = async {
            let target_id = client.create_page(&context_id).await?;
            let session_id = client.attach(&target_id).await?;

            let session = CdpSession::new(
                client.clone(),
                target_id,
                context_id.clone(),
                session_id,
                config.timeout_ms,
            );
            session.enable_domains().await?;

            // A slightly different viewport per session.
            let (width, height) = {
                let mut rng = rand::thread_rng();
                (1280 + rng.gen_range(0..160), 720 + rng.gen_range(0..120))
            };
            session
                .call(
                    "Emulation.setDeviceMetricsOverride",
                    Some(json!({
                        "width": width,
                        "height": height,
                        "deviceScaleFactor": 1,
                        "mobile": false,
                    })),
                )
                .await?;

            debug!(width, height, "Session viewport set");
            Ok::<CdpSession, CdpError>(session)
        }
        .await;

        match session {
            Ok(session) => Ok(Arc::new(session)),
            Err(e) => {
                // Don't leak the context when page setup fails.
                if let Err(dispose) = client.dispose_context(&context_id).await {
                    warn!("Failed to dispose context {}: {}", context_id, dispose);
                }
                Err(e.into())
            }
        }
    }

    async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Some(mut browser) = browser.take() {
            if let Some(child) = browser.process.as_mut() {
                info!("Shutting down browser process");
                let _ = child.kill().await;
            }
        }
    }
}

//! Local Chrome discovery and launch.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use rand::Rng;
use tokio::process::{Child, Command};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::CdpError;

/// A locally launched browser process with its debugging endpoint.
pub(crate) struct LaunchedBrowser {
    pub child: Child,
    pub endpoint: String,
}

/// Find a Chrome or Chromium executable.
pub(crate) fn find_chrome() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    let paths = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    ];

    #[cfg(target_os = "linux")]
    let paths = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
    ];

    #[cfg(target_os = "windows")]
    let paths = [
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];

    paths.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Command-line arguments for an automation-friendly launch.
fn launch_args(port: u16, profile_dir: &std::path::Path, headless: bool) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={port}"),
        format!("--user-data-dir={}", profile_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-sync".to_string(),
        "--disable-translate".to_string(),
        "--metrics-recording-only".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }
    args
}

/// Launch a local browser and wait until its debugging endpoint answers.
pub(crate) async fn launch(headless: bool) -> Result<LaunchedBrowser, CdpError> {
    let chrome_path = find_chrome().ok_or(CdpError::ChromeNotFound)?;

    // Random port and a throwaway profile keep parallel launches apart.
    let port: u16 = rand::thread_rng().gen_range(9300..9900);
    let profile_dir =
        std::env::temp_dir().join(format!("autoflow-profile-{}", Uuid::new_v4().simple()));

    if let Err(e) = std::fs::create_dir_all(&profile_dir) {
        warn!("Failed to create profile directory: {}", e);
    }

    info!(
        "Launching {} on port {} with profile {}",
        chrome_path.display(),
        port,
        profile_dir.display()
    );

    let child = Command::new(&chrome_path)
        .args(launch_args(port, &profile_dir, headless))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CdpError::LaunchFailed(e.to_string()))?;

    let endpoint = format!("http://127.0.0.1:{port}");

    // Poll /json/version until the endpoint comes up.
    let version_url = format!("{endpoint}/json/version");
    for _ in 0..30 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        if reqwest::get(&version_url).await.is_ok() {
            info!("Browser ready at {}", endpoint);
            return Ok(LaunchedBrowser { child, endpoint });
        }
    }

    Err(CdpError::LaunchFailed(
        "Browser failed to start within timeout".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args_headless() {
        let args = launch_args(9333, std::path::Path::new("/tmp/p"), true);
        assert!(args.contains(&"--remote-debugging-port=9333".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--user-data-dir=")));
    }

    #[test]
    fn test_launch_args_headed() {
        let args = launch_args(9333, std::path::Path::new("/tmp/p"), false);
        assert!(!args.contains(&"--headless=new".to_string()));
    }

    #[test]
    fn test_find_chrome_does_not_panic() {
        let _ = find_chrome();
    }
}

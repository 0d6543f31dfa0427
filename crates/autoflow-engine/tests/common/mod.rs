//! In-memory browser fakes for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;

use autoflow_protocols::{
    BrowserProvider, BrowserSession, EngineError, ExecutionObserver, ExecutionProgress,
    ExtractedData, LogLevel, SessionConfig, SessionError, StepResult, WaitState,
};

/// Scripted page content shared by every session a provider hands out.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    /// selector -> text content of each match.
    pub texts: HashMap<String, Vec<String>>,
    /// "selector|attribute" -> attribute value.
    pub attributes: HashMap<String, String>,
    /// script -> evaluation result.
    pub eval_results: HashMap<String, Value>,
    /// Selectors whose interactions fail with ElementNotFound.
    pub fail_selectors: Vec<String>,
    pub fail_screenshot: bool,
}

/// One fake browser session. Records every capability call.
pub struct MockSession {
    script: PageScript,
    live: Arc<AtomicUsize>,
    closed: AtomicBool,
    pub actions: Mutex<Vec<String>>,
    pub cookies: Mutex<HashMap<String, String>>,
    pub storage: Mutex<HashMap<String, String>>,
}

impl MockSession {
    fn new(script: PageScript, live: Arc<AtomicUsize>) -> Self {
        Self {
            script,
            live,
            closed: AtomicBool::new(false),
            actions: Mutex::new(Vec::new()),
            cookies: Mutex::new(HashMap::new()),
            storage: Mutex::new(HashMap::new()),
        }
    }

    pub fn recorded(&self) -> Vec<String> {
        self.actions.lock().clone()
    }

    fn guard(&self) -> Result<(), SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::SessionClosed);
        }
        Ok(())
    }

    fn record(&self, action: String) {
        self.actions.lock().push(action);
    }

    fn interact(&self, verb: &str, selector: &str) -> Result<(), SessionError> {
        self.guard()?;
        if self.script.fail_selectors.iter().any(|s| s == selector) {
            return Err(SessionError::ElementNotFound(selector.to_string()));
        }
        self.record(format!("{verb}:{selector}"));
        Ok(())
    }

    fn texts_for(&self, selector: &str) -> Vec<String> {
        self.script.texts.get(selector).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.guard()?;
        self.record(format!("navigate:{url}"));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        self.interact("click", selector)
    }

    async fn right_click(&self, selector: &str) -> Result<(), SessionError> {
        self.interact("right_click", selector)
    }

    async fn double_click(&self, selector: &str) -> Result<(), SessionError> {
        self.interact("double_click", selector)
    }

    async fn hover(&self, selector: &str) -> Result<(), SessionError> {
        self.interact("hover", selector)
    }

    async fn drag_and_drop(&self, source: &str, target: &str) -> Result<(), SessionError> {
        self.interact("drag", source)?;
        self.interact("drop", target)
    }

    async fn scroll_by(&self, x: f64, y: f64) -> Result<(), SessionError> {
        self.guard()?;
        self.record(format!("scroll_by:{x},{y}"));
        Ok(())
    }

    async fn scroll_to(&self, selector: &str) -> Result<(), SessionError> {
        self.interact("scroll_to", selector)
    }

    async fn focus(&self, selector: &str) -> Result<(), SessionError> {
        self.interact("focus", selector)
    }

    async fn clear(&self, selector: &str) -> Result<(), SessionError> {
        self.interact("clear", selector)
    }

    async fn insert_text(&self, text: &str) -> Result<(), SessionError> {
        self.guard()?;
        self.record(format!("type:{text}"));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), SessionError> {
        self.guard()?;
        self.record(format!("press_key:{key}"));
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool, SessionError> {
        self.guard()?;
        Ok(self.script.texts.contains_key(selector))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, SessionError> {
        self.exists(selector).await
    }

    async fn count(&self, selector: &str) -> Result<usize, SessionError> {
        self.guard()?;
        Ok(self.texts_for(selector).len())
    }

    async fn get_text(&self, selector: &str) -> Result<String, SessionError> {
        self.guard()?;
        self.texts_for(selector)
            .first()
            .cloned()
            .ok_or_else(|| SessionError::ElementNotFound(selector.to_string()))
    }

    async fn get_texts(&self, selector: &str) -> Result<Vec<String>, SessionError> {
        self.guard()?;
        Ok(self.texts_for(selector))
    }

    async fn get_htmls(&self, selector: &str) -> Result<Vec<String>, SessionError> {
        self.guard()?;
        Ok(self
            .texts_for(selector)
            .into_iter()
            .map(|t| format!("<span>{t}</span>"))
            .collect())
    }

    async fn get_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        self.guard()?;
        if !self.script.texts.contains_key(selector) {
            return Err(SessionError::ElementNotFound(selector.to_string()));
        }
        Ok(self.script.attributes.get(&format!("{selector}|{name}")).cloned())
    }

    async fn get_attributes(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Vec<Option<String>>, SessionError> {
        self.guard()?;
        let attr = self.script.attributes.get(&format!("{selector}|{name}")).cloned();
        Ok(vec![attr; self.texts_for(selector).len()])
    }

    async fn wait_for(
        &self,
        selector: &str,
        state: WaitState,
        _timeout_ms: u64,
    ) -> Result<(), SessionError> {
        self.guard()?;
        self.record(format!("wait_for:{selector}"));
        let present = self.script.texts.contains_key(selector);
        let satisfied = match state {
            WaitState::Hidden => !present,
            _ => present,
        };
        if satisfied {
            Ok(())
        } else {
            Err(SessionError::Timeout(format!(
                "Waiting for selector '{selector}' timed out"
            )))
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, SessionError> {
        self.guard()?;
        self.record(format!("evaluate:{script}"));
        Ok(self
            .script
            .eval_results
            .get(script)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn set_cookie(
        &self,
        name: &str,
        value: &str,
        _domain: Option<&str>,
    ) -> Result<(), SessionError> {
        self.guard()?;
        self.cookies.lock().insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn get_cookie(&self, name: &str) -> Result<Option<String>, SessionError> {
        self.guard()?;
        Ok(self.cookies.lock().get(name).cloned())
    }

    async fn set_local_storage(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.guard()?;
        self.storage.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_local_storage(&self, key: &str) -> Result<Option<String>, SessionError> {
        self.guard()?;
        Ok(self.storage.lock().get(key).cloned())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        self.interact("select", selector)?;
        self.record(format!("select_value:{value}"));
        Ok(())
    }

    async fn screenshot(&self, _full_page: bool) -> Result<Bytes, SessionError> {
        self.guard()?;
        if self.script.fail_screenshot {
            return Err(SessionError::ActionFailed("screenshot unavailable".into()));
        }
        Ok(Bytes::from_static(b"\x89PNG-fake"))
    }

    async fn download(&self, url: &str) -> Result<Bytes, SessionError> {
        self.guard()?;
        self.record(format!("download:{url}"));
        Ok(Bytes::from_static(b"file-contents"))
    }

    async fn close(&self) -> Result<(), SessionError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Fake provider tracking live and peak session counts.
#[derive(Default)]
pub struct MockProvider {
    pub script: PageScript,
    pub fail_acquire: bool,
    pub live: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
    pub acquired: AtomicUsize,
    pub sessions: Mutex<Vec<Arc<MockSession>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: PageScript) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn peak_count(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Actions recorded by the n-th session handed out.
    pub fn session(&self, index: usize) -> Arc<MockSession> {
        self.sessions.lock()[index].clone()
    }
}

#[async_trait]
impl BrowserProvider for MockProvider {
    async fn acquire(
        &self,
        _config: &SessionConfig,
    ) -> Result<Arc<dyn BrowserSession>, SessionError> {
        if self.fail_acquire {
            return Err(SessionError::ConnectionFailed("no browser available".into()));
        }

        self.acquired.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(live, Ordering::SeqCst);

        let session = Arc::new(MockSession::new(self.script.clone(), self.live.clone()));
        self.sessions.lock().push(session.clone());
        Ok(session)
    }
}

/// Observer that records every event it receives.
#[derive(Default)]
pub struct RecordingObserver {
    pub progress: Mutex<Vec<ExecutionProgress>>,
    pub logs: Mutex<Vec<(LogLevel, String, Option<String>)>>,
    pub completed_steps: Mutex<Vec<(String, StepResult)>>,
    pub errors: Mutex<Vec<(String, Option<String>)>>,
    pub completions: Mutex<Vec<ExtractedData>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn percentages(&self) -> Vec<u8> {
        self.progress.lock().iter().map(|p| p.percentage).collect()
    }
}

#[async_trait]
impl ExecutionObserver for RecordingObserver {
    async fn on_progress(&self, progress: &ExecutionProgress) {
        self.progress.lock().push(progress.clone());
    }

    async fn on_log(&self, level: LogLevel, message: &str, step_id: Option<&str>) {
        self.logs
            .lock()
            .push((level, message.to_string(), step_id.map(str::to_string)));
    }

    async fn on_step_complete(&self, step_id: &str, result: &StepResult) {
        self.completed_steps
            .lock()
            .push((step_id.to_string(), result.clone()));
    }

    async fn on_error(&self, error: &EngineError, step_id: Option<&str>) {
        self.errors
            .lock()
            .push((error.to_string(), step_id.map(str::to_string)));
    }

    async fn on_complete(&self, extracted: &ExtractedData) {
        self.completions.lock().push(extracted.clone());
    }
}

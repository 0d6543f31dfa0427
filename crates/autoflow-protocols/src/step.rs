//! Workflow step model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One declarative operation in a workflow.
///
/// Steps are immutable as authored; the engine produces a per-execution
/// resolved copy of `config` during variable substitution and never mutates
/// the original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique id within a definition.
    pub id: String,

    /// Operation kind, e.g. `"navigate"` or `"extract"`.
    ///
    /// Kept as a string at the boundary so unknown kinds deserialize fine
    /// and fail at dispatch time with an explicit error instead of a parse
    /// crash.
    #[serde(rename = "type")]
    pub kind: String,

    /// Operation parameters. Required fields are validated per kind by the
    /// operation handler.
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Step {
    /// Create a step with an empty config.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            config: Map::new(),
        }
    }

    /// Create a step with the given config.
    pub fn with_config(
        id: impl Into<String>,
        kind: impl Into<String>,
        config: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            config,
        }
    }
}

/// An ordered sequence of steps. Order is the execution order; there is no
/// implicit parallelism within a definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub steps: Vec<Step>,
}

impl WorkflowDefinition {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Supported operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Navigate,
    Click,
    Fill,
    Extract,
    Wait,
    Screenshot,
    Scroll,
    Hover,
    PressKey,
    ExecuteJs,
    SetVariable,
    ExtractToVariable,
    Conditional,
    Loop,
    DownloadFile,
    DragDrop,
    SetCookie,
    GetCookie,
    SetLocalstorage,
    GetLocalstorage,
    SelectDropdown,
    RightClick,
    DoubleClick,
}

impl StepKind {
    /// Parse a kind string. Returns `None` for unknown kinds; the engine
    /// turns that into a failed step result rather than a crash.
    pub fn parse(kind: &str) -> Option<Self> {
        let kind = match kind {
            "navigate" => Self::Navigate,
            "click" => Self::Click,
            "fill" => Self::Fill,
            "extract" => Self::Extract,
            "wait" => Self::Wait,
            "screenshot" => Self::Screenshot,
            "scroll" => Self::Scroll,
            "hover" => Self::Hover,
            "press_key" => Self::PressKey,
            "execute_js" => Self::ExecuteJs,
            "set_variable" => Self::SetVariable,
            "extract_to_variable" => Self::ExtractToVariable,
            "conditional" => Self::Conditional,
            "loop" => Self::Loop,
            "download_file" => Self::DownloadFile,
            "drag_drop" => Self::DragDrop,
            "set_cookie" => Self::SetCookie,
            "get_cookie" => Self::GetCookie,
            "set_localstorage" => Self::SetLocalstorage,
            "get_localstorage" => Self::GetLocalstorage,
            "select_dropdown" => Self::SelectDropdown,
            "right_click" => Self::RightClick,
            "double_click" => Self::DoubleClick,
            _ => return None,
        };
        Some(kind)
    }

    /// The canonical kind string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Click => "click",
            Self::Fill => "fill",
            Self::Extract => "extract",
            Self::Wait => "wait",
            Self::Screenshot => "screenshot",
            Self::Scroll => "scroll",
            Self::Hover => "hover",
            Self::PressKey => "press_key",
            Self::ExecuteJs => "execute_js",
            Self::SetVariable => "set_variable",
            Self::ExtractToVariable => "extract_to_variable",
            Self::Conditional => "conditional",
            Self::Loop => "loop",
            Self::DownloadFile => "download_file",
            Self::DragDrop => "drag_drop",
            Self::SetCookie => "set_cookie",
            Self::GetCookie => "get_cookie",
            Self::SetLocalstorage => "set_localstorage",
            Self::GetLocalstorage => "get_localstorage",
            Self::SelectDropdown => "select_dropdown",
            Self::RightClick => "right_click",
            Self::DoubleClick => "double_click",
        }
    }

    /// All supported kinds, in catalog order.
    pub fn all() -> &'static [StepKind] {
        &[
            Self::Navigate,
            Self::Click,
            Self::Fill,
            Self::Extract,
            Self::Wait,
            Self::Screenshot,
            Self::Scroll,
            Self::Hover,
            Self::PressKey,
            Self::ExecuteJs,
            Self::SetVariable,
            Self::ExtractToVariable,
            Self::Conditional,
            Self::Loop,
            Self::DownloadFile,
            Self::DragDrop,
            Self::SetCookie,
            Self::GetCookie,
            Self::SetLocalstorage,
            Self::GetLocalstorage,
            Self::SelectDropdown,
            Self::RightClick,
            Self::DoubleClick,
        ]
    }
}

//! # AutoFlow Protocols
//!
//! Core protocol definitions (types and traits) for the AutoFlow workflow
//! engine. Contains only interface definitions - no implementations.
//!
//! ## Core Traits
//!
//! - [`BrowserSession`] - Page-level browser capability primitives
//! - [`BrowserProvider`] - Acquires one browser session per workflow run
//! - [`ExecutionObserver`] - Optional telemetry hooks awaited by the engine

pub mod error;
pub mod observer;
pub mod result;
pub mod session;
pub mod step;
pub mod types;

pub use error::{EngineError, SessionError};
pub use observer::{ExecutionObserver, NoopObserver};
pub use result::StepResult;
pub use session::{BrowserProvider, BrowserSession, SessionConfig, WaitState};
pub use step::{Step, StepKind, WorkflowDefinition};
pub use types::{ExecutionContext, ExecutionProgress, ExtractedData, LogLevel};

//! # AutoFlow Engine
//!
//! The workflow step interpreter. Executes a [`WorkflowDefinition`] against
//! a browser capability provider: resolves `${name}` variable templates,
//! dispatches the operation catalog, enforces per-run resource lifecycle
//! and process-wide concurrency bounds, fails fast on the first step
//! failure, and reports telemetry through an [`ExecutionObserver`].
//!
//! ```rust,ignore
//! let engine = WorkflowEngine::new(EngineConfig::default(), provider);
//! let data = engine.execute(context).await?;
//! ```
//!
//! [`WorkflowDefinition`]: autoflow_protocols::WorkflowDefinition
//! [`ExecutionObserver`]: autoflow_protocols::ExecutionObserver

pub mod config;
pub mod engine;
mod ops;
pub mod pacing;
pub mod registry;
pub mod slots;
pub mod variables;

pub use config::{DelayRange, EngineConfig};
pub use engine::WorkflowEngine;
pub use pacing::{DelaySource, NoDelay, Pacing, UniformDelay};
pub use registry::SessionRegistry;
pub use slots::{SlotManager, SlotPermit};
pub use variables::{resolve_config, resolve_value};

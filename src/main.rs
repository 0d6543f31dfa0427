//! AutoFlow - browser-automation workflow runner.
//!
//! Main entry point for the AutoFlow CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use autoflow_browser::CdpBrowserProvider;
use autoflow_engine::{EngineConfig, WorkflowEngine};
use autoflow_protocols::{
    EngineError, ExecutionContext, ExecutionObserver, ExecutionProgress, LogLevel, StepKind,
    StepResult, WorkflowDefinition,
};

/// AutoFlow CLI.
#[derive(Parser)]
#[command(name = "autoflow")]
#[command(about = "Browser-automation workflow runner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow definition against a browser
    Run {
        /// Path to the workflow definition (JSON)
        workflow: PathBuf,

        /// Initial variable binding, repeatable (name=value)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// Show the browser window instead of running headless
        #[arg(long)]
        headed: bool,

        /// Attach to a remote debugging endpoint instead of launching
        #[arg(long, env = "AUTOFLOW_REMOTE_ENDPOINT")]
        remote_endpoint: Option<String>,

        /// Per-operation timeout in milliseconds
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,

        /// Skip the failure screenshot
        #[arg(long)]
        no_screenshot: bool,
    },

    /// List the supported step kinds
    Kinds,
}

/// Forwards run telemetry to the tracing subscriber.
struct TracingObserver;

#[async_trait]
impl ExecutionObserver for TracingObserver {
    async fn on_progress(&self, progress: &ExecutionProgress) {
        info!(
            step = progress.current_step,
            total = progress.total_steps,
            percent = progress.percentage,
            eta_ms = progress.estimated_remaining_ms,
            "Progress"
        );
    }

    async fn on_log(&self, level: LogLevel, message: &str, step_id: Option<&str>) {
        match level {
            LogLevel::Info => info!(step_id, "{}", message),
            LogLevel::Warn => warn!(step_id, "{}", message),
            LogLevel::Error => error!(step_id, "{}", message),
        }
    }

    async fn on_step_complete(&self, step_id: &str, _result: &StepResult) {
        info!(step_id, "Step complete");
    }

    async fn on_error(&self, error: &EngineError, step_id: Option<&str>) {
        error!(step_id, "{}", error);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            workflow,
            vars,
            headed,
            remote_endpoint,
            timeout_ms,
            no_screenshot,
        } => {
            run_workflow(
                workflow,
                vars,
                headed,
                remote_endpoint,
                timeout_ms,
                no_screenshot,
            )
            .await
        }
        Commands::Kinds => {
            for kind in StepKind::all() {
                println!("{}", kind.as_str());
            }
            Ok(())
        }
    }
}

async fn run_workflow(
    workflow: PathBuf,
    vars: Vec<String>,
    headed: bool,
    remote_endpoint: Option<String>,
    timeout_ms: u64,
    no_screenshot: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&workflow)
        .with_context(|| format!("Failed to read {}", workflow.display()))?;
    let definition: WorkflowDefinition = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid workflow definition in {}", workflow.display()))?;

    if definition.is_empty() {
        bail!("Workflow has no steps");
    }

    let mut variables = Map::new();
    for var in &vars {
        let (name, value) = parse_var(var)?;
        variables.insert(name, value);
    }

    let config = EngineConfig {
        headless: !headed,
        timeout_ms,
        screenshot_on_error: !no_screenshot,
        remote_endpoint,
        ..EngineConfig::default()
    };

    let provider = Arc::new(CdpBrowserProvider::new());
    let engine = WorkflowEngine::new(config, provider);

    let context = ExecutionContext::new(
        uuid::Uuid::new_v4().to_string(),
        workflow.display().to_string(),
        "cli",
        definition,
    )
    .with_variables(variables);

    info!(
        workflow = %workflow.display(),
        steps = context.definition.len(),
        "Starting workflow"
    );

    let result = engine
        .execute_observed(context, Arc::new(TracingObserver))
        .await;
    engine.shutdown().await;

    match result {
        Ok(extracted) => {
            println!("{}", serde_json::to_string_pretty(&Value::Object(extracted))?);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Split a `name=value` binding. Values stay strings; templates coerce on
/// use.
fn parse_var(raw: &str) -> anyhow::Result<(String, Value)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => {
            Ok((name.to_string(), Value::String(value.to_string())))
        }
        _ => bail!("Invalid variable binding '{raw}', expected name=value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var() {
        let (name, value) = parse_var("x=5").unwrap();
        assert_eq!(name, "x");
        assert_eq!(value, Value::String("5".to_string()));

        let (_, value) = parse_var("url=https://a.com?q=1").unwrap();
        assert_eq!(value, "https://a.com?q=1");

        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }
}

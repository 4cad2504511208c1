//! Process command implementation
//!
//! This module implements the `process` command, which runs one skip-lot
//! invocation for a single sample the way the host would trigger it.

use crate::adapters::store::create_ports;
use crate::config::load_config;
use crate::core::skiplot::{ExecuteParameters, InvocationOutcome, InvocationReport, SkipLotEngine};
use clap::{ArgGroup, Args};
use serde_json::Value;

/// Arguments for the process command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["sample_id", "content"])))]
pub struct ProcessArgs {
    /// Id of the sample to process
    #[arg(long)]
    pub sample_id: Option<i64>,

    /// Raw invocation content, e.g. '{"SampleId": 1201}'
    #[arg(long)]
    pub content: Option<String>,

    /// Task options as JSON; overrides the [task] table of the configuration
    #[arg(long)]
    pub task_config: Option<String>,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl ProcessArgs {
    /// Execute the process command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting process command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let task = match self.task_options(config.task.as_ref()) {
            Ok(task) => task,
            Err(message) => {
                eprintln!("{message}");
                return Ok(2);
            }
        };

        let content = match self.invocation_content() {
            Ok(content) => content,
            Err(message) => {
                eprintln!("{message}");
                return Ok(2);
            }
        };

        let ports = match create_ports(&config).await {
            Ok(ports) => ports,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create store");
                eprintln!("Failed to initialize store: {e}");
                return Ok(if e.is_configuration() { 2 } else { 5 });
            }
        };

        let engine = SkipLotEngine::new(ports);
        let report = engine.execute(ExecuteParameters::new(content, task)).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report.outcome)?);
        } else {
            print_report(&report);
        }

        Ok(report.exit_code())
    }

    fn task_options(&self, from_file: Option<&Value>) -> Result<Value, String> {
        match (&self.task_config, from_file) {
            (Some(raw), _) => serde_json::from_str(raw)
                .map_err(|e| format!("--task-config is not valid JSON: {e}")),
            (None, Some(task)) => Ok(task.clone()),
            (None, None) => Err(
                "No task options: pass --task-config or add a [task] table to the configuration"
                    .to_string(),
            ),
        }
    }

    fn invocation_content(&self) -> Result<Value, String> {
        match (self.sample_id, &self.content) {
            (Some(sample_id), _) => Ok(serde_json::json!({ "SampleId": sample_id })),
            (None, Some(raw)) => {
                serde_json::from_str(raw).map_err(|e| format!("--content is not valid JSON: {e}"))
            }
            (None, None) => Err("Either --sample-id or --content is required".to_string()),
        }
    }
}

fn print_report(report: &InvocationReport) {
    println!();
    println!("📊 Invocation Summary:");
    println!("  Outcome: {}", report.outcome);
    if let Some(work_unit_id) = report.outcome.work_unit_id() {
        println!("  Aggregate: {work_unit_id}");
    }
    match &report.outcome {
        InvocationOutcome::Advanced { identification, .. } => {
            println!("  New identification: {identification}");
        }
        InvocationOutcome::AdvancementFailed { reasons, .. } => {
            println!("  Advancement refused:");
            for reason in reasons {
                println!("    - {reason}");
            }
        }
        InvocationOutcome::Failed { action, error, .. } => {
            println!("  Failed action: {}", action.as_deref().unwrap_or("-"));
            println!("  Error: {error}");
        }
        _ => {}
    }
    println!("  Audit level: {}", report.audit.level);
    if !report.audit_recorded {
        println!("  ⚠️  Audit entry could not be recorded");
    }
    println!("  Duration: {:.3}s", report.duration.as_secs_f64());
    println!();
}

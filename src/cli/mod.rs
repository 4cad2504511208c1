//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for skiplot using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Skiplot - Skip-lot batching engine for LIMS samples
#[derive(Parser, Debug)]
#[command(name = "skiplot")]
#[command(version, about, long_about = None)]
#[command(author = "Skiplot Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "skiplot.toml", env = "SKIPLOT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SKIPLOT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the skip-lot task for one sample
    Process(commands::process::ProcessArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

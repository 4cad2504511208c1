//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "skiplot.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing skiplot configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Set store_target to 'postgresql' or 'memory'");
                println!("  3. Create a .env file with your credentials:");
                println!("     - Set SKIPLOT_PG_URL (if using PostgreSQL)");
                println!("     - Set SKIPLOT_LIMS_TOKEN for the LIMS API");
                println!("  4. Fill in the [task] table or pass --task-config");
                println!("  5. Validate configuration: skiplot validate-config");
                println!("  6. Process a sample: skiplot process --sample-id <id>");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Skiplot Configuration File
# Skip-lot batching engine for LIMS samples

# Store target (postgresql or memory)
store_target = "postgresql"  # postgresql | memory

[application]
log_level = "info"

[postgresql]
connection_string = "${SKIPLOT_PG_URL}"
max_connections = 10
connection_timeout_seconds = 30
statement_timeout_seconds = 60
ssl_mode = "require"

[lims]
base_url = "https://lims.example.com/api/v3"
auth_type = "bearer"
token = "${SKIPLOT_LIMS_TOKEN}"
timeout_seconds = 30

# [memory]
# fixture_path = "fixtures/lims.json"
# persist = true

[task]
EquivalencyId = 3
SkipLoteSampleQty = 5
WorkFinalSetpId = 40
WorkInitialSetpId = 10
WorkMasterId = 2
SampleIdentification = "SKIP-"

[logging]
local_enabled = true
local_path = "/var/log/skiplot"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Skiplot Configuration File
# Skip-lot batching engine for LIMS samples
#
# This file contains all configuration options with examples and explanations.
#
# Skiplot supports two store targets:
#   - PostgreSQL: the host LIMS database, plus the LIMS API for workflow operations
#   - Memory: a JSON fixture, for offline simulation and tests

# ============================================================================
# Store Target Selection
# ============================================================================
store_target = "postgresql"  # postgresql | memory

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# PostgreSQL
# ============================================================================
[postgresql]
# Connection string format: postgresql://[user[:password]@][host][:port][/dbname]
connection_string = "${SKIPLOT_PG_URL}"

# Connection pool settings
max_connections = 10                # 2-100, one connection is pinned per held batch lock
connection_timeout_seconds = 30     # Timeout for acquiring connection
statement_timeout_seconds = 60      # Timeout for SQL statement execution

# SSL/TLS mode: disable | prefer | require
ssl_mode = "require"

# Reference schema for development databases:
#   psql -d lims -f migrations/001_initial_schema.sql

# ============================================================================
# LIMS Business API
# ============================================================================
[lims]
# Base URL of the host API
base_url = "https://lims.example.com/api/v3"

# Authentication type: basic | bearer | none
auth_type = "bearer"
token = "${SKIPLOT_LIMS_TOKEN}"
# username = "${SKIPLOT_LIMS_USERNAME}"
# password = "${SKIPLOT_LIMS_PASSWORD}"

# Request timeout in seconds
timeout_seconds = 30

# Retry policy for connection errors, timeouts and 5xx responses
[lims.retry]
max_retries = 3
initial_delay_ms = 500
max_delay_ms = 10000
backoff_multiplier = 2.0

# ============================================================================
# Memory Store
# ============================================================================
# Uncomment this section if using store_target = "memory"
#
# [memory]
# # JSON fixture with samples, equivalencies, work units and recipients
# fixture_path = "fixtures/lims.json"
#
# # Write the store back to the fixture after every invocation
# persist = true

# ============================================================================
# Task Options
# ============================================================================
# Same keys the host passes to the task. Can be overridden per run with
# `skiplot process --task-config '<json>'`.
[task]
# Equivalency whose sample types are batched
EquivalencyId = 3

# Number of samples that closes a batch (must be greater than 1)
SkipLoteSampleQty = 5

# Step the aggregate is moved to when the batch is complete
WorkFinalSetpId = 40

# Step new aggregates start at
WorkInitialSetpId = 10

# Master classification of the aggregates
WorkMasterId = 2

# Prefix added to the identification of the sample that completes a batch
SampleIdentification = "SKIP-"

# Mailing-list notifications; leave MailingListId out to post on the sample thread
# MailingListId = 8
# MailFrom = "lims@example.com"
# MessageTypeId = 1

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local file logging (JSON lines)
local_enabled = true

# Local log directory
local_path = "/var/log/skiplot"

# Log rotation (daily, hourly, never)
local_rotation = "daily"
"#
        .to_string()
    }
}

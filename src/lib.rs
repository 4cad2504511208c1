// Skiplot - Skip-lot batching engine for LIMS sample workflows
// Copyright (c) 2025 Skiplot Contributors
// Licensed under the MIT License

//! # Skiplot - Skip-lot batching for LIMS samples
//!
//! Skiplot decides, for a single newly received laboratory sample, whether it takes
//! part in a skip-lot scheme, gathers it into an aggregate work unit with the other
//! samples of its type, and once the configured quota is reached moves that
//! aggregate to its final workflow step, relabels the sample, requests the analyses
//! of its analysis group and notifies the people involved.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]): Core types, identifiers, audit entries and errors
//! - **Configuration** ([`config`]): TOML application file and the host's task options
//! - **Adapters** ([`adapters`]): PostgreSQL store, LIMS API client, in-memory store
//! - **Core Logic** ([`core`]): The skip-lot engine and its components
//! - **CLI** ([`cli`]): Command-line interface
//! - **Logging** ([`logging`]): Structured logging with tracing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skiplot::adapters::memory::{MemoryFixture, MemoryStore};
//! use skiplot::core::skiplot::{ExecuteParameters, SkipLotEngine};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new(MemoryFixture::load("fixtures/lims.json")?));
//! let engine = SkipLotEngine::new(store.into_ports());
//!
//! let report = engine
//!     .execute(ExecuteParameters::new(
//!         json!({"SampleId": 1201}),
//!         json!({
//!             "EquivalencyId": 3,
//!             "SkipLoteSampleQty": 5,
//!             "WorkFinalSetpId": 40,
//!             "WorkInitialSetpId": 10,
//!             "WorkMasterId": 2,
//!             "SampleIdentification": "SKIP-"
//!         }),
//!     ))
//!     .await;
//!
//! println!("{}: {}", report.outcome, report.audit.friendly_message);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::Result`]. The engine itself never
//! fails: errors become a `Failed` outcome and an error-level audit entry naming the
//! action that was running and the full cause chain.
//!
//! ## Logging
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(sample_id = 1201, "Processing sample");
//! warn!(work_unit_id = 77, "Aggregate advancement refused");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

//! Configuration management for skiplot.
//!
//! Two kinds of configuration exist:
//!
//! - The application file (`skiplot.toml`): store target, connections, logging.
//!   Loaded by [`load_config`] with `${VAR}` substitution, `SKIPLOT_*` environment
//!   overrides and validation.
//! - The task options ([`TaskOptions`]): the host's PascalCase JSON block handed to
//!   every invocation. A default block may live in the `[task]` table of the file.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use skiplot::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("skiplot.toml")?;
//! println!("Store target: {:?}", config.store_target);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! store_target = "postgresql"
//!
//! [application]
//! log_level = "info"
//!
//! [postgresql]
//! connection_string = "${SKIPLOT_PG_URL}"
//!
//! [lims]
//! base_url = "https://lims.example.com/api/v3"
//! auth_type = "bearer"
//! token = "${SKIPLOT_LIMS_TOKEN}"
//!
//! [task]
//! EquivalencyId = 3
//! SkipLoteSampleQty = 5
//! WorkFinalSetpId = 40
//! WorkInitialSetpId = 10
//! WorkMasterId = 2
//! SampleIdentification = "SKIP-"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;
pub mod task;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, LimsApiConfig, LoggingConfig, MemoryStoreConfig, PostgreSQLConfig,
    RetryConfig, SkipLotConfig, StoreTarget,
};
pub use secret::{secret_string, SecretString, SecretValue};
pub use task::{NotificationMode, RawTaskOptions, TaskOptions};

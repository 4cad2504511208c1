//! Core business logic for skiplot.
//!
//! # Modules
//!
//! - [`skiplot`] - Skip-lot batching engine and its components
//!
//! # Invocation Workflow
//!
//! 1. **Load Parameters**: Validate the task options and read the sample id
//! 2. **Check Reception**: Unreceived samples end the invocation untouched
//! 3. **Resolve Eligibility**: Is the sample type batched under the equivalency?
//! 4. **Lock Batch**: Serialize invocations on the same master and sample type
//! 5. **Place Sample**: Attach, create a new aggregate, or advance a full one
//! 6. **Follow Up**: Notify, relabel and propagate analyses after an advancement
//! 7. **Audit**: Record exactly one entry with the action trace
//!
//! # Example
//!
//! ```rust,no_run
//! use skiplot::adapters::store::create_ports;
//! use skiplot::config::load_config;
//! use skiplot::core::skiplot::{ExecuteParameters, SkipLotEngine};
//! use skiplot::domain::SampleId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("skiplot.toml")?;
//! let ports = create_ports(&config).await?;
//! let engine = SkipLotEngine::new(ports);
//!
//! let task = config.task.clone().unwrap_or_default();
//! let report = engine
//!     .execute(ExecuteParameters::for_sample(SampleId::new(1201)?, task))
//!     .await;
//!
//! println!("Outcome: {}", report.outcome);
//! # Ok(())
//! # }
//! ```

pub mod skiplot;

//! External system integrations for skiplot.
//!
//! This module provides adapters for the host LIMS:
//!
//! - [`store`] - Capability traits, the [`LimsPorts`](store::LimsPorts) bundle and its factory
//! - [`postgresql`] - PostgreSQL implementation of the store traits and audit sink
//! - [`lims`] - HTTP client for the host's workflow and analysis endpoints
//! - [`memory`] - In-process implementation over a JSON fixture
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with the in-memory implementation. The engine only sees the
//! trait objects in [`LimsPorts`](store::LimsPorts).
//!
//! # LIMS API Adapter
//!
//! ```rust,no_run
//! use skiplot::adapters::lims::LimsApiClient;
//! use skiplot::config::{secret_string, LimsApiConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LimsApiConfig {
//!     base_url: "https://lims.example.com/api/v3".to_string(),
//!     auth_type: "bearer".to_string(),
//!     token: Some(secret_string("token".to_string())),
//!     ..Default::default()
//! };
//!
//! let client = LimsApiClient::new(config)?;
//! # Ok(())
//! # }
//! ```
//!
//! # In-Memory Adapter
//!
//! ```rust,no_run
//! use skiplot::adapters::memory::MemoryStore;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::from_file("fixtures/lims.json", false)?);
//! let ports = store.into_ports();
//! # Ok(())
//! # }
//! ```

pub mod lims;
pub mod memory;
pub mod postgresql;
pub mod store;

//! PostgreSQL integration
//!
//! Reads and writes the host LIMS tables described in
//! `migrations/001_initial_schema.sql`. Workflow transitions and analysis
//! enrichment are not implemented here; they go through [`crate::adapters::lims`].

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use models::{
    PostgreSQLEquivalencySampleType, PostgreSQLRecipient, PostgreSQLSample, PostgreSQLWorkUnit,
};

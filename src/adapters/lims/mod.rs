//! LIMS business API integration
//!
//! Implements [`WorkflowTransitioner`](crate::adapters::store::WorkflowTransitioner)
//! and [`AnalysisEnricher`](crate::adapters::store::AnalysisEnricher) over HTTP.
//!
//! | Operation | Request |
//! |---|---|
//! | transition data | `GET works/{id}/workflow/next-step-data?stepToId={step}` |
//! | transition | `POST works/{id}/workflow/next-step` with `{"StepToId", "Data"}` |
//! | enrichment | `POST samples/{id}/analyses/by-analysis-group/{group}` |
//!
//! Only the transition-data request is retried; both POSTs are sent exactly once.

pub mod client;

pub use client::LimsApiClient;

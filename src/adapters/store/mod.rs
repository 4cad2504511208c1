//! Store abstraction
//!
//! The engine never talks to a concrete backend. It receives a [`LimsPorts`] bundle
//! built by [`create_ports`] from the configured store target.

pub mod factory;
pub mod traits;

pub use factory::create_ports;
pub use traits::{
    AggregateRepository, AnalysisEnricher, AuditSink, EquivalencyRepository, MessageSender,
    SampleRepository, WorkflowTransitioner,
};

use std::sync::Arc;

/// Everything one engine instance needs from the host
#[derive(Clone)]
pub struct LimsPorts {
    pub samples: Arc<dyn SampleRepository>,
    pub equivalencies: Arc<dyn EquivalencyRepository>,
    pub aggregates: Arc<dyn AggregateRepository>,
    pub workflow: Arc<dyn WorkflowTransitioner>,
    pub analyses: Arc<dyn AnalysisEnricher>,
    pub messages: Arc<dyn MessageSender>,
    pub audit: Arc<dyn AuditSink>,
}

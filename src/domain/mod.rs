//! Domain models and types for skiplot.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`SampleId`], [`WorkUnitId`], [`WorkflowStepId`], ...)
//! - **LIMS records** ([`Sample`], [`WorkUnit`], [`EquivalencySampleType`], notification records)
//! - **Audit entries** ([`AuditEntry`], [`AuditLevel`])
//! - **Error types** ([`SkipLotError`], [`StoreError`], [`LimsApiError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Every record kind has its own integer newtype:
//!
//! ```rust
//! use skiplot::domain::{SampleId, WorkUnitId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sample_id = SampleId::new(1201)?;
//! let work_unit_id = WorkUnitId::new(77)?;
//!
//! // This won't compile - type safety prevents mixing IDs
//! // let wrong: SampleId = work_unit_id;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod errors;
pub mod ids;
pub mod message;
pub mod result;
pub mod sample;
pub mod work;

// Re-export commonly used types for convenience
pub use audit::{AuditEntry, AuditLevel};
pub use errors::{cause_chain, render_chain, LimsApiError, SkipLotError, StoreError};
pub use ids::{
    AccountId, AnalysisGroupId, EquivalencyId, FileId, MailingListId, MessageId, MessageTypeId,
    SampleId, SampleTypeId, WorkMasterId, WorkUnitId, WorkflowStepId,
};
pub use message::{MailingListRecipient, MessageRecipient, NewFile, NewMessage, SampleThreadMessage};
pub use result::Result;
pub use sample::{Equivalency, EquivalencySampleType, Sample, SampleType};
pub use work::{BatchKey, NewWorkUnit, TransitionData, TransitionResult, WorkSample, WorkUnit};

//! Invocation outcome and report
//!
//! The report is what the CLI prints and what tests assert on; the audit entry it
//! carries is what the host sees.

use crate::domain::ids::{SampleId, WorkUnitId};
use crate::domain::AuditEntry;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// What a single invocation did with its sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// The content carried no sample id
    NoSample,

    /// The sample has not been received yet
    NotReceived { sample_id: SampleId },

    /// The sample type is not batched; the sample sits in its own aggregate
    Standalone {
        sample_id: SampleId,
        work_unit_id: WorkUnitId,
    },

    /// No open aggregate existed; a new one was created for the sample
    Created {
        sample_id: SampleId,
        work_unit_id: WorkUnitId,
    },

    Attached {
        sample_id: SampleId,
        work_unit_id: WorkUnitId,
    },

    AlreadyAttached {
        sample_id: SampleId,
        work_unit_id: WorkUnitId,
    },

    /// The sample completed the batch and the aggregate moved to the final step
    Advanced {
        sample_id: SampleId,
        work_unit_id: WorkUnitId,
        /// Identification after the prefix was applied
        identification: String,
    },

    /// The host refused the transition; the sample was left unattached
    AdvancementFailed {
        sample_id: SampleId,
        work_unit_id: WorkUnitId,
        reasons: Vec<String>,
    },

    Failed {
        action: Option<String>,
        error: String,
        configuration: bool,
    },
}

impl InvocationOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            InvocationOutcome::NoSample => "no_sample",
            InvocationOutcome::NotReceived { .. } => "not_received",
            InvocationOutcome::Standalone { .. } => "standalone",
            InvocationOutcome::Created { .. } => "created",
            InvocationOutcome::Attached { .. } => "attached",
            InvocationOutcome::AlreadyAttached { .. } => "already_attached",
            InvocationOutcome::Advanced { .. } => "advanced",
            InvocationOutcome::AdvancementFailed { .. } => "advancement_failed",
            InvocationOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, InvocationOutcome::Failed { .. })
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            InvocationOutcome::Failed {
                configuration: true,
                ..
            }
        )
    }

    /// Aggregate the sample ended up in, if any
    pub fn work_unit_id(&self) -> Option<WorkUnitId> {
        match self {
            InvocationOutcome::Standalone { work_unit_id, .. }
            | InvocationOutcome::Created { work_unit_id, .. }
            | InvocationOutcome::Attached { work_unit_id, .. }
            | InvocationOutcome::AlreadyAttached { work_unit_id, .. }
            | InvocationOutcome::Advanced { work_unit_id, .. }
            | InvocationOutcome::AdvancementFailed { work_unit_id, .. } => Some(*work_unit_id),
            _ => None,
        }
    }
}

impl fmt::Display for InvocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one engine invocation
#[derive(Debug, Clone)]
pub struct InvocationReport {
    pub outcome: InvocationOutcome,

    /// The single audit entry produced by the invocation
    pub audit: AuditEntry,

    /// Whether the audit sink accepted the entry
    pub audit_recorded: bool,

    pub duration: Duration,
}

impl InvocationReport {
    /// Log the report
    pub fn log_summary(&self) {
        crate::log_invocation_complete!(self.outcome, self.duration);

        if !self.audit_recorded {
            tracing::warn!(
                level = %self.audit.level,
                message = %self.audit.message,
                "Audit entry could not be recorded"
            );
        }

        if let InvocationOutcome::Failed { action, error, .. } = &self.outcome {
            tracing::error!(
                action = action.as_deref().unwrap_or("-"),
                error = %error,
                "Invocation failed"
            );
        }
    }

    /// CLI exit code: 0 ok, 2 configuration error, 5 fatal
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            InvocationOutcome::Failed {
                configuration: true,
                ..
            } => 2,
            InvocationOutcome::Failed { .. } => 5,
            _ => 0,
        }
    }
}

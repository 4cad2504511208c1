//! Work units (aggregates), attachments and workflow transition payloads

use crate::domain::ids::{SampleId, WorkMasterId, WorkUnitId, WorkflowStepId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Work unit that batches samples through a workflow
///
/// A work unit stays open while it is active, has no finish timestamp and has not
/// yet reached the configured final step. Marking it finished is done outside
/// this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub id: WorkUnitId,
    pub master_id: WorkMasterId,

    /// Inherited from the identification of the sample type that opened it
    pub identification: String,

    pub current_step_id: WorkflowStepId,

    #[serde(default)]
    pub finish_date_time: Option<DateTime<Utc>>,

    #[serde(default = "default_true")]
    pub active: bool,
}

impl WorkUnit {
    /// Whether new samples may still be attached when `final_step` closes the batch
    pub fn accepts_samples(&self, final_step: WorkflowStepId) -> bool {
        self.active && self.finish_date_time.is_none() && self.current_step_id != final_step
    }
}

/// Values needed to persist a new work unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkUnit {
    pub master_id: WorkMasterId,
    pub initial_step_id: WorkflowStepId,
    pub identification: String,
}

/// Attachment of a sample to a work unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkSample {
    pub work_unit_id: WorkUnitId,
    pub sample_id: SampleId,
}

/// Key that identifies one skip-lot batch
///
/// All samples of the same type under one master classification compete for the
/// same open work unit, so the batch lock is taken on this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchKey {
    pub master_id: WorkMasterId,
    pub identification: String,
}

impl BatchKey {
    pub fn new(master_id: WorkMasterId, identification: impl Into<String>) -> Self {
        Self {
            master_id,
            identification: identification.into(),
        }
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.master_id, self.identification)
    }
}

/// Data computed by the host for a transition to a given step
///
/// Opaque to the engine; it is handed back unchanged when the transition executes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionData(pub serde_json::Value);

/// Outcome reported by the workflow transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionResult {
    pub success: bool,

    /// Reasons supplied by the transition check, e.g. unmet preconditions
    #[serde(default)]
    pub messages: Vec<String>,
}

impl TransitionResult {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            messages: Vec::new(),
        }
    }

    pub fn failed(messages: Vec<String>) -> Self {
        Self {
            success: false,
            messages,
        }
    }

    /// Failure reasons joined the way they appear in notifications
    pub fn joined_messages(&self) -> String {
        self.messages.join("; ")
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work_unit(step: i64) -> WorkUnit {
        WorkUnit {
            id: WorkUnitId::new(10).unwrap(),
            master_id: WorkMasterId::new(4).unwrap(),
            identification: "Soybean".to_string(),
            current_step_id: WorkflowStepId::new(step).unwrap(),
            finish_date_time: None,
            active: true,
        }
    }

    #[test]
    fn test_accepts_samples_until_final_step() {
        let final_step = WorkflowStepId::new(9).unwrap();
        assert!(work_unit(1).accepts_samples(final_step));
        assert!(!work_unit(9).accepts_samples(final_step));
    }

    #[test]
    fn test_finished_or_inactive_rejects_samples() {
        let final_step = WorkflowStepId::new(9).unwrap();
        let mut unit = work_unit(1);
        unit.finish_date_time = Some(Utc::now());
        assert!(!unit.accepts_samples(final_step));

        let mut unit = work_unit(1);
        unit.active = false;
        assert!(!unit.accepts_samples(final_step));
    }

    #[test]
    fn test_batch_key_display() {
        let key = BatchKey::new(WorkMasterId::new(4).unwrap(), "Soybean");
        assert_eq!(key.to_string(), "4/Soybean");
    }

    #[test]
    fn test_transition_result_joined_messages() {
        let result = TransitionResult::failed(vec![
            "Field 'Analyst' is required".to_string(),
            "Step 12 is locked".to_string(),
        ]);
        assert!(!result.success);
        assert_eq!(
            result.joined_messages(),
            "Field 'Analyst' is required; Step 12 is locked"
        );
    }
}

//! Serializable contents of the in-memory store
//!
//! A fixture is plain JSON. Every collection defaults to empty so a fixture only
//! needs the records a scenario touches.

use crate::domain::ids::{
    AccountId, AnalysisGroupId, FileId, MessageId, SampleId, WorkUnitId, WorkflowStepId,
};
use crate::domain::{
    AuditEntry, Equivalency, EquivalencySampleType, MailingListRecipient, MessageRecipient,
    NewFile, NewMessage, Result, Sample, SampleThreadMessage, WorkSample, WorkUnit,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Account registered under an email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEmail {
    pub email: String,
    pub account_id: AccountId,
}

/// Work unit whose transitions the host refuses, with the reasons it gives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedTransition {
    pub work_unit_id: WorkUnitId,
    pub messages: Vec<String>,
}

/// Transition executed against the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionAttempt {
    pub work_unit_id: WorkUnitId,
    pub step_to_id: WorkflowStepId,
    pub success: bool,
}

/// Analysis group added to a sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedAnalysisGroup {
    pub sample_id: SampleId,
    pub analysis_group_id: AnalysisGroupId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: FileId,
    #[serde(flatten)]
    pub file: NewFile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: MessageId,
    #[serde(flatten)]
    pub message: NewMessage,
    pub recipients: Vec<MessageRecipient>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleMessageLink {
    pub sample_id: SampleId,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: MessageId,
    pub sample_id: SampleId,
    #[serde(flatten)]
    pub message: SampleThreadMessage,
}

/// Full contents of a [`MemoryStore`](super::MemoryStore)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryFixture {
    pub samples: Vec<Sample>,
    pub equivalencies: Vec<Equivalency>,
    pub equivalency_sample_types: Vec<EquivalencySampleType>,
    pub work_units: Vec<WorkUnit>,
    pub work_samples: Vec<WorkSample>,
    pub mailing_list_recipients: Vec<MailingListRecipient>,
    pub account_emails: Vec<AccountEmail>,
    pub blocked_transitions: Vec<BlockedTransition>,

    // Effects recorded by the store
    pub transition_attempts: Vec<TransitionAttempt>,
    pub added_analysis_groups: Vec<AddedAnalysisGroup>,
    pub files: Vec<StoredFile>,
    pub messages: Vec<StoredMessage>,
    pub sample_messages: Vec<SampleMessageLink>,
    pub thread_messages: Vec<ThreadMessage>,
    pub audit_log: Vec<AuditEntry>,
}

impl MemoryFixture {
    /// Reads a fixture from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes the fixture as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    pub fn sample(&self, sample_id: SampleId) -> Option<&Sample> {
        self.samples.iter().find(|s| s.id == sample_id)
    }

    pub fn work_unit(&self, work_unit_id: WorkUnitId) -> Option<&WorkUnit> {
        self.work_units.iter().find(|w| w.id == work_unit_id)
    }

    /// Samples attached to a work unit, in attachment order
    pub fn attached_samples(&self, work_unit_id: WorkUnitId) -> Vec<SampleId> {
        self.work_samples
            .iter()
            .filter(|ws| ws.work_unit_id == work_unit_id)
            .map(|ws| ws.sample_id)
            .collect()
    }

    /// Total number of mutations recorded, ignoring the audit log
    pub fn mutation_count(&self, baseline: &MemoryFixture) -> usize {
        let changed_samples = self
            .samples
            .iter()
            .filter(|s| baseline.sample(s.id) != Some(*s))
            .count();
        let changed_work_units = self
            .work_units
            .iter()
            .filter(|w| baseline.work_unit(w.id) != Some(*w))
            .count();

        changed_samples
            + changed_work_units
            + self.work_samples.len().saturating_sub(baseline.work_samples.len())
            + self.added_analysis_groups.len().saturating_sub(baseline.added_analysis_groups.len())
            + self.files.len().saturating_sub(baseline.files.len())
            + self.messages.len().saturating_sub(baseline.messages.len())
            + self.sample_messages.len().saturating_sub(baseline.sample_messages.len())
            + self.thread_messages.len().saturating_sub(baseline.thread_messages.len())
    }
}

//! Capability traits the engine depends on
//!
//! Each trait covers one narrow slice of the host LIMS. Implementations convert
//! their driver errors into [`SkipLotError`](crate::domain::SkipLotError) at the
//! boundary.

use crate::domain::ids::{
    AccountId, AnalysisGroupId, EquivalencyId, FileId, MailingListId, MessageId, SampleId,
    SampleTypeId, WorkMasterId, WorkUnitId, WorkflowStepId,
};
use crate::domain::{
    AuditEntry, BatchKey, EquivalencySampleType, MailingListRecipient, MessageRecipient,
    NewFile, NewMessage, NewWorkUnit, Result, Sample, SampleThreadMessage, TransitionData,
    TransitionResult, WorkUnit,
};
use async_trait::async_trait;

/// Sample lookups and the identification update
#[async_trait]
pub trait SampleRepository: Send + Sync {
    /// Load a sample together with its sample type
    async fn find_sample(&self, sample_id: SampleId) -> Result<Option<Sample>>;

    /// Whether the sample has been received; unknown samples are not received
    async fn is_received(&self, sample_id: SampleId) -> Result<bool>;

    /// Persist a new identification string
    async fn update_identification(&self, sample_id: SampleId, identification: &str)
        -> Result<()>;
}

#[async_trait]
pub trait EquivalencyRepository: Send + Sync {
    /// Mapping of the sample type under the equivalency, only if the equivalency is active
    async fn find_active_mapping(
        &self,
        equivalency_id: EquivalencyId,
        sample_type_id: SampleTypeId,
    ) -> Result<Option<EquivalencySampleType>>;
}

/// Work units (aggregates) and their attachments
#[async_trait]
pub trait AggregateRepository: Send + Sync {
    /// Open work unit of the master with the given identification
    ///
    /// Open means active, without a finish timestamp, and not at `final_step`. When
    /// several match, the oldest one is returned.
    async fn find_open_aggregate(
        &self,
        master_id: WorkMasterId,
        identification: &str,
        final_step: WorkflowStepId,
    ) -> Result<Option<WorkUnit>>;

    /// Number of attached samples that are active and not reviewed
    async fn count_counted_samples(&self, work_unit_id: WorkUnitId) -> Result<usize>;

    async fn is_attached(&self, work_unit_id: WorkUnitId, sample_id: SampleId) -> Result<bool>;

    /// Active, unfinished work unit of the master that already holds the sample
    async fn find_attachment_for_sample(
        &self,
        master_id: WorkMasterId,
        sample_id: SampleId,
    ) -> Result<Option<WorkUnitId>>;

    async fn create_aggregate(&self, new_work_unit: &NewWorkUnit) -> Result<WorkUnit>;

    /// Attach a sample; returns `false` when the attachment already existed
    async fn attach_sample(&self, work_unit_id: WorkUnitId, sample_id: SampleId) -> Result<bool>;

    /// Block until the batch identified by `key` is exclusively held by the caller
    async fn lock_batch(&self, key: &BatchKey) -> Result<()>;

    /// Release a batch previously taken with [`lock_batch`](Self::lock_batch)
    async fn unlock_batch(&self, key: &BatchKey) -> Result<()>;
}

/// Host workflow transition for work units
///
/// The transition is two-phase: the host computes the data a move to the target step
/// needs, then executes the move with that data.
#[async_trait]
pub trait WorkflowTransitioner: Send + Sync {
    async fn next_step_data(
        &self,
        work_unit_id: WorkUnitId,
        step_to_id: WorkflowStepId,
    ) -> Result<TransitionData>;

    /// Execute the transition; a refused transition is `Ok` with `success = false`
    async fn transition_to_step(
        &self,
        work_unit_id: WorkUnitId,
        step_to_id: WorkflowStepId,
        data: &TransitionData,
    ) -> Result<TransitionResult>;
}

#[async_trait]
pub trait AnalysisEnricher: Send + Sync {
    /// Add every analysis of the group to the sample
    async fn add_analyses_by_group(
        &self,
        sample_id: SampleId,
        analysis_group_id: AnalysisGroupId,
    ) -> Result<()>;
}

/// Message persistence
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn mailing_list_recipients(
        &self,
        mailing_list_id: MailingListId,
    ) -> Result<Vec<MailingListRecipient>>;

    /// Account registered under an email address
    async fn account_for_email(&self, email: &str) -> Result<Option<AccountId>>;

    /// Store the HTML body of a message as a file
    async fn store_html_body(&self, file: &NewFile) -> Result<FileId>;

    async fn create_message(
        &self,
        message: &NewMessage,
        recipients: &[MessageRecipient],
    ) -> Result<MessageId>;

    async fn link_sample_message(&self, sample_id: SampleId, message_id: MessageId) -> Result<()>;

    /// Post a message on the sample's own thread
    async fn post_sample_thread_message(
        &self,
        sample_id: SampleId,
        message: &SampleThreadMessage,
    ) -> Result<MessageId>;
}

/// Host event log
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> Result<()>;
}

//! In-process implementation of every store trait

use crate::adapters::memory::fixture::{
    AddedAnalysisGroup, MemoryFixture, SampleMessageLink, StoredFile, StoredMessage,
    ThreadMessage, TransitionAttempt,
};
use crate::adapters::store::traits::{
    AggregateRepository, AnalysisEnricher, AuditSink, EquivalencyRepository, MessageSender,
    SampleRepository, WorkflowTransitioner,
};
use crate::adapters::store::LimsPorts;
use crate::domain::ids::{
    AccountId, AnalysisGroupId, EquivalencyId, FileId, MailingListId, MessageId, SampleId,
    SampleTypeId, WorkMasterId, WorkUnitId, WorkflowStepId,
};
use crate::domain::{
    AuditEntry, BatchKey, EquivalencySampleType, MailingListRecipient, MessageRecipient,
    NewFile, NewMessage, NewWorkUnit, Result, Sample, SampleThreadMessage, StoreError,
    TransitionData, TransitionResult, WorkSample, WorkUnit,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Store backed by a [`MemoryFixture`]
///
/// Used by the test suite and by the `memory` store target. When a persist path is
/// set, the fixture is written back after every audit entry, which closes each
/// invocation.
pub struct MemoryStore {
    state: Mutex<MemoryFixture>,
    batch_locks: Mutex<HashMap<BatchKey, Arc<Mutex<()>>>>,
    held_locks: Mutex<HashMap<BatchKey, OwnedMutexGuard<()>>>,
    persist_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new(fixture: MemoryFixture) -> Self {
        Self {
            state: Mutex::new(fixture),
            batch_locks: Mutex::new(HashMap::new()),
            held_locks: Mutex::new(HashMap::new()),
            persist_path: None,
        }
    }

    /// Loads the fixture at `path`, optionally writing changes back to it
    pub fn from_file(path: impl Into<PathBuf>, persist: bool) -> Result<Self> {
        let path = path.into();
        let fixture = MemoryFixture::load(&path)?;
        tracing::info!(path = %path.display(), persist, "Loaded memory store fixture");

        let mut store = Self::new(fixture);
        if persist {
            store.persist_path = Some(path);
        }
        Ok(store)
    }

    /// Copy of the current contents
    pub async fn snapshot(&self) -> MemoryFixture {
        self.state.lock().await.clone()
    }

    /// Bundle this store as every port of the engine
    pub fn into_ports(self: Arc<Self>) -> LimsPorts {
        LimsPorts {
            samples: self.clone(),
            equivalencies: self.clone(),
            aggregates: self.clone(),
            workflow: self.clone(),
            analyses: self.clone(),
            messages: self.clone(),
            audit: self,
        }
    }
}

fn next_id(existing: impl Iterator<Item = i64>) -> i64 {
    existing.max().unwrap_or(0) + 1
}

fn invalid_id(e: String) -> StoreError {
    StoreError::InvalidData(e)
}

#[async_trait]
impl SampleRepository for MemoryStore {
    async fn find_sample(&self, sample_id: SampleId) -> Result<Option<Sample>> {
        Ok(self.state.lock().await.sample(sample_id).cloned())
    }

    async fn is_received(&self, sample_id: SampleId) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .await
            .sample(sample_id)
            .map(|s| s.received)
            .unwrap_or(false))
    }

    async fn update_identification(
        &self,
        sample_id: SampleId,
        identification: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let sample = state
            .samples
            .iter_mut()
            .find(|s| s.id == sample_id)
            .ok_or_else(|| StoreError::NotFound(format!("sample {sample_id}")))?;
        sample.identification = identification.to_string();
        Ok(())
    }
}

#[async_trait]
impl EquivalencyRepository for MemoryStore {
    async fn find_active_mapping(
        &self,
        equivalency_id: EquivalencyId,
        sample_type_id: SampleTypeId,
    ) -> Result<Option<EquivalencySampleType>> {
        let state = self.state.lock().await;
        let active = state
            .equivalencies
            .iter()
            .any(|e| e.id == equivalency_id && e.active);
        if !active {
            return Ok(None);
        }

        Ok(state
            .equivalency_sample_types
            .iter()
            .find(|m| m.equivalency_id == equivalency_id && m.sample_type_id == sample_type_id)
            .cloned())
    }
}

#[async_trait]
impl AggregateRepository for MemoryStore {
    async fn find_open_aggregate(
        &self,
        master_id: WorkMasterId,
        identification: &str,
        final_step: WorkflowStepId,
    ) -> Result<Option<WorkUnit>> {
        let state = self.state.lock().await;
        Ok(state
            .work_units
            .iter()
            .filter(|w| {
                w.master_id == master_id
                    && w.identification == identification
                    && w.accepts_samples(final_step)
            })
            .min_by_key(|w| w.id)
            .cloned())
    }

    async fn count_counted_samples(&self, work_unit_id: WorkUnitId) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state
            .work_samples
            .iter()
            .filter(|ws| ws.work_unit_id == work_unit_id)
            .filter_map(|ws| state.sample(ws.sample_id))
            .filter(|s| s.counts_toward_quota())
            .count())
    }

    async fn is_attached(&self, work_unit_id: WorkUnitId, sample_id: SampleId) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state
            .work_samples
            .iter()
            .any(|ws| ws.work_unit_id == work_unit_id && ws.sample_id == sample_id))
    }

    async fn find_attachment_for_sample(
        &self,
        master_id: WorkMasterId,
        sample_id: SampleId,
    ) -> Result<Option<WorkUnitId>> {
        let state = self.state.lock().await;
        Ok(state
            .work_samples
            .iter()
            .filter(|ws| ws.sample_id == sample_id)
            .filter_map(|ws| state.work_unit(ws.work_unit_id))
            .find(|w| w.master_id == master_id && w.active && w.finish_date_time.is_none())
            .map(|w| w.id))
    }

    async fn create_aggregate(&self, new_work_unit: &NewWorkUnit) -> Result<WorkUnit> {
        let mut state = self.state.lock().await;
        let id = next_id(state.work_units.iter().map(|w| w.id.get()));
        let work_unit = WorkUnit {
            id: WorkUnitId::new(id).map_err(invalid_id)?,
            master_id: new_work_unit.master_id,
            identification: new_work_unit.identification.clone(),
            current_step_id: new_work_unit.initial_step_id,
            finish_date_time: None,
            active: true,
        };
        state.work_units.push(work_unit.clone());
        Ok(work_unit)
    }

    async fn attach_sample(&self, work_unit_id: WorkUnitId, sample_id: SampleId) -> Result<bool> {
        let mut state = self.state.lock().await;
        let attachment = WorkSample {
            work_unit_id,
            sample_id,
        };
        if state.work_samples.contains(&attachment) {
            return Ok(false);
        }
        state.work_samples.push(attachment);
        Ok(true)
    }

    async fn lock_batch(&self, key: &BatchKey) -> Result<()> {
        let batch = {
            let mut locks = self.batch_locks.lock().await;
            locks.entry(key.clone()).or_default().clone()
        };
        let guard = batch.lock_owned().await;
        self.held_locks.lock().await.insert(key.clone(), guard);
        Ok(())
    }

    async fn unlock_batch(&self, key: &BatchKey) -> Result<()> {
        let mut locks = self.batch_locks.lock().await;
        let Some(guard) = self.held_locks.lock().await.remove(key) else {
            return Err(StoreError::Lock(format!("batch {key} is not locked")).into());
        };
        drop(guard);

        // Waiters hold a clone of the entry, keep it for them
        if locks.get(key).is_some_and(|batch| Arc::strong_count(batch) == 1) {
            locks.remove(key);
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowTransitioner for MemoryStore {
    async fn next_step_data(
        &self,
        work_unit_id: WorkUnitId,
        step_to_id: WorkflowStepId,
    ) -> Result<TransitionData> {
        let state = self.state.lock().await;
        let work_unit = state
            .work_unit(work_unit_id)
            .ok_or_else(|| StoreError::NotFound(format!("work unit {work_unit_id}")))?;

        Ok(TransitionData(serde_json::json!({
            "WorkId": work_unit.id.get(),
            "StepFromId": work_unit.current_step_id.get(),
            "StepToId": step_to_id.get(),
        })))
    }

    async fn transition_to_step(
        &self,
        work_unit_id: WorkUnitId,
        step_to_id: WorkflowStepId,
        _data: &TransitionData,
    ) -> Result<TransitionResult> {
        let mut state = self.state.lock().await;

        let blocked = state
            .blocked_transitions
            .iter()
            .find(|b| b.work_unit_id == work_unit_id)
            .map(|b| b.messages.clone());

        let result = match blocked {
            Some(messages) => TransitionResult::failed(messages),
            None => {
                let work_unit = state
                    .work_units
                    .iter_mut()
                    .find(|w| w.id == work_unit_id)
                    .ok_or_else(|| StoreError::NotFound(format!("work unit {work_unit_id}")))?;
                work_unit.current_step_id = step_to_id;
                TransitionResult::succeeded()
            }
        };

        state.transition_attempts.push(TransitionAttempt {
            work_unit_id,
            step_to_id,
            success: result.success,
        });
        Ok(result)
    }
}

#[async_trait]
impl AnalysisEnricher for MemoryStore {
    async fn add_analyses_by_group(
        &self,
        sample_id: SampleId,
        analysis_group_id: AnalysisGroupId,
    ) -> Result<()> {
        self.state
            .lock()
            .await
            .added_analysis_groups
            .push(AddedAnalysisGroup {
                sample_id,
                analysis_group_id,
            });
        Ok(())
    }
}

#[async_trait]
impl MessageSender for MemoryStore {
    async fn mailing_list_recipients(
        &self,
        mailing_list_id: MailingListId,
    ) -> Result<Vec<MailingListRecipient>> {
        let state = self.state.lock().await;
        Ok(state
            .mailing_list_recipients
            .iter()
            .filter(|r| r.mailing_list_id == mailing_list_id)
            .cloned()
            .collect())
    }

    async fn account_for_email(&self, email: &str) -> Result<Option<AccountId>> {
        let state = self.state.lock().await;
        Ok(state
            .account_emails
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .map(|a| a.account_id))
    }

    async fn store_html_body(&self, file: &NewFile) -> Result<FileId> {
        let mut state = self.state.lock().await;
        let id = FileId::new(next_id(state.files.iter().map(|f| f.id.get()))).map_err(invalid_id)?;
        state.files.push(StoredFile {
            id,
            file: file.clone(),
        });
        Ok(id)
    }

    async fn create_message(
        &self,
        message: &NewMessage,
        recipients: &[MessageRecipient],
    ) -> Result<MessageId> {
        let mut state = self.state.lock().await;
        let id = next_message_id(&state)?;
        state.messages.push(StoredMessage {
            id,
            message: message.clone(),
            recipients: recipients.to_vec(),
        });
        Ok(id)
    }

    async fn link_sample_message(&self, sample_id: SampleId, message_id: MessageId) -> Result<()> {
        self.state
            .lock()
            .await
            .sample_messages
            .push(SampleMessageLink {
                sample_id,
                message_id,
            });
        Ok(())
    }

    async fn post_sample_thread_message(
        &self,
        sample_id: SampleId,
        message: &SampleThreadMessage,
    ) -> Result<MessageId> {
        let mut state = self.state.lock().await;
        let id = next_message_id(&state)?;
        state.thread_messages.push(ThreadMessage {
            id,
            sample_id,
            message: message.clone(),
        });
        Ok(id)
    }
}

// Thread messages and mailing-list messages share one id sequence
fn next_message_id(state: &MemoryFixture) -> Result<MessageId> {
    let ids = state
        .messages
        .iter()
        .map(|m| m.id.get())
        .chain(state.thread_messages.iter().map(|m| m.id.get()));
    Ok(MessageId::new(next_id(ids)).map_err(invalid_id)?)
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        let mut state = self.state.lock().await;
        state.audit_log.push(entry.clone());

        if let Some(path) = &self.persist_path {
            state.save(path)?;
            tracing::debug!(path = %path.display(), "Persisted memory store");
        }
        Ok(())
    }
}

//! PostgreSQL adapter implementing the store traits
//!
//! Data operations go straight to the host tables. Batch locks are session-level
//! advisory locks, so the connection that took a lock is pinned until the lock is
//! released.

use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    PostgreSQLEquivalencySampleType, PostgreSQLRecipient, PostgreSQLSample, PostgreSQLWorkUnit,
};
use crate::adapters::store::traits::{
    AggregateRepository, AuditSink, EquivalencyRepository, MessageSender, SampleRepository,
};
use crate::domain::ids::{
    AccountId, EquivalencyId, FileId, MailingListId, MessageId, SampleId, SampleTypeId,
    WorkMasterId, WorkUnitId, WorkflowStepId,
};
use crate::domain::{
    AuditEntry, BatchKey, EquivalencySampleType, MailingListRecipient, MessageRecipient,
    NewFile, NewMessage, NewWorkUnit, Result, Sample, SampleThreadMessage, StoreError, WorkUnit,
};
use async_trait::async_trait;
use deadpool_postgres::Object;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

// Single 64-bit key: the identification hashed with the full master id as seed
const LOCK_BATCH: &str = "SELECT pg_advisory_lock(hashtextextended($2, $1))";
const UNLOCK_BATCH: &str = "SELECT pg_advisory_unlock(hashtextextended($2, $1))";

/// Parameters bound to `$1` and `$2` of the batch lock statements
fn lock_params(key: &BatchKey) -> (i64, &str) {
    (key.master_id.get(), key.identification.as_str())
}

/// PostgreSQL implementation of the store traits
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
    held_locks: Mutex<HashMap<BatchKey, Object>>,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self::new_with_arc(Arc::new(client))
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self {
            client,
            held_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

fn new_id<T>(value: i64) -> Result<T>
where
    T: TryFrom<i64, Error = String>,
{
    Ok(T::try_from(value).map_err(StoreError::InvalidData)?)
}

#[async_trait]
impl SampleRepository for PostgreSQLAdapter {
    async fn find_sample(&self, sample_id: SampleId) -> Result<Option<Sample>> {
        let row = self
            .client
            .query_opt(
                "Failed to load sample",
                r#"
                SELECT s.id, s.sample_type_id, st.identification AS sample_type_identification,
                       s.identification, s.received, s.reviewed, s.active
                FROM samples s
                JOIN sample_types st ON st.id = s.sample_type_id
                WHERE s.id = $1
                "#,
                &[&sample_id.get()],
            )
            .await?;

        match row {
            Some(row) => Ok(Some(PostgreSQLSample::from_row(&row)?.into_domain()?)),
            None => Ok(None),
        }
    }

    async fn is_received(&self, sample_id: SampleId) -> Result<bool> {
        let row = self
            .client
            .query_opt(
                "Failed to check sample reception",
                "SELECT received FROM samples WHERE id = $1",
                &[&sample_id.get()],
            )
            .await?;

        Ok(row.map(|r| r.get::<_, bool>("received")).unwrap_or(false))
    }

    async fn update_identification(
        &self,
        sample_id: SampleId,
        identification: &str,
    ) -> Result<()> {
        let updated = self
            .client
            .execute(
                "Failed to update sample identification",
                "UPDATE samples SET identification = $2 WHERE id = $1",
                &[&sample_id.get(), &identification],
            )
            .await?;

        if updated == 0 {
            return Err(StoreError::NotFound(format!("sample {sample_id}")).into());
        }
        Ok(())
    }
}

#[async_trait]
impl EquivalencyRepository for PostgreSQLAdapter {
    async fn find_active_mapping(
        &self,
        equivalency_id: EquivalencyId,
        sample_type_id: SampleTypeId,
    ) -> Result<Option<EquivalencySampleType>> {
        let row = self
            .client
            .query_opt(
                "Failed to resolve equivalency",
                r#"
                SELECT est.equivalency_id, est.sample_type_id, est.external_id
                FROM equivalency_sample_types est
                JOIN equivalencies e ON e.id = est.equivalency_id
                WHERE est.equivalency_id = $1 AND est.sample_type_id = $2 AND e.active
                "#,
                &[&equivalency_id.get(), &sample_type_id.get()],
            )
            .await?;

        match row {
            Some(row) => Ok(Some(
                PostgreSQLEquivalencySampleType::from_row(&row)?.into_domain()?,
            )),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AggregateRepository for PostgreSQLAdapter {
    async fn find_open_aggregate(
        &self,
        master_id: WorkMasterId,
        identification: &str,
        final_step: WorkflowStepId,
    ) -> Result<Option<WorkUnit>> {
        let row = self
            .client
            .query_opt(
                "Failed to locate open work unit",
                r#"
                SELECT id, master_id, identification, current_step_id, finish_date_time, active
                FROM work_units
                WHERE master_id = $1
                  AND identification = $2
                  AND finish_date_time IS NULL
                  AND active
                  AND current_step_id <> $3
                ORDER BY id
                LIMIT 1
                "#,
                &[&master_id.get(), &identification, &final_step.get()],
            )
            .await?;

        match row {
            Some(row) => Ok(Some(PostgreSQLWorkUnit::from_row(&row)?.into_domain()?)),
            None => Ok(None),
        }
    }

    async fn count_counted_samples(&self, work_unit_id: WorkUnitId) -> Result<usize> {
        let row = self
            .client
            .query_one(
                "Failed to count work samples",
                r#"
                SELECT COUNT(*) AS counted
                FROM work_samples ws
                JOIN samples s ON s.id = ws.sample_id
                WHERE ws.work_unit_id = $1 AND s.active AND NOT s.reviewed
                "#,
                &[&work_unit_id.get()],
            )
            .await?;

        let counted: i64 = row.get("counted");
        Ok(usize::try_from(counted)
            .map_err(|_| StoreError::InvalidData(format!("negative count {counted}")))?)
    }

    async fn is_attached(&self, work_unit_id: WorkUnitId, sample_id: SampleId) -> Result<bool> {
        let row = self
            .client
            .query_one(
                "Failed to check attachment",
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM work_samples WHERE work_unit_id = $1 AND sample_id = $2
                ) AS attached
                "#,
                &[&work_unit_id.get(), &sample_id.get()],
            )
            .await?;

        Ok(row.get("attached"))
    }

    async fn find_attachment_for_sample(
        &self,
        master_id: WorkMasterId,
        sample_id: SampleId,
    ) -> Result<Option<WorkUnitId>> {
        let row = self
            .client
            .query_opt(
                "Failed to look up existing attachment",
                r#"
                SELECT w.id
                FROM work_samples ws
                JOIN work_units w ON w.id = ws.work_unit_id
                WHERE ws.sample_id = $2
                  AND w.master_id = $1
                  AND w.active
                  AND w.finish_date_time IS NULL
                ORDER BY w.id
                LIMIT 1
                "#,
                &[&master_id.get(), &sample_id.get()],
            )
            .await?;

        row.map(|r| new_id::<WorkUnitId>(r.get("id"))).transpose()
    }

    async fn create_aggregate(&self, new_work_unit: &NewWorkUnit) -> Result<WorkUnit> {
        let row = self
            .client
            .query_one(
                "Failed to create work unit",
                r#"
                INSERT INTO work_units (master_id, identification, current_step_id, active)
                VALUES ($1, $2, $3, TRUE)
                RETURNING id, master_id, identification, current_step_id, finish_date_time, active
                "#,
                &[
                    &new_work_unit.master_id.get(),
                    &new_work_unit.identification,
                    &new_work_unit.initial_step_id.get(),
                ],
            )
            .await?;

        Ok(PostgreSQLWorkUnit::from_row(&row)?.into_domain()?)
    }

    async fn attach_sample(&self, work_unit_id: WorkUnitId, sample_id: SampleId) -> Result<bool> {
        let inserted = self
            .client
            .execute(
                "Failed to attach sample",
                r#"
                INSERT INTO work_samples (work_unit_id, sample_id)
                VALUES ($1, $2)
                ON CONFLICT (work_unit_id, sample_id) DO NOTHING
                "#,
                &[&work_unit_id.get(), &sample_id.get()],
            )
            .await?;

        Ok(inserted > 0)
    }

    async fn lock_batch(&self, key: &BatchKey) -> Result<()> {
        let conn = self.client.get_connection().await?;
        let (master_id, identification) = lock_params(key);
        conn.execute(LOCK_BATCH, &[&master_id, &identification])
            .await
            .map_err(|e| StoreError::backend(format!("Failed to lock batch {key}"), e))?;

        tracing::debug!(batch = %key, "Batch lock acquired");
        self.held_locks.lock().await.insert(key.clone(), conn);
        Ok(())
    }

    async fn unlock_batch(&self, key: &BatchKey) -> Result<()> {
        let conn = self
            .held_locks
            .lock()
            .await
            .remove(key)
            .ok_or_else(|| StoreError::Lock(format!("batch {key} is not locked")))?;

        let (master_id, identification) = lock_params(key);
        let released = conn
            .query_one(UNLOCK_BATCH, &[&master_id, &identification])
            .await
            .map(|row| row.get::<_, bool>(0));

        match released {
            Ok(true) => {
                tracing::debug!(batch = %key, "Batch lock released");
                Ok(())
            }
            other => {
                // Drop the session so the server releases the lock with it
                drop(Object::take(conn));
                match other {
                    Err(e) => {
                        let message = format!("Failed to unlock batch {key}");
                        Err(StoreError::backend(message, e).into())
                    }
                    _ => {
                        let message = format!("batch {key} was not held by this session");
                        Err(StoreError::Lock(message).into())
                    }
                }
            }
        }
    }
}

#[async_trait]
impl MessageSender for PostgreSQLAdapter {
    async fn mailing_list_recipients(
        &self,
        mailing_list_id: MailingListId,
    ) -> Result<Vec<MailingListRecipient>> {
        let rows = self
            .client
            .query(
                "Failed to load mailing list",
                r#"
                SELECT mailing_list_id, email, account_id
                FROM mailing_list_recipients
                WHERE mailing_list_id = $1
                ORDER BY id
                "#,
                &[&mailing_list_id.get()],
            )
            .await?;

        let mut recipients = Vec::with_capacity(rows.len());
        for row in &rows {
            recipients.push(PostgreSQLRecipient::from_row(row)?.into_domain()?);
        }
        Ok(recipients)
    }

    async fn account_for_email(&self, email: &str) -> Result<Option<AccountId>> {
        let row = self
            .client
            .query_opt(
                "Failed to look up account email",
                "SELECT account_id FROM account_emails WHERE lower(email) = lower($1)",
                &[&email],
            )
            .await?;

        row.map(|r| new_id::<AccountId>(r.get("account_id"))).transpose()
    }

    async fn store_html_body(&self, file: &NewFile) -> Result<FileId> {
        let row = self
            .client
            .query_one(
                "Failed to store message body",
                "INSERT INTO files (identification, category, data) VALUES ($1, $2, $3) RETURNING id",
                &[&file.identification, &file.category, &file.data],
            )
            .await?;

        new_id(row.get("id"))
    }

    async fn create_message(
        &self,
        message: &NewMessage,
        recipients: &[MessageRecipient],
    ) -> Result<MessageId> {
        let mut conn = self.client.get_connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| StoreError::backend("Failed to begin message transaction", e))?;

        let row = tx
            .query_one(
                r#"
                INSERT INTO messages (
                    message_uid, identifier, email_from, message_type_id, subject,
                    message_html, message_text, html_file_id, sent, active, draft
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING id
                "#,
                &[
                    &message.message_uid,
                    &message.identifier,
                    &message.email_from,
                    &message.message_type_id.map(|id| id.get()),
                    &message.subject,
                    &message.html,
                    &message.text_plain,
                    &message.html_file_id.map(|id| id.get()),
                    &message.sent,
                    &message.active,
                    &message.draft,
                ],
            )
            .await
            .map_err(|e| StoreError::backend("Failed to insert message", e))?;
        let message_id: i64 = row.get("id");

        for recipient in recipients {
            tx.execute(
                r#"
                INSERT INTO message_recipients (message_id, account_to_id, email, message_date)
                VALUES ($1, $2, $3, $4)
                "#,
                &[
                    &message_id,
                    &recipient.account_to_id.map(|id| id.get()),
                    &recipient.email,
                    &recipient.message_date,
                ],
            )
            .await
            .map_err(|e| StoreError::backend("Failed to insert message recipient", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::backend("Failed to commit message", e))?;

        new_id(message_id)
    }

    async fn link_sample_message(&self, sample_id: SampleId, message_id: MessageId) -> Result<()> {
        self.client
            .execute(
                "Failed to link message to sample",
                r#"
                INSERT INTO sample_messages (sample_id, message_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
                &[&sample_id.get(), &message_id.get()],
            )
            .await?;
        Ok(())
    }

    async fn post_sample_thread_message(
        &self,
        sample_id: SampleId,
        message: &SampleThreadMessage,
    ) -> Result<MessageId> {
        let row = self
            .client
            .query_one(
                "Failed to post sample message",
                r#"
                INSERT INTO sample_thread_messages (sample_id, subject, html)
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
                &[&sample_id.get(), &message.subject, &message.html],
            )
            .await?;

        new_id(row.get("id"))
    }
}

#[async_trait]
impl AuditSink for PostgreSQLAdapter {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        self.client
            .execute(
                "Failed to write audit entry",
                r#"
                INSERT INTO log_events (
                    level, name, source, message, friendly_message, stack_trace, event_date_time
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
                &[
                    &entry.level.as_str(),
                    &entry.name,
                    &entry.source,
                    &entry.message,
                    &entry.friendly_message,
                    &entry.stack_trace,
                    &entry.event_date_time,
                ],
            )
            .await?;
        Ok(())
    }
}

//! PostgreSQL row models
//!
//! Each row struct mirrors the columns a query selects and converts into the
//! matching domain type, validating identifiers on the way.

use crate::domain::ids::{
    AccountId, EquivalencyId, MailingListId, SampleId, SampleTypeId, WorkMasterId, WorkUnitId,
    WorkflowStepId,
};
use crate::domain::{
    EquivalencySampleType, MailingListRecipient, Sample, SampleType, StoreError, WorkUnit,
};
use chrono::{DateTime, Utc};
use tokio_postgres::Row;

fn column<'a, T>(row: &'a Row, name: &str) -> Result<T, StoreError>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(name)
        .map_err(|e| StoreError::backend(format!("Failed to read column '{name}'"), e))
}

fn id<T>(value: i64) -> Result<T, StoreError>
where
    T: TryFrom<i64, Error = String>,
{
    T::try_from(value).map_err(StoreError::InvalidData)
}

/// Sample joined with its sample type
///
/// Expected columns: `id, sample_type_id, sample_type_identification,
/// identification, received, reviewed, active`.
#[derive(Debug, Clone)]
pub struct PostgreSQLSample {
    pub id: i64,
    pub sample_type_id: i64,
    pub sample_type_identification: String,
    pub identification: String,
    pub received: bool,
    pub reviewed: bool,
    pub active: bool,
}

impl PostgreSQLSample {
    pub fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id: column(row, "id")?,
            sample_type_id: column(row, "sample_type_id")?,
            sample_type_identification: column(row, "sample_type_identification")?,
            identification: column(row, "identification")?,
            received: column(row, "received")?,
            reviewed: column(row, "reviewed")?,
            active: column(row, "active")?,
        })
    }

    pub fn into_domain(self) -> Result<Sample, StoreError> {
        Ok(Sample {
            id: id::<SampleId>(self.id)?,
            sample_type: SampleType {
                id: id::<SampleTypeId>(self.sample_type_id)?,
                identification: self.sample_type_identification,
            },
            identification: self.identification,
            received: self.received,
            reviewed: self.reviewed,
            active: self.active,
        })
    }
}

/// Row of `work_units`
#[derive(Debug, Clone)]
pub struct PostgreSQLWorkUnit {
    pub id: i64,
    pub master_id: i64,
    pub identification: String,
    pub current_step_id: i64,
    pub finish_date_time: Option<DateTime<Utc>>,
    pub active: bool,
}

impl PostgreSQLWorkUnit {
    pub fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id: column(row, "id")?,
            master_id: column(row, "master_id")?,
            identification: column(row, "identification")?,
            current_step_id: column(row, "current_step_id")?,
            finish_date_time: column(row, "finish_date_time")?,
            active: column(row, "active")?,
        })
    }

    pub fn into_domain(self) -> Result<WorkUnit, StoreError> {
        Ok(WorkUnit {
            id: id::<WorkUnitId>(self.id)?,
            master_id: id::<WorkMasterId>(self.master_id)?,
            identification: self.identification,
            current_step_id: id::<WorkflowStepId>(self.current_step_id)?,
            finish_date_time: self.finish_date_time,
            active: self.active,
        })
    }
}

/// Row of `equivalency_sample_types`
#[derive(Debug, Clone)]
pub struct PostgreSQLEquivalencySampleType {
    pub equivalency_id: i64,
    pub sample_type_id: i64,
    pub external_id: Option<String>,
}

impl PostgreSQLEquivalencySampleType {
    pub fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            equivalency_id: column(row, "equivalency_id")?,
            sample_type_id: column(row, "sample_type_id")?,
            external_id: column(row, "external_id")?,
        })
    }

    pub fn into_domain(self) -> Result<EquivalencySampleType, StoreError> {
        Ok(EquivalencySampleType {
            equivalency_id: id::<EquivalencyId>(self.equivalency_id)?,
            sample_type_id: id::<SampleTypeId>(self.sample_type_id)?,
            external_id: self.external_id,
        })
    }
}

/// Row of `mailing_list_recipients`
#[derive(Debug, Clone)]
pub struct PostgreSQLRecipient {
    pub mailing_list_id: i64,
    pub email: Option<String>,
    pub account_id: Option<i64>,
}

impl PostgreSQLRecipient {
    pub fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            mailing_list_id: column(row, "mailing_list_id")?,
            email: column(row, "email")?,
            account_id: column(row, "account_id")?,
        })
    }

    pub fn into_domain(self) -> Result<MailingListRecipient, StoreError> {
        Ok(MailingListRecipient {
            mailing_list_id: id::<MailingListId>(self.mailing_list_id)?,
            email: self.email.filter(|e| !e.trim().is_empty()),
            account_id: self.account_id.map(id::<AccountId>).transpose()?,
        })
    }
}

//! Batch accumulation
//!
//! Decides what happens to a sample once an open aggregate has been located, and
//! performs attachments and aggregate creation.

use crate::adapters::store::AggregateRepository;
use crate::config::TaskOptions;
use crate::core::skiplot::trace::{Action, ActionContext};
use crate::domain::ids::{SampleId, WorkUnitId};
use crate::domain::{NewWorkUnit, Result, Sample, WorkUnit};
use std::sync::Arc;

/// What to do with a sample given the live state of a located aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDecision {
    /// The aggregate already holds more counted samples than the quota
    CreateNew,
    AlreadyAttached,
    /// Attaching the sample meets the quota; advance first
    Advance,
    Attach,
}

/// Decision policy for a located aggregate
///
/// The checks run in this order: overfull aggregate, existing attachment, quota
/// reached, plain attach.
pub fn decide(counted: usize, quota: usize, already_attached: bool) -> BatchDecision {
    if counted > quota {
        BatchDecision::CreateNew
    } else if already_attached {
        BatchDecision::AlreadyAttached
    } else if counted + 1 >= quota {
        BatchDecision::Advance
    } else {
        BatchDecision::Attach
    }
}

/// Aggregate that holds the sample after [`BatchAccumulator::create_aggregate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// A new aggregate was created and the sample attached to it
    Created(WorkUnit),
    /// The sample was already attached to an open aggregate of the master
    Existing(WorkUnitId),
}

pub struct BatchAccumulator {
    aggregates: Arc<dyn AggregateRepository>,
}

impl BatchAccumulator {
    pub fn new(aggregates: Arc<dyn AggregateRepository>) -> Self {
        Self { aggregates }
    }

    /// Live number of attachments that count toward the quota
    pub async fn counted_samples(&self, work_unit_id: WorkUnitId) -> Result<usize> {
        self.aggregates
            .count_counted_samples(work_unit_id)
            .await
            .in_action(Action::GetWorkSampleCount)
    }

    pub async fn is_attached(&self, work_unit_id: WorkUnitId, sample_id: SampleId) -> Result<bool> {
        self.aggregates
            .is_attached(work_unit_id, sample_id)
            .await
            .in_action(Action::IsSampleAttached)
    }

    /// Attach the sample; attaching twice is a no-op
    pub async fn attach(&self, work_unit_id: WorkUnitId, sample_id: SampleId) -> Result<bool> {
        let inserted = self
            .aggregates
            .attach_sample(work_unit_id, sample_id)
            .await
            .in_action(Action::AttachSample)?;

        if inserted {
            tracing::info!(work_unit_id = %work_unit_id, sample_id = %sample_id, "Sample attached");
        } else {
            tracing::debug!(
                work_unit_id = %work_unit_id,
                sample_id = %sample_id,
                "Sample was already attached"
            );
        }
        Ok(inserted)
    }

    /// Create an aggregate at the initial step for the sample's type and attach the sample
    ///
    /// If the sample is already attached to an active, unfinished aggregate of the
    /// master, nothing is created.
    pub async fn create_aggregate(
        &self,
        options: &TaskOptions,
        sample: &Sample,
    ) -> Result<Placement> {
        if let Some(existing) = self
            .aggregates
            .find_attachment_for_sample(options.work_master_id, sample.id)
            .await
            .in_action(Action::CreateWork)?
        {
            tracing::info!(
                work_unit_id = %existing,
                sample_id = %sample.id,
                "Sample already belongs to an open aggregate, not creating another"
            );
            return Ok(Placement::Existing(existing));
        }

        let new_work_unit = NewWorkUnit {
            master_id: options.work_master_id,
            initial_step_id: options.work_initial_step_id,
            identification: sample.sample_type.identification.clone(),
        };
        let work_unit = self
            .aggregates
            .create_aggregate(&new_work_unit)
            .await
            .in_action(Action::CreateWork)?;
        tracing::info!(work_unit_id = %work_unit.id, "Created aggregate");

        self.attach(work_unit.id, sample.id).await?;
        Ok(Placement::Created(work_unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 5, false => BatchDecision::Attach ; "empty aggregate")]
    #[test_case(3, 5, false => BatchDecision::Attach ; "below quota")]
    #[test_case(4, 5, false => BatchDecision::Advance ; "last free slot")]
    #[test_case(5, 5, false => BatchDecision::Advance ; "full but not advanced")]
    #[test_case(6, 5, false => BatchDecision::CreateNew ; "overfull")]
    #[test_case(6, 5, true => BatchDecision::CreateNew ; "overfull and attached")]
    #[test_case(4, 5, true => BatchDecision::AlreadyAttached ; "attached at threshold")]
    #[test_case(1, 2, false => BatchDecision::Advance ; "smallest quota")]
    fn test_decide(counted: usize, quota: usize, attached: bool) -> BatchDecision {
        decide(counted, quota, attached)
    }
}

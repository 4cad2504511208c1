//! Batch location

use crate::adapters::store::AggregateRepository;
use crate::core::skiplot::trace::{Action, ActionContext};
use crate::domain::ids::{WorkMasterId, WorkflowStepId};
use crate::domain::{Result, WorkUnit};
use std::sync::Arc;

pub struct BatchLocator {
    aggregates: Arc<dyn AggregateRepository>,
}

impl BatchLocator {
    pub fn new(aggregates: Arc<dyn AggregateRepository>) -> Self {
        Self { aggregates }
    }

    /// Open aggregate of the master whose identification matches the sample type
    ///
    /// Aggregates that are inactive, finished, or already at `final_step` never
    /// match. `None` is a valid outcome.
    pub async fn find_open_aggregate(
        &self,
        master_id: WorkMasterId,
        sample_type_identification: &str,
        final_step: WorkflowStepId,
    ) -> Result<Option<WorkUnit>> {
        let found = self
            .aggregates
            .find_open_aggregate(master_id, sample_type_identification, final_step)
            .await
            .in_action(Action::GetWorkId)?;

        match &found {
            Some(work_unit) => {
                tracing::debug!(work_unit_id = %work_unit.id, "Found open aggregate")
            }
            None => tracing::debug!(
                master_id = %master_id,
                identification = sample_type_identification,
                "No open aggregate"
            ),
        }
        Ok(found)
    }
}

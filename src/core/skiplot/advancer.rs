//! Workflow advancement of a full aggregate

use crate::adapters::store::WorkflowTransitioner;
use crate::core::skiplot::trace::{Action, ActionContext};
use crate::domain::ids::{WorkUnitId, WorkflowStepId};
use crate::domain::{Result, TransitionResult};
use std::sync::Arc;

pub struct WorkflowAdvancer {
    workflow: Arc<dyn WorkflowTransitioner>,
}

impl WorkflowAdvancer {
    pub fn new(workflow: Arc<dyn WorkflowTransitioner>) -> Self {
        Self { workflow }
    }

    /// Move the aggregate to `target_step`
    ///
    /// The transition data is computed first and handed unchanged to the
    /// transition. A refusal by the host is returned as an unsuccessful
    /// [`TransitionResult`] carrying every reason it gave; only transport or
    /// store failures are errors.
    pub async fn advance(
        &self,
        work_unit_id: WorkUnitId,
        target_step: WorkflowStepId,
    ) -> Result<TransitionResult> {
        let data = self
            .workflow
            .next_step_data(work_unit_id, target_step)
            .await
            .in_action(Action::AdvanceWorkFlowStep)?;

        let result = self
            .workflow
            .transition_to_step(work_unit_id, target_step, &data)
            .await
            .in_action(Action::AdvanceWorkFlowStep)?;

        if result.success {
            tracing::info!(
                work_unit_id = %work_unit_id,
                step_to_id = %target_step,
                "Aggregate advanced"
            );
        } else {
            tracing::warn!(
                work_unit_id = %work_unit_id,
                step_to_id = %target_step,
                reasons = %result.joined_messages(),
                "Aggregate advancement refused"
            );
        }
        Ok(result)
    }
}

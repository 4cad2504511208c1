//! Actions that follow a successful advancement

use crate::adapters::store::{AnalysisEnricher, SampleRepository};
use crate::core::skiplot::trace::{Action, ActionContext};
use crate::domain::ids::AnalysisGroupId;
use crate::domain::{EquivalencySampleType, Result, Sample};
use std::sync::Arc;

pub struct PostAdvancementActions {
    samples: Arc<dyn SampleRepository>,
    analyses: Arc<dyn AnalysisEnricher>,
}

impl PostAdvancementActions {
    pub fn new(samples: Arc<dyn SampleRepository>, analyses: Arc<dyn AnalysisEnricher>) -> Self {
        Self { samples, analyses }
    }

    /// Prepend `prefix` to the sample identification and persist it
    ///
    /// Returns the new identification.
    pub async fn relabel(&self, sample: &Sample, prefix: &str) -> Result<String> {
        let identification = sample.prefixed_identification(prefix);
        self.samples
            .update_identification(sample.id, &identification)
            .await
            .in_action(Action::ChangeSampleIdentification)?;

        tracing::info!(
            sample_id = %sample.id,
            identification = %identification,
            "Sample relabelled"
        );
        Ok(identification)
    }

    /// Request the analyses of the mapped analysis group for the sample
    ///
    /// Mappings without an external id, or with one that is not a positive
    /// integer, are skipped.
    pub async fn propagate_analyses(
        &self,
        sample: &Sample,
        mapping: &EquivalencySampleType,
    ) -> Result<Option<AnalysisGroupId>> {
        let Some(group) = mapping.analysis_group() else {
            tracing::debug!(
                sample_id = %sample.id,
                external_id = ?mapping.external_id,
                "No analysis group to propagate"
            );
            return Ok(None);
        };

        self.analyses
            .add_analyses_by_group(sample.id, group)
            .await
            .in_action(Action::AddAnalysesGroupAnalyses)?;

        tracing::info!(sample_id = %sample.id, analysis_group_id = %group, "Analysis group added");
        Ok(Some(group))
    }
}

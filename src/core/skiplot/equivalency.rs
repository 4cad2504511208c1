//! Equivalency resolution
//!
//! A sample type takes part in skip-lot batching when it is mapped under the
//! configured equivalency and that equivalency is active.

use crate::adapters::store::EquivalencyRepository;
use crate::core::skiplot::trace::{Action, ActionContext};
use crate::domain::ids::{EquivalencyId, SampleTypeId};
use crate::domain::{EquivalencySampleType, Result};
use std::sync::Arc;

/// Result of resolving a sample type against an equivalency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// Mapped under an active equivalency; carries the mapping for later enrichment
    Eligible(EquivalencySampleType),
    NotEligible,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible(_))
    }
}

pub struct EquivalencyResolver {
    equivalencies: Arc<dyn EquivalencyRepository>,
}

impl EquivalencyResolver {
    pub fn new(equivalencies: Arc<dyn EquivalencyRepository>) -> Self {
        Self { equivalencies }
    }

    /// Resolve the eligibility of `sample_type_id` under `equivalency_id`
    ///
    /// Has no side effects. [`Eligibility::NotEligible`] is a normal outcome.
    pub async fn resolve(
        &self,
        sample_type_id: SampleTypeId,
        equivalency_id: EquivalencyId,
    ) -> Result<Eligibility> {
        let mapping = self
            .equivalencies
            .find_active_mapping(equivalency_id, sample_type_id)
            .await
            .in_action(Action::IsSkipLoteSample)?;

        let eligibility = match mapping {
            Some(mapping) => Eligibility::Eligible(mapping),
            None => Eligibility::NotEligible,
        };

        tracing::debug!(
            sample_type_id = %sample_type_id,
            equivalency_id = %equivalency_id,
            eligible = eligibility.is_eligible(),
            "Resolved equivalency"
        );
        Ok(eligibility)
    }
}

//! Sample, sample type and equivalency records

use crate::domain::ids::{AnalysisGroupId, EquivalencyId, SampleId, SampleTypeId};
use serde::{Deserialize, Serialize};

/// Sample type
///
/// Groups samples for equivalence and aggregate matching. New aggregates inherit
/// the identification of the sample type that opened them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleType {
    pub id: SampleTypeId,
    pub identification: String,
}

/// Laboratory sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,

    /// Sample type, loaded together with the sample
    pub sample_type: SampleType,

    /// Mutable identification; receives the configured prefix after a successful advancement
    pub identification: String,

    #[serde(default)]
    pub received: bool,

    #[serde(default)]
    pub reviewed: bool,

    #[serde(default = "default_true")]
    pub active: bool,
}

impl Sample {
    /// Whether an attachment of this sample consumes batch capacity
    pub fn counts_toward_quota(&self) -> bool {
        self.active && !self.reviewed
    }

    /// Identification after the skip-lot prefix is applied
    pub fn prefixed_identification(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.identification)
    }
}

/// Equivalency group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equivalency {
    pub id: EquivalencyId,

    #[serde(default = "default_true")]
    pub active: bool,
}

/// Join of an equivalency and a sample type
///
/// Its existence under an active equivalency makes the sample type eligible for
/// skip-lot batching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalencySampleType {
    pub equivalency_id: EquivalencyId,
    pub sample_type_id: SampleTypeId,

    /// External analysis-group identifier, free text in the host
    #[serde(default)]
    pub external_id: Option<String>,
}

impl EquivalencySampleType {
    /// Analysis group to propagate, when the external id is a positive integer
    pub fn analysis_group(&self) -> Option<AnalysisGroupId> {
        AnalysisGroupId::parse_external(self.external_id.as_deref())
    }
}

fn default_true() -> bool {
    true
}

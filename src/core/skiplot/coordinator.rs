//! Skip-lot engine - orchestrates one invocation for one sample
//!
//! An invocation loads its parameters, checks that the sample is received, resolves
//! its eligibility, then locates, fills and possibly advances the batch the sample
//! belongs to. Every step runs under an [`Action`] label; whatever happens, exactly
//! one audit entry is written at the end.

use crate::adapters::store::LimsPorts;
use crate::config::TaskOptions;
use crate::core::skiplot::accumulator::{decide, BatchAccumulator, BatchDecision, Placement};
use crate::core::skiplot::advancer::WorkflowAdvancer;
use crate::core::skiplot::equivalency::{Eligibility, EquivalencyResolver};
use crate::core::skiplot::locator::BatchLocator;
use crate::core::skiplot::notifier::{
    advancement_failed_body, advancement_failed_subject, fully_processed_body,
    fully_processed_subject, Notifier,
};
use crate::core::skiplot::post_actions::PostAdvancementActions;
use crate::core::skiplot::summary::{InvocationOutcome, InvocationReport};
use crate::core::skiplot::trace::{Action, ActionContext, ActionTrace};
use crate::domain::ids::SampleId;
use crate::domain::{
    cause_chain, AuditEntry, BatchKey, EquivalencySampleType, Result, Sample, SkipLotError,
    WorkUnit,
};
use serde_json::Value;
use std::time::Instant;

/// Friendly message used when an invocation fails before tracing anything
const GENERIC_FAILURE_MESSAGE: &str = "Error when executing task.";

/// Inputs of one invocation as handed over by the host
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteParameters {
    /// Invocation content, `{"SampleId": <int|null>}`
    pub content: Value,

    /// Task options block with the host's PascalCase keys
    pub config: Value,
}

impl ExecuteParameters {
    pub fn new(content: Value, config: Value) -> Self {
        Self { content, config }
    }

    /// Parameters for a single sample id
    pub fn for_sample(sample_id: SampleId, config: Value) -> Self {
        Self::new(serde_json::json!({ "SampleId": sample_id.get() }), config)
    }
}

/// Skip-lot engine
///
/// Holds no state between invocations besides the injected ports.
#[derive(Clone)]
pub struct SkipLotEngine {
    ports: LimsPorts,
}

impl SkipLotEngine {
    pub fn new(ports: LimsPorts) -> Self {
        Self { ports }
    }

    /// Run one invocation
    ///
    /// Never returns an error: faults are turned into a `Failed` outcome and an
    /// error-level audit entry.
    pub async fn execute(&self, params: ExecuteParameters) -> InvocationReport {
        let start_time = Instant::now();
        let mut trace = ActionTrace::new();

        let (outcome, audit) = match self.run(&params, &mut trace).await {
            Ok((outcome, audit)) => (outcome, audit),
            Err(error) => failure(error, &trace),
        };

        let audit_recorded = match self.ports.audit.record(&audit).await {
            Ok(()) => true,
            Err(e) => {
                crate::log_error_with_context!(e, "Failed to record audit entry");
                false
            }
        };

        let report = InvocationReport {
            outcome,
            audit,
            audit_recorded,
            duration: start_time.elapsed(),
        };
        report.log_summary();
        report
    }

    async fn run(
        &self,
        params: &ExecuteParameters,
        trace: &mut ActionTrace,
    ) -> Result<(InvocationOutcome, AuditEntry)> {
        let options =
            TaskOptions::from_value(params.config.clone()).in_action(Action::LoadParameters)?;
        let Some(sample_id) =
            sample_id_from_content(&params.content).in_action(Action::LoadParameters)?
        else {
            tracing::warn!("Invocation content has no SampleId");
            return Ok((
                InvocationOutcome::NoSample,
                AuditEntry::warning(
                    "SampleId not supplied in the task content.",
                    "No sample to process.",
                ),
            ));
        };

        crate::log_invocation_start!(sample_id);

        let received = self
            .ports
            .samples
            .is_received(sample_id)
            .await
            .in_action(Action::IsSampleReceived)?;
        if !received {
            tracing::info!(sample_id = %sample_id, "Sample not received, nothing to do");
            trace.push(format!("Sample Id: {sample_id}<br>Sample not received"));
            return Ok((
                InvocationOutcome::NotReceived { sample_id },
                AuditEntry::informational(trace.friendly_message()),
            ));
        }

        let sample = self
            .ports
            .samples
            .find_sample(sample_id)
            .await
            .and_then(|found| found.ok_or(SkipLotError::SampleNotFound(sample_id)))
            .in_action(Action::GetSample)?;
        trace.push(format!(
            "Sample Id: {}<br>Sample type: {}",
            sample.id, sample.sample_type.identification
        ));

        let eligibility = EquivalencyResolver::new(self.ports.equivalencies.clone())
            .resolve(sample.sample_type.id, options.equivalency_id)
            .await?;

        let key = BatchKey::new(
            options.work_master_id,
            sample.sample_type.identification.clone(),
        );
        self.ports
            .aggregates
            .lock_batch(&key)
            .await
            .in_action(Action::LockBatch)?;
        tracing::debug!(batch = %key, "Batch locked");

        let processed = self.process(&options, &sample, eligibility, trace).await;

        let unlocked = self
            .ports
            .aggregates
            .unlock_batch(&key)
            .await
            .in_action(Action::UnlockBatch);

        let outcome = match (processed, unlocked) {
            (Ok(outcome), Ok(())) => outcome,
            (Ok(_), Err(unlock_error)) => return Err(unlock_error),
            (Err(error), unlocked) => {
                if let Err(unlock_error) = unlocked {
                    crate::log_error_with_context!(unlock_error, "Failed to release batch lock");
                }
                return Err(error);
            }
        };
        tracing::debug!(batch = %key, "Batch unlocked");

        Ok((outcome, AuditEntry::informational(trace.friendly_message())))
    }

    /// Place the sample in its batch; runs while the batch lock is held
    async fn process(
        &self,
        options: &TaskOptions,
        sample: &Sample,
        eligibility: Eligibility,
        trace: &mut ActionTrace,
    ) -> Result<InvocationOutcome> {
        let accumulator = BatchAccumulator::new(self.ports.aggregates.clone());

        let mapping = match eligibility {
            Eligibility::Eligible(mapping) => mapping,
            Eligibility::NotEligible => {
                tracing::info!(
                    sample_id = %sample.id,
                    "Sample type is not skip-lot, creating standalone aggregate"
                );
                return Ok(
                    match accumulator.create_aggregate(options, sample).await? {
                        Placement::Created(work_unit) => {
                            trace.push(format!("New aggregate Id: {}", work_unit.id));
                            InvocationOutcome::Standalone {
                                sample_id: sample.id,
                                work_unit_id: work_unit.id,
                            }
                        }
                        Placement::Existing(work_unit_id) => {
                            trace.push(format!("Aggregate found Id: {work_unit_id}"));
                            InvocationOutcome::AlreadyAttached {
                                sample_id: sample.id,
                                work_unit_id,
                            }
                        }
                    },
                );
            }
        };

        let open = BatchLocator::new(self.ports.aggregates.clone())
            .find_open_aggregate(
                options.work_master_id,
                &sample.sample_type.identification,
                options.work_final_step_id,
            )
            .await?;

        let Some(work_unit) = open else {
            return self.create_new(&accumulator, options, sample, trace).await;
        };
        trace.push(format!("Aggregate found Id: {}", work_unit.id));

        let counted = accumulator.counted_samples(work_unit.id).await?;
        trace.push(format!("Attached samples: {counted}"));
        let attached = accumulator.is_attached(work_unit.id, sample.id).await?;

        match decide(counted, options.quota, attached) {
            BatchDecision::CreateNew => {
                tracing::warn!(
                    work_unit_id = %work_unit.id,
                    counted,
                    quota = options.quota,
                    "Aggregate holds more samples than the quota, starting a new one"
                );
                self.create_new(&accumulator, options, sample, trace).await
            }
            BatchDecision::AlreadyAttached => Ok(InvocationOutcome::AlreadyAttached {
                sample_id: sample.id,
                work_unit_id: work_unit.id,
            }),
            BatchDecision::Attach => {
                accumulator.attach(work_unit.id, sample.id).await?;
                Ok(InvocationOutcome::Attached {
                    sample_id: sample.id,
                    work_unit_id: work_unit.id,
                })
            }
            BatchDecision::Advance => {
                self.complete_batch(&accumulator, options, sample, &mapping, &work_unit, trace)
                    .await
            }
        }
    }

    async fn create_new(
        &self,
        accumulator: &BatchAccumulator,
        options: &TaskOptions,
        sample: &Sample,
        trace: &mut ActionTrace,
    ) -> Result<InvocationOutcome> {
        Ok(match accumulator.create_aggregate(options, sample).await? {
            Placement::Created(work_unit) => {
                trace.push(format!("New aggregate Id: {}", work_unit.id));
                InvocationOutcome::Created {
                    sample_id: sample.id,
                    work_unit_id: work_unit.id,
                }
            }
            Placement::Existing(work_unit_id) => InvocationOutcome::AlreadyAttached {
                sample_id: sample.id,
                work_unit_id,
            },
        })
    }

    /// Advance the aggregate, then attach the sample and run the follow-up actions
    ///
    /// When the host refuses the transition the sample stays unattached and a
    /// warning is sent instead.
    async fn complete_batch(
        &self,
        accumulator: &BatchAccumulator,
        options: &TaskOptions,
        sample: &Sample,
        mapping: &EquivalencySampleType,
        work_unit: &WorkUnit,
        trace: &mut ActionTrace,
    ) -> Result<InvocationOutcome> {
        let notifier = Notifier::new(self.ports.messages.clone(), options.notification.clone())?;

        let result = WorkflowAdvancer::new(self.ports.workflow.clone())
            .advance(work_unit.id, options.work_final_step_id)
            .await?;

        if !result.success {
            let reasons = result.joined_messages();
            trace.push(format!(
                "Error finalizing aggregate: {} - {}",
                work_unit.id, reasons
            ));
            notifier
                .notify(
                    sample.id,
                    &advancement_failed_subject(sample.id, work_unit.id),
                    &advancement_failed_body(work_unit.id, &reasons),
                )
                .await?;
            return Ok(InvocationOutcome::AdvancementFailed {
                sample_id: sample.id,
                work_unit_id: work_unit.id,
                reasons: result.messages,
            });
        }

        accumulator.attach(work_unit.id, sample.id).await?;

        let prefix = &options.sample_identification_prefix;
        notifier
            .notify(
                sample.id,
                &fully_processed_subject(sample.id, prefix),
                &fully_processed_body(sample.id),
            )
            .await?;

        let post_actions =
            PostAdvancementActions::new(self.ports.samples.clone(), self.ports.analyses.clone());
        let identification = post_actions.relabel(sample, prefix).await?;
        post_actions.propagate_analyses(sample, mapping).await?;

        Ok(InvocationOutcome::Advanced {
            sample_id: sample.id,
            work_unit_id: work_unit.id,
            identification,
        })
    }
}

/// Read the sample id from the invocation content
///
/// A missing or null `SampleId` is `None`; numeric strings are accepted.
pub fn sample_id_from_content(content: &Value) -> Result<Option<SampleId>> {
    let invalid = |value: &Value| {
        SkipLotError::Configuration(format!("Parameter \"SampleId\" is invalid: {value}"))
    };

    let Some(value) = content.get("SampleId") else {
        return Ok(None);
    };

    match value {
        Value::Null => Ok(None),
        Value::Number(number) => {
            let raw = number.as_i64().ok_or_else(|| invalid(value))?;
            SampleId::new(raw).map(Some).map_err(|_| invalid(value))
        }
        Value::String(text) if text.trim().is_empty() => Ok(None),
        Value::String(text) => text.parse::<SampleId>().map(Some).map_err(|_| invalid(value)),
        _ => Err(invalid(value)),
    }
}

/// Outcome and audit entry for a failed invocation
fn failure(error: SkipLotError, trace: &ActionTrace) -> (InvocationOutcome, AuditEntry) {
    crate::log_error_with_context!(error, "Skip-lot invocation failed");

    let configuration = error.is_configuration();
    let (action, chain) = match &error {
        SkipLotError::Action { action, source } => (Some(action.clone()), cause_chain(&**source)),
        other => (None, cause_chain(other)),
    };

    let friendly = if trace.lines().is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        trace.friendly_message()
    };
    let audit = AuditEntry::error(action.as_deref().unwrap_or("Execute"), &chain, friendly);

    (
        InvocationOutcome::Failed {
            action,
            error: chain.join(" "),
            configuration,
        },
        audit,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!({"SampleId": 12}) => Some(12) ; "number")]
    #[test_case(json!({"SampleId": "12"}) => Some(12) ; "numeric string")]
    #[test_case(json!({"SampleId": null}) => None ; "null")]
    #[test_case(json!({}) => None ; "missing")]
    #[test_case(json!({"SampleId": ""}) => None ; "empty string")]
    fn test_sample_id_from_content(content: Value) -> Option<i64> {
        sample_id_from_content(&content).unwrap().map(|id| id.get())
    }

    #[test_case(json!({"SampleId": 0}) ; "zero")]
    #[test_case(json!({"SampleId": -3}) ; "negative")]
    #[test_case(json!({"SampleId": "abc"}) ; "text")]
    #[test_case(json!({"SampleId": [1]}) ; "array")]
    fn test_invalid_sample_id_is_configuration_error(content: Value) {
        let err = sample_id_from_content(&content).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_failure_uses_action_and_source_chain() {
        let error = SkipLotError::Notification("mail relay down".to_string())
            .in_action(Action::SendMessage.as_str());
        let mut trace = ActionTrace::new();
        trace.push("Sample Id: 4<br>Sample type: Water");

        let (outcome, audit) = failure(error, &trace);

        assert_eq!(
            outcome,
            InvocationOutcome::Failed {
                action: Some("SendMessage".to_string()),
                error: "Notification error: mail relay down".to_string(),
                configuration: false,
            }
        );
        assert_eq!(
            audit.message,
            "Action that raised the error: SendMessage <br>Notification error: mail relay down"
        );
        assert_eq!(audit.friendly_message, "Sample Id: 4<br>Sample type: Water");
    }

    #[test]
    fn test_failure_without_trace_uses_generic_message() {
        let message = "Parameter \"WorkMasterId\" not configured.".to_string();
        let error =
            SkipLotError::Configuration(message).in_action(Action::LoadParameters.as_str());
        let (outcome, audit) = failure(error, &ActionTrace::new());

        assert!(outcome.is_configuration_error());
        assert_eq!(audit.friendly_message, GENERIC_FAILURE_MESSAGE);
    }
}

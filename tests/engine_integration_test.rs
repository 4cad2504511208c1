//! Integration tests for the skip-lot engine against the in-memory store

use async_trait::async_trait;
use serde_json::{json, Value};
use skiplot::adapters::memory::{
    AccountEmail, BlockedTransition, MemoryFixture, MemoryStore,
};
use skiplot::adapters::store::{AggregateRepository, LimsPorts};
use skiplot::core::skiplot::{ExecuteParameters, InvocationOutcome, SkipLotEngine};
use skiplot::domain::{
    AccountId, AuditLevel, BatchKey, Equivalency, EquivalencyId, EquivalencySampleType,
    MailingListId, MailingListRecipient, NewWorkUnit, Result, Sample, SampleId, SampleType,
    SampleTypeId, StoreError, WorkMasterId, WorkSample, WorkUnit, WorkUnitId, WorkflowStepId,
};
use std::sync::Arc;
use test_case::test_case;

const WATER: i64 = 1;
const SOIL: i64 = 2;
const MASTER: i64 = 2;
const INITIAL_STEP: i64 = 10;
const FINAL_STEP: i64 = 40;

fn task(quota: i64) -> Value {
    json!({
        "EquivalencyId": 3,
        "SkipLoteSampleQty": quota,
        "WorkFinalSetpId": FINAL_STEP,
        "WorkInitialSetpId": INITIAL_STEP,
        "WorkMasterId": MASTER,
        "SampleIdentification": "SKIP-"
    })
}

fn mailing_list_task(quota: i64) -> Value {
    let mut config = task(quota);
    config["MailingListId"] = json!(8);
    config["MailFrom"] = json!("lims@example.com");
    config["MessageTypeId"] = json!(1);
    config
}

fn sample_type(id: i64) -> SampleType {
    SampleType {
        id: SampleTypeId::new(id).unwrap(),
        identification: if id == WATER { "Water" } else { "Soil" }.to_string(),
    }
}

fn sample(id: i64, type_id: i64) -> Sample {
    Sample {
        id: SampleId::new(id).unwrap(),
        sample_type: sample_type(type_id),
        identification: format!("S-{id}"),
        received: true,
        reviewed: false,
        active: true,
    }
}

fn work_unit(id: i64, step: i64) -> WorkUnit {
    WorkUnit {
        id: WorkUnitId::new(id).unwrap(),
        master_id: WorkMasterId::new(MASTER).unwrap(),
        identification: "Water".to_string(),
        current_step_id: WorkflowStepId::new(step).unwrap(),
        finish_date_time: None,
        active: true,
    }
}

fn attach(fixture: &mut MemoryFixture, work_unit_id: i64, sample_id: i64) {
    fixture.work_samples.push(WorkSample {
        work_unit_id: WorkUnitId::new(work_unit_id).unwrap(),
        sample_id: SampleId::new(sample_id).unwrap(),
    });
}

/// Water is mapped under active equivalency 3 with analysis group 15; soil is not mapped
fn base_fixture() -> MemoryFixture {
    MemoryFixture {
        equivalencies: vec![Equivalency {
            id: EquivalencyId::new(3).unwrap(),
            active: true,
        }],
        equivalency_sample_types: vec![EquivalencySampleType {
            equivalency_id: EquivalencyId::new(3).unwrap(),
            sample_type_id: SampleTypeId::new(WATER).unwrap(),
            external_id: Some("15".to_string()),
        }],
        ..Default::default()
    }
}

/// Open aggregate 77 holding samples 1 and 2, plus incoming sample 3
fn batch_fixture() -> MemoryFixture {
    let mut fixture = base_fixture();
    fixture.samples = vec![sample(1, WATER), sample(2, WATER), sample(3, WATER)];
    fixture.work_units = vec![work_unit(77, INITIAL_STEP)];
    attach(&mut fixture, 77, 1);
    attach(&mut fixture, 77, 2);
    fixture
}

fn engine_for(fixture: MemoryFixture) -> (Arc<MemoryStore>, SkipLotEngine) {
    let store = Arc::new(MemoryStore::new(fixture));
    let engine = SkipLotEngine::new(store.clone().into_ports());
    (store, engine)
}

fn params(sample_id: i64, config: Value) -> ExecuteParameters {
    ExecuteParameters::for_sample(SampleId::new(sample_id).unwrap(), config)
}

#[tokio::test]
async fn test_quota_of_one_is_rejected_before_any_change() {
    let fixture = batch_fixture();
    let (store, engine) = engine_for(fixture.clone());

    let report = engine.execute(params(3, task(1))).await;

    assert!(report.outcome.is_configuration_error());
    assert_eq!(report.exit_code(), 2);
    assert_eq!(report.audit.level, AuditLevel::Error);
    assert!(report
        .audit
        .message
        .starts_with("Action that raised the error: LoadParameters"));
    assert!(report.audit.message.contains("SkipLoteSampleQty"));

    let after = store.snapshot().await;
    assert_eq!(after.mutation_count(&fixture), 0);
    assert_eq!(after.audit_log.len(), 1);
}

#[tokio::test]
async fn test_unreceived_sample_is_left_untouched() {
    let mut fixture = batch_fixture();
    fixture.samples[2].received = false;
    let (store, engine) = engine_for(fixture.clone());

    let report = engine.execute(params(3, task(3))).await;

    assert_eq!(
        report.outcome,
        InvocationOutcome::NotReceived {
            sample_id: SampleId::new(3).unwrap()
        }
    );
    assert_eq!(report.audit.level, AuditLevel::Informational);
    assert_eq!(store.snapshot().await.mutation_count(&fixture), 0);
}

#[tokio::test]
async fn test_missing_sample_id_records_warning() {
    let fixture = batch_fixture();
    let (store, engine) = engine_for(fixture.clone());

    let report = engine
        .execute(ExecuteParameters::new(json!({"SampleId": null}), task(3)))
        .await;

    assert_eq!(report.outcome, InvocationOutcome::NoSample);
    assert_eq!(report.audit.level, AuditLevel::Warning);
    assert_eq!(report.exit_code(), 0);

    let after = store.snapshot().await;
    assert_eq!(after.mutation_count(&fixture), 0);
    assert_eq!(after.audit_log.len(), 1);
}

#[tokio::test]
async fn test_ineligible_sample_gets_standalone_aggregate() {
    let mut fixture = base_fixture();
    fixture.samples = vec![sample(5, SOIL)];
    let (store, engine) = engine_for(fixture);

    let report = engine.execute(params(5, task(3))).await;

    let InvocationOutcome::Standalone { work_unit_id, .. } = report.outcome else {
        panic!("unexpected outcome: {:?}", report.outcome);
    };

    let after = store.snapshot().await;
    let created = after.work_unit(work_unit_id).unwrap();
    assert_eq!(created.identification, "Soil");
    assert_eq!(created.current_step_id.get(), INITIAL_STEP);
    assert_eq!(
        after.attached_samples(work_unit_id),
        vec![SampleId::new(5).unwrap()]
    );
    assert!(after.transition_attempts.is_empty());
    assert_eq!(after.samples[0].identification, "S-5");
    assert!(report
        .audit
        .friendly_message
        .contains(&format!("New aggregate Id: {work_unit_id}")));
}

#[tokio::test]
async fn test_reinvoking_ineligible_sample_creates_no_second_aggregate() {
    let mut fixture = base_fixture();
    fixture.samples = vec![sample(5, SOIL)];
    let (store, engine) = engine_for(fixture);

    engine.execute(params(5, task(3))).await;
    let report = engine.execute(params(5, task(3))).await;

    assert!(matches!(
        report.outcome,
        InvocationOutcome::AlreadyAttached { .. }
    ));
    let after = store.snapshot().await;
    assert_eq!(after.work_units.len(), 1);
    assert_eq!(after.work_samples.len(), 1);
}

#[tokio::test]
async fn test_completing_batch_advances_and_relabels() {
    let fixture = batch_fixture();
    let (store, engine) = engine_for(fixture.clone());

    let report = engine.execute(params(3, task(3))).await;

    assert_eq!(
        report.outcome,
        InvocationOutcome::Advanced {
            sample_id: SampleId::new(3).unwrap(),
            work_unit_id: WorkUnitId::new(77).unwrap(),
            identification: "SKIP-S-3".to_string(),
        }
    );

    let after = store.snapshot().await;
    let work_unit_id = WorkUnitId::new(77).unwrap();
    assert_eq!(after.attached_samples(work_unit_id).len(), 3);
    assert_eq!(
        after.work_samples.len() - fixture.work_samples.len(),
        1,
        "exactly one new attachment"
    );
    assert_eq!(
        after.work_unit(work_unit_id).unwrap().current_step_id.get(),
        FINAL_STEP
    );
    assert_eq!(
        after.sample(SampleId::new(3).unwrap()).unwrap().identification,
        "SKIP-S-3"
    );

    assert_eq!(after.thread_messages.len(), 1);
    assert_eq!(after.thread_messages[0].message.subject, "Sample #3 - SKIP-");
    assert_eq!(
        after.thread_messages[0].message.html,
        "Sample ID 3 must be fully processed."
    );

    assert_eq!(after.added_analysis_groups.len(), 1);
    assert_eq!(after.added_analysis_groups[0].analysis_group_id.get(), 15);

    assert_eq!(report.audit.level, AuditLevel::Informational);
    assert_eq!(
        report.audit.friendly_message,
        "Sample Id: 3<br>Sample type: Water<br>Aggregate found Id: 77<br>Attached samples: 2"
    );
}

#[tokio::test]
async fn test_refused_advancement_leaves_sample_unattached() {
    let mut fixture = batch_fixture();
    fixture.blocked_transitions = vec![BlockedTransition {
        work_unit_id: WorkUnitId::new(77).unwrap(),
        messages: vec![
            "Pending analyses".to_string(),
            "Missing signature".to_string(),
        ],
    }];
    let (store, engine) = engine_for(fixture.clone());

    let report = engine.execute(params(3, task(3))).await;

    assert!(matches!(
        report.outcome,
        InvocationOutcome::AdvancementFailed { ref reasons, .. } if reasons.len() == 2
    ));
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.audit.level, AuditLevel::Informational);
    assert!(report
        .audit
        .friendly_message
        .ends_with("Error finalizing aggregate: 77 - Pending analyses; Missing signature"));

    let after = store.snapshot().await;
    assert_eq!(after.work_samples.len(), fixture.work_samples.len());
    assert_eq!(
        after.sample(SampleId::new(3).unwrap()).unwrap().identification,
        "S-3"
    );
    assert!(after.added_analysis_groups.is_empty());
    assert_eq!(after.transition_attempts.len(), 1);

    assert_eq!(after.thread_messages.len(), 1);
    let warning = &after.thread_messages[0].message;
    assert_eq!(warning.subject, "Sample #3 - Problem finalizing Aggregate #77");
    assert!(warning
        .html
        .contains("Error: Pending analyses; Missing signature<br><br>Fix the problem"));
}

#[tokio::test]
async fn test_refused_sample_can_be_retried() {
    let mut fixture = batch_fixture();
    fixture.blocked_transitions = vec![BlockedTransition {
        work_unit_id: WorkUnitId::new(77).unwrap(),
        messages: vec!["Pending analyses".to_string()],
    }];
    let store = Arc::new(MemoryStore::new(fixture));
    let engine = SkipLotEngine::new(store.clone().into_ports());

    engine.execute(params(3, task(3))).await;

    // Host-side problem fixed, rerun the task
    let mut unblocked = store.snapshot().await;
    unblocked.blocked_transitions.clear();
    let (store, engine) = engine_for(unblocked);

    let report = engine.execute(params(3, task(3))).await;

    assert!(matches!(report.outcome, InvocationOutcome::Advanced { .. }));
    assert_eq!(
        store
            .snapshot()
            .await
            .attached_samples(WorkUnitId::new(77).unwrap())
            .len(),
        3
    );
}

#[tokio::test]
async fn test_below_quota_attaches_only() {
    let fixture = batch_fixture();
    let (store, engine) = engine_for(fixture);

    let report = engine.execute(params(3, task(5))).await;

    assert_eq!(
        report.outcome,
        InvocationOutcome::Attached {
            sample_id: SampleId::new(3).unwrap(),
            work_unit_id: WorkUnitId::new(77).unwrap(),
        }
    );
    let after = store.snapshot().await;
    assert_eq!(after.attached_samples(WorkUnitId::new(77).unwrap()).len(), 3);
    assert!(after.transition_attempts.is_empty());
    assert!(after.thread_messages.is_empty());
}

#[tokio::test]
async fn test_reviewed_and_inactive_samples_do_not_count() {
    let mut fixture = batch_fixture();
    fixture.samples[0].reviewed = true;
    fixture.samples.push(Sample {
        active: false,
        ..sample(4, WATER)
    });
    attach(&mut fixture, 77, 4);
    let (store, engine) = engine_for(fixture);

    // 4 attachments, only sample 2 counts: 1 + 1 < 3
    let report = engine.execute(params(3, task(3))).await;

    assert!(matches!(report.outcome, InvocationOutcome::Attached { .. }));
    assert!(store.snapshot().await.transition_attempts.is_empty());
    assert!(report.audit.friendly_message.contains("Attached samples: 1"));
}

#[tokio::test]
async fn test_already_attached_sample_is_not_duplicated() {
    let mut fixture = batch_fixture();
    attach(&mut fixture, 77, 3);
    let (store, engine) = engine_for(fixture.clone());

    let report = engine.execute(params(3, task(5))).await;

    assert!(matches!(
        report.outcome,
        InvocationOutcome::AlreadyAttached { .. }
    ));
    assert_eq!(store.snapshot().await.mutation_count(&fixture), 0);
}

#[tokio::test]
async fn test_overfull_aggregate_starts_new_one() {
    let mut fixture = batch_fixture();
    for id in 4..=7 {
        fixture.samples.push(sample(id, WATER));
        attach(&mut fixture, 77, id);
    }
    fixture.samples.push(sample(8, WATER));
    let (store, engine) = engine_for(fixture);

    // 6 counted attachments against a quota of 5
    let report = engine.execute(params(8, task(5))).await;

    let InvocationOutcome::Created { work_unit_id, .. } = report.outcome else {
        panic!("unexpected outcome: {:?}", report.outcome);
    };
    assert_ne!(work_unit_id.get(), 77);

    let after = store.snapshot().await;
    assert_eq!(after.work_units.len(), 2);
    assert_eq!(
        after.attached_samples(work_unit_id),
        vec![SampleId::new(8).unwrap()]
    );
    assert!(after.transition_attempts.is_empty());
}

#[tokio::test]
async fn test_no_open_aggregate_creates_one() {
    let mut fixture = batch_fixture();
    // Aggregate 77 already reached the final step
    fixture.work_units[0].current_step_id = WorkflowStepId::new(FINAL_STEP).unwrap();
    let (store, engine) = engine_for(fixture);

    let report = engine.execute(params(3, task(3))).await;

    let InvocationOutcome::Created { work_unit_id, .. } = report.outcome else {
        panic!("unexpected outcome: {:?}", report.outcome);
    };
    let after = store.snapshot().await;
    let created = after.work_unit(work_unit_id).unwrap();
    assert_eq!(created.identification, "Water");
    assert_eq!(created.current_step_id.get(), INITIAL_STEP);
}

#[tokio::test]
async fn test_inactive_equivalency_is_not_eligible() {
    let mut fixture = batch_fixture();
    fixture.equivalencies[0].active = false;
    let (store, engine) = engine_for(fixture);

    let report = engine.execute(params(3, task(3))).await;

    let InvocationOutcome::Standalone { work_unit_id, .. } = report.outcome else {
        panic!("unexpected outcome: {:?}", report.outcome);
    };
    assert_ne!(work_unit_id.get(), 77);
    let after = store.snapshot().await;
    assert_eq!(after.attached_samples(WorkUnitId::new(77).unwrap()).len(), 2);
    assert!(after.transition_attempts.is_empty());
}

#[tokio::test]
async fn test_mailing_list_messages_per_recipient() {
    let mut fixture = batch_fixture();
    let list = MailingListId::new(8).unwrap();
    fixture.mailing_list_recipients = vec![
        MailingListRecipient {
            mailing_list_id: list,
            email: Some("qa@example.com".to_string()),
            account_id: None,
        },
        MailingListRecipient {
            mailing_list_id: list,
            email: None,
            account_id: Some(AccountId::new(21).unwrap()),
        },
        MailingListRecipient {
            mailing_list_id: list,
            email: None,
            account_id: None,
        },
    ];
    fixture.account_emails = vec![AccountEmail {
        email: "QA@example.com".to_string(),
        account_id: AccountId::new(20).unwrap(),
    }];
    let (store, engine) = engine_for(fixture);

    let report = engine.execute(params(3, mailing_list_task(3))).await;
    assert!(matches!(report.outcome, InvocationOutcome::Advanced { .. }));

    let after = store.snapshot().await;
    assert_eq!(after.messages.len(), 2);
    assert_eq!(after.files.len(), 2);
    assert_eq!(after.sample_messages.len(), 2);
    assert!(after.thread_messages.is_empty());

    let accounts: Vec<Option<i64>> = after
        .messages
        .iter()
        .map(|m| m.recipients[0].account_to_id.map(|a| a.get()))
        .collect();
    assert_eq!(accounts, vec![Some(20), Some(21)]);

    let first = &after.messages[0].message;
    assert_eq!(first.subject, "Sample #3 - SKIP-");
    assert_eq!(first.email_from, "lims@example.com");
    assert_eq!(first.text_plain, "Sample ID 3 must be fully processed.");
    assert!(first.active);
    assert!(!first.draft);
    assert!(first.identifier.is_empty());
    assert_ne!(after.messages[0].message.message_uid, after.messages[1].message.message_uid);

    assert_eq!(
        after.files[0].file.identification,
        "Automatic message sent by custom task"
    );
    assert_eq!(after.files[0].file.category, "html");
}

#[tokio::test]
async fn test_identification_starting_with_prefix_is_still_relabelled() {
    let mut fixture = batch_fixture();
    fixture.samples[2].identification = "SKIP-RIVER-7".to_string();
    let (store, engine) = engine_for(fixture);

    let report = engine.execute(params(3, task(3))).await;

    assert!(matches!(
        report.outcome,
        InvocationOutcome::Advanced { ref identification, .. }
            if identification == "SKIP-SKIP-RIVER-7"
    ));
    assert_eq!(
        store
            .snapshot()
            .await
            .sample(SampleId::new(3).unwrap())
            .unwrap()
            .identification,
        "SKIP-SKIP-RIVER-7"
    );
}

#[test_case(None ; "no external id")]
#[test_case(Some("GRP-15") ; "non numeric external id")]
#[test_case(Some("0") ; "zero external id")]
#[tokio::test]
async fn test_unmapped_analysis_group_is_skipped(external_id: Option<&str>) {
    let mut fixture = batch_fixture();
    fixture.equivalency_sample_types[0].external_id = external_id.map(str::to_string);
    let (store, engine) = engine_for(fixture);

    let report = engine.execute(params(3, task(3))).await;

    assert!(matches!(report.outcome, InvocationOutcome::Advanced { .. }));
    let after = store.snapshot().await;
    assert!(after.added_analysis_groups.is_empty());
    assert_eq!(
        after.sample(SampleId::new(3).unwrap()).unwrap().identification,
        "SKIP-S-3"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invocations_advance_once() {
    let mut fixture = base_fixture();
    fixture.samples = vec![sample(1, WATER), sample(2, WATER), sample(3, WATER)];
    fixture.work_units = vec![work_unit(77, INITIAL_STEP)];
    attach(&mut fixture, 77, 1);
    let (store, engine) = engine_for(fixture);

    let first = engine.clone();
    let second = engine.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.execute(params(2, task(3))).await }),
        tokio::spawn(async move { second.execute(params(3, task(3))).await }),
    );
    let outcomes = [a.unwrap().outcome, b.unwrap().outcome];

    let advanced = outcomes
        .iter()
        .filter(|o| matches!(o, InvocationOutcome::Advanced { .. }))
        .count();
    let attached = outcomes
        .iter()
        .filter(|o| matches!(o, InvocationOutcome::Attached { .. }))
        .count();
    assert_eq!((advanced, attached), (1, 1));

    let after = store.snapshot().await;
    assert_eq!(after.transition_attempts.len(), 1);
    assert_eq!(after.attached_samples(WorkUnitId::new(77).unwrap()).len(), 3);
}

/// Aggregate repository whose quota count always fails
struct FailingCount {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl AggregateRepository for FailingCount {
    async fn find_open_aggregate(
        &self,
        master_id: WorkMasterId,
        identification: &str,
        final_step: WorkflowStepId,
    ) -> Result<Option<WorkUnit>> {
        self.inner
            .find_open_aggregate(master_id, identification, final_step)
            .await
    }

    async fn count_counted_samples(&self, _work_unit_id: WorkUnitId) -> Result<usize> {
        Err(StoreError::ConnectionFailed("connection reset by peer".to_string()).into())
    }

    async fn is_attached(&self, work_unit_id: WorkUnitId, sample_id: SampleId) -> Result<bool> {
        self.inner.is_attached(work_unit_id, sample_id).await
    }

    async fn find_attachment_for_sample(
        &self,
        master_id: WorkMasterId,
        sample_id: SampleId,
    ) -> Result<Option<WorkUnitId>> {
        self.inner.find_attachment_for_sample(master_id, sample_id).await
    }

    async fn create_aggregate(&self, new_work_unit: &NewWorkUnit) -> Result<WorkUnit> {
        self.inner.create_aggregate(new_work_unit).await
    }

    async fn attach_sample(&self, work_unit_id: WorkUnitId, sample_id: SampleId) -> Result<bool> {
        self.inner.attach_sample(work_unit_id, sample_id).await
    }

    async fn lock_batch(&self, key: &BatchKey) -> Result<()> {
        self.inner.lock_batch(key).await
    }

    async fn unlock_batch(&self, key: &BatchKey) -> Result<()> {
        self.inner.unlock_batch(key).await
    }
}

#[tokio::test]
async fn test_store_fault_records_error_with_action() {
    let fixture = batch_fixture();
    let store = Arc::new(MemoryStore::new(fixture.clone()));
    let ports = LimsPorts {
        aggregates: Arc::new(FailingCount {
            inner: store.clone(),
        }),
        ..store.clone().into_ports()
    };
    let engine = SkipLotEngine::new(ports);

    let report = engine.execute(params(3, task(3))).await;

    assert!(report.outcome.is_failure());
    assert_eq!(report.exit_code(), 5);
    assert_eq!(report.audit.level, AuditLevel::Error);
    assert_eq!(
        report.audit.message,
        "Action that raised the error: GetWorkSampleCount <br>Store error: Failed to connect to store: connection reset by peer Failed to connect to store: connection reset by peer"
    );
    assert_eq!(
        report.audit.friendly_message,
        "Sample Id: 3<br>Sample type: Water<br>Aggregate found Id: 77"
    );

    // The batch lock was released despite the fault
    let key = BatchKey::new(WorkMasterId::new(MASTER).unwrap(), "Water");
    store.lock_batch(&key).await.unwrap();
    store.unlock_batch(&key).await.unwrap();

    let after = store.snapshot().await;
    assert_eq!(after.mutation_count(&fixture), 0);
    assert_eq!(after.audit_log.len(), 1);
}

#[tokio::test]
async fn test_memory_store_persists_fixture() {
    let file = tempfile::NamedTempFile::new().unwrap();
    batch_fixture().save(file.path()).unwrap();

    let store = Arc::new(MemoryStore::from_file(file.path(), true).unwrap());
    let engine = SkipLotEngine::new(store.into_ports());
    engine.execute(params(3, task(5))).await;

    let saved = MemoryFixture::load(file.path()).unwrap();
    assert_eq!(saved.attached_samples(WorkUnitId::new(77).unwrap()).len(), 3);
    assert_eq!(saved.audit_log.len(), 1);
}

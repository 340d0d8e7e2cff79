use dms_clone::config::{RunConfig, TaskScope, TransformTable};
use dms_clone::error::{CloneError, TransformSide};
use dms_clone::model::{Endpoint, EndpointRole, MigrationType, RemapMode, ReplicationTask};
use dms_clone::remap::EndpointChange;
use dms_clone::run::{CloneRun, OutcomeKind, RunMode};
use dms_clone::service::memory::{MemoryService, ServiceCall, Snapshot};

const INSTANCE: &str = "arn:aws:dms:us-east-1:111122223333:rep:OLD";

fn endpoint(arn: &str, identifier: &str, role: EndpointRole) -> Endpoint {
    Endpoint {
        arn: arn.into(),
        identifier: identifier.into(),
        role,
        engine: Some("postgres".into()),
        status: Some("active".into()),
    }
}

fn task(identifier: &str, source: &str, target: &str) -> ReplicationTask {
    ReplicationTask {
        identifier: identifier.into(),
        source_endpoint_arn: source.into(),
        target_endpoint_arn: target.into(),
        replication_instance_arn: INSTANCE.into(),
        migration_type: MigrationType::FullLoadAndCdc,
        table_mappings: r#"{"rules":[{"rule-type":"selection"}]}"#.into(),
        task_settings: r#"{"Logging":{"EnableLogging":false,"CloudWatchLogGroup":"old-group","CloudWatchLogStream":"old-stream"}}"#.into(),
        status: Some("running".into()),
    }
}

fn table(pairs: &[(&str, &str)]) -> TransformTable {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn config(source: TransformTable, target: TransformTable) -> RunConfig {
    RunConfig {
        region: None,
        endpoint_url: None,
        operation_timeout_ms: None,
        replication_instance_arn: INSTANCE.into(),
        task_prefix: "new-".into(),
        remap_mode: RemapMode::Identifier,
        scope: TaskScope::All,
        source_transforms: source,
        target_transforms: target,
        page_size: 20,
        replacement_instance_arn: None,
        enable_cloudwatch_logging: true,
        log_dir: None,
    }
}

/// Source pool {S1: db1, S2: db2}, target pool {T1: tgt1}, one task on (S1, T1).
fn single_task_snapshot() -> Snapshot {
    Snapshot {
        endpoints: vec![
            endpoint("arn:S1", "db1", EndpointRole::Source),
            endpoint("arn:S2", "db2", EndpointRole::Source),
            endpoint("arn:T1", "tgt1", EndpointRole::Target),
        ],
        tasks: vec![task("non-prod-TaskA", "arn:S1", "arn:T1")],
        ..Snapshot::default()
    }
}

#[test]
fn end_to_end_recreates_remapped_task() {
    let service = MemoryService::new(single_task_snapshot());
    let config = config(table(&[("db1", "db2")]), table(&[("tgt1", "tgt1")]));

    let report = CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap();

    assert_eq!(report.created_count(), 1);
    assert_eq!(report.summary, "1 tasks have been successfully created");
    assert_eq!(report.tasks_seen, 1);
    assert!(report.skipped.is_empty());

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.kind, OutcomeKind::Created);
    assert_eq!(outcome.identifier, "new-TaskA");
    assert_eq!(outcome.change, EndpointChange::SourceOnly);
    assert!(outcome.task_arn.is_some());

    assert_eq!(service.probed(), vec!["arn:S2", "arn:T1"]);

    let submitted = service.submitted();
    assert_eq!(submitted.len(), 1);
    let draft = &submitted[0];
    assert_eq!(draft.identifier, "new-TaskA");
    assert_eq!(draft.source_endpoint_arn, "arn:S2");
    assert_eq!(draft.target_endpoint_arn, "arn:T1");
    assert_eq!(draft.replication_instance_arn, INSTANCE);
    assert_eq!(draft.migration_type, MigrationType::FullLoadAndCdc);
    assert!(draft.table_mappings.contains("selection"));

    let settings: serde_json::Value = serde_json::from_str(&draft.task_settings).unwrap();
    assert_eq!(settings["Logging"]["EnableLogging"], serde_json::Value::Bool(true));
    assert!(settings["Logging"]["CloudWatchLogGroup"].is_null());
    assert!(settings["Logging"]["CloudWatchLogStream"].is_null());
}

#[test]
fn missing_transform_key_aborts_before_task_work() {
    let service = MemoryService::new(single_task_snapshot());
    let config = config(table(&[("db9", "db2")]), table(&[("tgt1", "tgt1")]));

    let err = CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap_err();

    match err {
        CloneError::InvalidTransforms(keys) => {
            assert_eq!(keys.len(), 1);
            assert_eq!(keys[0].key, "db9");
            assert_eq!(keys[0].side, TransformSide::Old);
        }
        other => panic!("expected invalid transforms, got {other:?}"),
    }
    assert_eq!(service.task_listings(), 0);
    assert!(service.submitted().is_empty());
    assert!(service.probed().is_empty());
}

#[test]
fn validation_collects_source_and_target_failures() {
    let service = MemoryService::new(single_task_snapshot());
    let config = config(
        table(&[("db1", "nowhere")]),
        table(&[("ghost", "tgt1"), ("tgt1", "phantom")]),
    );

    let err = CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap_err();
    let CloneError::InvalidTransforms(keys) = err else {
        panic!("expected invalid transforms");
    };
    let names: Vec<&str> = keys.iter().map(|k| k.key.as_str()).collect();
    assert_eq!(names, vec!["nowhere", "ghost", "phantom"]);
    assert_eq!(keys[0].role, EndpointRole::Source);
    assert_eq!(keys[2].role, EndpointRole::Target);
}

#[test]
fn rerun_treats_existing_task_as_no_op() {
    let service = MemoryService::new(single_task_snapshot());
    let config = config(table(&[("db1", "db2")]), table(&[("tgt1", "tgt1")]));

    let first = CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap();
    assert_eq!(first.created_count(), 1);

    let second = CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap();
    assert_eq!(second.created_count(), 0);
    assert_eq!(second.count(OutcomeKind::AlreadyExists), 1);
    assert_eq!(second.summary, "No tasks have been created");
    assert_eq!(service.submitted().len(), 2);
}

#[test]
fn arn_mode_skips_task_without_source_transform() {
    let mut snapshot = single_task_snapshot();
    snapshot.tasks.push(task("prod-TaskB", "arn:S2", "arn:T1"));
    let service = MemoryService::new(snapshot);

    let mut config = config(table(&[("arn:S2", "arn:S1")]), table(&[("arn:T1", "arn:T1")]));
    config.remap_mode = RemapMode::Arn;

    let report = CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].identifier, "non-prod-TaskA");
    let submitted = service.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].identifier, "new-TaskB");
    assert_eq!(submitted[0].source_endpoint_arn, "arn:S1");
}

#[test]
fn identifier_mode_resolves_shared_identifier_to_last_endpoint() {
    let mut snapshot = single_task_snapshot();
    snapshot
        .endpoints
        .push(endpoint("arn:S3", "db2", EndpointRole::Source));
    let service = MemoryService::new(snapshot);
    let config = config(table(&[("db1", "db2")]), table(&[("tgt1", "tgt1")]));

    CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap();

    assert_eq!(service.submitted()[0].source_endpoint_arn, "arn:S3");
}

#[test]
fn unreachable_endpoint_stops_the_run() {
    let mut snapshot = single_task_snapshot();
    snapshot.tasks.push(task("non-prod-TaskB", "arn:S1", "arn:T1"));
    snapshot.unreachable = vec!["arn:T1".into()];
    let service = MemoryService::new(snapshot);
    let config = config(table(&[("db1", "db2")]), table(&[("tgt1", "tgt1")]));

    let err = CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap_err();

    assert!(matches!(err, CloneError::EndpointUnreachable { ref endpoint_arn } if endpoint_arn == "arn:T1"));
    assert_eq!(service.probed(), vec!["arn:S2", "arn:T1"]);
    assert!(service.submitted().is_empty());
}

#[test]
fn unreachable_source_skips_the_target_check() {
    let mut snapshot = single_task_snapshot();
    snapshot.unreachable = vec!["arn:S2".into()];
    let service = MemoryService::new(snapshot);
    let config = config(table(&[("db1", "db2")]), table(&[("tgt1", "tgt1")]));

    let err = CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap_err();

    assert!(matches!(err, CloneError::EndpointUnreachable { ref endpoint_arn } if endpoint_arn == "arn:S2"));
    assert_eq!(service.probed(), vec!["arn:S2"]);
    assert!(service.submitted().is_empty());
}

#[test]
fn busy_endpoint_does_not_block_creation() {
    let mut snapshot = single_task_snapshot();
    snapshot.busy = vec!["arn:S2".into(), "arn:T1".into()];
    let service = MemoryService::new(snapshot);
    let config = config(table(&[("db1", "db2")]), table(&[("tgt1", "tgt1")]));

    let report = CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap();
    assert_eq!(report.created_count(), 1);
}

#[test]
fn fatal_create_error_stops_before_later_tasks() {
    let mut snapshot = single_task_snapshot();
    snapshot.tasks.push(task("non-prod-TaskB", "arn:S1", "arn:T1"));
    snapshot.rejected_task_ids = vec!["new-TaskA".into()];
    let service = MemoryService::new(snapshot);
    let config = config(table(&[("db1", "db2")]), table(&[("tgt1", "tgt1")]));

    let err = CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap_err();
    assert_eq!(err.code(), "service_error");
    assert_eq!(service.submitted().len(), 1);
}

#[test]
fn scope_limits_recreated_tasks() {
    let mut snapshot = single_task_snapshot();
    snapshot.tasks.push(task("non-prod-TaskB", "arn:S1", "arn:T1"));
    let service = MemoryService::new(snapshot);
    let mut config = config(table(&[("db1", "db2")]), table(&[("tgt1", "tgt1")]));
    config.scope = TaskScope::Only(vec!["non-prod-TaskB".into()]);

    let report = CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap();

    assert_eq!(report.tasks_seen, 2);
    assert_eq!(report.created_count(), 1);
    assert_eq!(report.outcomes[0].identifier, "new-TaskB");
}

#[test]
fn task_listing_follows_markers_and_instance_filter() {
    let mut snapshot = single_task_snapshot();
    snapshot.tasks = (0..25)
        .map(|i| task(&format!("prod-t{i}"), "arn:S1", "arn:T1"))
        .collect();
    let mut foreign = task("prod-elsewhere", "arn:S1", "arn:T1");
    foreign.replication_instance_arn = "arn:aws:dms:us-east-1:111122223333:rep:OTHER".into();
    snapshot.tasks.push(foreign);
    let service = MemoryService::new(snapshot);
    let config = config(table(&[("db1", "db2")]), table(&[("tgt1", "tgt1")]));

    let report = CloneRun::new(&service, &config)
        .execute(RunMode::Plan)
        .unwrap();

    assert_eq!(report.tasks_seen, 25);
    let markers: Vec<Option<String>> = service
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ServiceCall::ListReplicationTasks { marker, .. } => Some(marker),
            _ => None,
        })
        .collect();
    assert_eq!(markers, vec![None, Some("20".into())]);
}

#[test]
fn plan_mode_never_probes_or_creates() {
    let service = MemoryService::new(single_task_snapshot());
    let mut config = config(table(&[("db1", "db2")]), table(&[("tgt1", "tgt1")]));
    config.replacement_instance_arn = Some("arn:aws:dms:us-east-1:111122223333:rep:NEW".into());

    let report = CloneRun::new(&service, &config)
        .execute(RunMode::Plan)
        .unwrap();

    assert_eq!(report.count(OutcomeKind::Planned), 1);
    assert_eq!(report.summary, "1 tasks would be created");
    assert!(report.outcomes[0].instance_replaced);
    assert!(service.probed().is_empty());
    assert!(service.submitted().is_empty());
}

#[test]
fn replacement_instance_is_used_for_creation_but_not_probes() {
    let service = MemoryService::new(single_task_snapshot());
    let mut config = config(table(&[("db1", "db2")]), table(&[("tgt1", "tgt1")]));
    config.replacement_instance_arn = Some("arn:aws:dms:us-east-1:111122223333:rep:NEW".into());

    CloneRun::new(&service, &config)
        .execute(RunMode::Apply)
        .unwrap();

    let probe_instances: Vec<String> = service
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ServiceCall::TestConnection { instance_arn, .. } => Some(instance_arn),
            _ => None,
        })
        .collect();
    assert_eq!(probe_instances, vec![INSTANCE, INSTANCE]);
    assert_eq!(
        service.submitted()[0].replication_instance_arn,
        "arn:aws:dms:us-east-1:111122223333:rep:NEW"
    );
}

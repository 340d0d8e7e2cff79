use crate::error::Result;
use crate::model::{CreatedTask, ReplicationTaskDraft};
use crate::service::{MigrationService, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(CreatedTask),
    AlreadyExists,
}

/// Test connectivity from `instance_arn` to `endpoint_arn`.
///
/// A busy endpoint (a migration is already running against it) counts as
/// reachable. Any other service error is returned to the caller.
pub fn probe_endpoint<S: MigrationService + ?Sized>(
    service: &S,
    instance_arn: &str,
    endpoint_arn: &str,
) -> Result<bool> {
    match service.test_connection(instance_arn, endpoint_arn) {
        Ok(true) => {
            tracing::info!(endpoint_arn, "connection test passed");
            Ok(true)
        }
        Ok(false) => {
            tracing::warn!(endpoint_arn, "connection test failed");
            Ok(false)
        }
        Err(ServiceError::ResourceBusy(_)) => {
            tracing::info!(endpoint_arn, "endpoint busy; connection test passed");
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}

/// Submit `draft`. An identifier that already exists is a no-op success.
pub fn create_task<S: MigrationService + ?Sized>(
    service: &S,
    draft: &ReplicationTaskDraft,
) -> Result<CreateOutcome> {
    tracing::info!(task = %draft.identifier, "creating replication task");
    match service.create_replication_task(draft) {
        Ok(created) => {
            tracing::info!(
                task = %created.identifier,
                status = created.status.as_deref().unwrap_or("unknown"),
                created_at = ?created.created_at,
                "replication task created"
            );
            Ok(CreateOutcome::Created(created))
        }
        Err(ServiceError::AlreadyExists(_)) => {
            tracing::info!(
                task = %draft.identifier,
                "task identifier already exists; skipping creation and proceeding"
            );
            Ok(CreateOutcome::AlreadyExists)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Endpoint, EndpointRole, MigrationType};
    use crate::service::memory::{MemoryService, Snapshot};

    fn draft(identifier: &str) -> ReplicationTaskDraft {
        ReplicationTaskDraft {
            identifier: identifier.into(),
            source_endpoint_arn: "arn:s2".into(),
            target_endpoint_arn: "arn:t1".into(),
            replication_instance_arn: "arn:rep".into(),
            migration_type: MigrationType::FullLoad,
            table_mappings: "{}".into(),
            task_settings: "{}".into(),
        }
    }

    fn service_with(snapshot: Snapshot) -> MemoryService {
        let mut snapshot = snapshot;
        snapshot.endpoints = ["arn:ok", "arn:down", "arn:busy", "arn:broken"]
            .iter()
            .map(|arn| Endpoint {
                arn: arn.to_string(),
                identifier: arn.trim_start_matches("arn:").to_string(),
                role: EndpointRole::Source,
                engine: None,
                status: None,
            })
            .collect();
        MemoryService::new(snapshot)
    }

    #[test]
    fn busy_endpoint_passes_probe() {
        let service = service_with(Snapshot {
            busy: vec!["arn:busy".into()],
            ..Snapshot::default()
        });
        assert!(probe_endpoint(&service, "arn:rep", "arn:busy").unwrap());
    }

    #[test]
    fn failed_connection_is_reported_not_raised() {
        let service = service_with(Snapshot {
            unreachable: vec!["arn:down".into()],
            ..Snapshot::default()
        });
        assert!(probe_endpoint(&service, "arn:rep", "arn:ok").unwrap());
        assert!(!probe_endpoint(&service, "arn:rep", "arn:down").unwrap());
    }

    #[test]
    fn other_probe_errors_propagate() {
        let service = service_with(Snapshot {
            probe_errors: vec!["arn:broken".into()],
            ..Snapshot::default()
        });
        let err = probe_endpoint(&service, "arn:rep", "arn:broken").unwrap_err();
        assert_eq!(err.code(), "service_error");
    }

    #[test]
    fn second_identical_create_is_already_exists() {
        let service = service_with(Snapshot::default());
        let first = create_task(&service, &draft("new-orders")).unwrap();
        assert!(matches!(first, CreateOutcome::Created(ref t) if t.identifier == "new-orders"));

        let second = create_task(&service, &draft("new-orders")).unwrap();
        assert_eq!(second, CreateOutcome::AlreadyExists);
    }

    #[test]
    fn rejected_create_is_fatal() {
        let service = service_with(Snapshot {
            rejected_task_ids: vec!["new-bad".into()],
            ..Snapshot::default()
        });
        let err = create_task(&service, &draft("new-bad")).unwrap_err();
        assert!(err.to_string().contains("CreateReplicationTask"));
    }
}

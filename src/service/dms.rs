//! AWS Database Migration Service client.

use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_databasemigration::Client;
use aws_sdk_databasemigration::config::timeout::TimeoutConfig;
use aws_sdk_databasemigration::error::{DisplayErrorContext, SdkError};
use aws_sdk_databasemigration::operation::create_replication_task::CreateReplicationTaskError;
use aws_sdk_databasemigration::operation::test_connection::TestConnectionError;
use aws_sdk_databasemigration::types::{self, Filter, MigrationTypeValue};
use tokio::runtime::Runtime;

use super::{MigrationService, ServiceError, ServiceResult};
use crate::model::{
    CreatedTask, Endpoint, EndpointRole, MigrationType, Page, ReplicationTask,
    ReplicationTaskDraft,
};

const ENDPOINT_TYPE_FILTER: &str = "endpoint-type";
const REPLICATION_INSTANCE_FILTER: &str = "replication-instance-arn";

/// Connection settings for the DMS client.
#[derive(Debug, Clone, Default)]
pub struct DmsConfig {
    /// AWS region (SDK default chain when not specified)
    pub region: Option<String>,
    /// Optional endpoint override (e.g. LocalStack)
    pub endpoint_url: Option<String>,
    /// Per-operation timeout in milliseconds
    pub operation_timeout_ms: Option<u64>,
}

/// DMS-backed [`MigrationService`].
///
/// Owns a current-thread runtime and blocks on every SDK call, so callers
/// see plain synchronous methods.
pub struct DmsService {
    client: Client,
    runtime: Runtime,
}

impl std::fmt::Debug for DmsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmsService").finish_non_exhaustive()
    }
}

impl DmsService {
    pub fn connect(config: DmsConfig) -> ServiceResult<Self> {
        let runtime = current_thread_runtime()?;

        let region = config.region.clone();
        let sdk_config = runtime.block_on(async move {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(Region::new(region));
            }
            loader.load().await
        });

        // Inherit credentials, retry and HTTP settings from the shared config.
        let mut builder = aws_sdk_databasemigration::config::Builder::from(&sdk_config);
        if let Some(endpoint) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        if let Some(timeout_ms) = config.operation_timeout_ms {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        tracing::debug!(
            region = ?sdk_config.region().map(|r| r.as_ref().to_string()),
            "DMS client initialized"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
            runtime,
        })
    }
}

fn current_thread_runtime() -> ServiceResult<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ServiceError::Runtime(format!("failed to create tokio runtime: {e}")))
}

fn filter(name: &str, value: &str) -> ServiceResult<Filter> {
    Filter::builder()
        .name(name)
        .values(value)
        .build()
        .map_err(|e| ServiceError::Malformed {
            operation: "Filter",
            message: e.to_string(),
        })
}

fn api_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> ServiceError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    ServiceError::Api {
        operation,
        message: DisplayErrorContext(&err).to_string(),
    }
}

fn endpoint_from_sdk(role: EndpointRole, endpoint: &types::Endpoint) -> ServiceResult<Endpoint> {
    let malformed = |field: &str| ServiceError::Malformed {
        operation: "DescribeEndpoints",
        message: format!("endpoint without {field}"),
    };
    Ok(Endpoint {
        arn: endpoint
            .endpoint_arn()
            .ok_or_else(|| malformed("EndpointArn"))?
            .to_string(),
        identifier: endpoint
            .endpoint_identifier()
            .ok_or_else(|| malformed("EndpointIdentifier"))?
            .to_string(),
        role,
        engine: endpoint.engine_name().map(String::from),
        status: endpoint.status().map(String::from),
    })
}

fn task_from_sdk(task: &types::ReplicationTask) -> ServiceResult<ReplicationTask> {
    let identifier = task.replication_task_identifier().unwrap_or_default();
    let malformed = |field: &str| ServiceError::Malformed {
        operation: "DescribeReplicationTasks",
        message: format!("task '{identifier}' without {field}"),
    };
    let migration_type = task
        .migration_type()
        .and_then(|m| MigrationType::parse(m.as_str()))
        .ok_or_else(|| malformed("a known MigrationType"))?;

    Ok(ReplicationTask {
        identifier: task
            .replication_task_identifier()
            .ok_or_else(|| malformed("ReplicationTaskIdentifier"))?
            .to_string(),
        source_endpoint_arn: task
            .source_endpoint_arn()
            .ok_or_else(|| malformed("SourceEndpointArn"))?
            .to_string(),
        target_endpoint_arn: task
            .target_endpoint_arn()
            .ok_or_else(|| malformed("TargetEndpointArn"))?
            .to_string(),
        replication_instance_arn: task
            .replication_instance_arn()
            .ok_or_else(|| malformed("ReplicationInstanceArn"))?
            .to_string(),
        migration_type,
        table_mappings: task
            .table_mappings()
            .ok_or_else(|| malformed("TableMappings"))?
            .to_string(),
        task_settings: task
            .replication_task_settings()
            .ok_or_else(|| malformed("ReplicationTaskSettings"))?
            .to_string(),
        status: task.status().map(String::from),
    })
}

fn created_from_sdk(identifier: &str, task: Option<&types::ReplicationTask>) -> CreatedTask {
    CreatedTask {
        identifier: identifier.to_string(),
        arn: task
            .and_then(|t| t.replication_task_arn())
            .map(String::from),
        status: task.and_then(|t| t.status()).map(String::from),
        created_at: task
            .and_then(|t| t.replication_task_creation_date())
            .and_then(|d| chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos())),
    }
}

impl MigrationService for DmsService {
    fn list_endpoints(
        &self,
        role: EndpointRole,
        page_size: u32,
        marker: Option<&str>,
    ) -> ServiceResult<Page<Endpoint>> {
        let request = self
            .client
            .describe_endpoints()
            .filters(filter(ENDPOINT_TYPE_FILTER, role.as_str())?)
            .max_records(page_size as i32)
            .set_marker(marker.map(String::from));
        let output = self
            .runtime
            .block_on(request.send())
            .map_err(|e| api_error("DescribeEndpoints", e))?;

        let items = output
            .endpoints()
            .iter()
            .map(|e| endpoint_from_sdk(role, e))
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(Page {
            items,
            marker: output.marker().map(String::from),
        })
    }

    fn list_replication_tasks(
        &self,
        instance_arn: &str,
        page_size: u32,
        marker: Option<&str>,
    ) -> ServiceResult<Page<ReplicationTask>> {
        let request = self
            .client
            .describe_replication_tasks()
            .filters(filter(REPLICATION_INSTANCE_FILTER, instance_arn)?)
            .max_records(page_size as i32)
            .without_settings(false)
            .set_marker(marker.map(String::from));
        let output = self
            .runtime
            .block_on(request.send())
            .map_err(|e| api_error("DescribeReplicationTasks", e))?;

        let items = output
            .replication_tasks()
            .iter()
            .map(task_from_sdk)
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(Page {
            items,
            marker: output.marker().map(String::from),
        })
    }

    fn test_connection(&self, instance_arn: &str, endpoint_arn: &str) -> ServiceResult<bool> {
        let request = self
            .client
            .test_connection()
            .replication_instance_arn(instance_arn)
            .endpoint_arn(endpoint_arn);

        match self.runtime.block_on(request.send()) {
            Ok(output) => {
                let status = output.connection().and_then(|c| c.status());
                tracing::debug!(endpoint_arn, ?status, "TestConnection accepted");
                Ok(status != Some("failed"))
            }
            // Only the service variant carries a typed fault.
            Err(SdkError::ServiceError(service_err))
                if matches!(
                    service_err.err(),
                    TestConnectionError::InvalidResourceStateFault(_)
                ) =>
            {
                Err(ServiceError::ResourceBusy(endpoint_arn.to_string()))
            }
            Err(e) => Err(api_error("TestConnection", e)),
        }
    }

    fn create_replication_task(&self, draft: &ReplicationTaskDraft) -> ServiceResult<CreatedTask> {
        let request = self
            .client
            .create_replication_task()
            .replication_task_identifier(&draft.identifier)
            .source_endpoint_arn(&draft.source_endpoint_arn)
            .target_endpoint_arn(&draft.target_endpoint_arn)
            .replication_instance_arn(&draft.replication_instance_arn)
            .migration_type(MigrationTypeValue::from(draft.migration_type.as_str()))
            .table_mappings(&draft.table_mappings)
            .replication_task_settings(&draft.task_settings);

        match self.runtime.block_on(request.send()) {
            Ok(output) => Ok(created_from_sdk(&draft.identifier, output.replication_task())),
            Err(SdkError::ServiceError(service_err))
                if matches!(
                    service_err.err(),
                    CreateReplicationTaskError::ResourceAlreadyExistsFault(_)
                ) =>
            {
                Err(ServiceError::AlreadyExists(draft.identifier.clone()))
            }
            Err(e) => Err(api_error("CreateReplicationTask", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_conversion_requires_arn_and_identifier() {
        let sdk = types::Endpoint::builder()
            .endpoint_arn("arn:aws:dms:us-east-1:1:endpoint:SRC")
            .endpoint_identifier("orders-src")
            .engine_name("postgres")
            .build();
        let endpoint = endpoint_from_sdk(EndpointRole::Source, &sdk).unwrap();
        assert_eq!(endpoint.identifier, "orders-src");
        assert_eq!(endpoint.engine.as_deref(), Some("postgres"));

        let missing = types::Endpoint::builder().endpoint_identifier("x").build();
        let err = endpoint_from_sdk(EndpointRole::Source, &missing).unwrap_err();
        assert!(matches!(err, ServiceError::Malformed { .. }));
    }

    #[test]
    fn task_conversion_maps_migration_type() {
        let sdk = types::ReplicationTask::builder()
            .replication_task_identifier("non-prod-orders")
            .source_endpoint_arn("arn:src")
            .target_endpoint_arn("arn:tgt")
            .replication_instance_arn("arn:rep")
            .migration_type(MigrationTypeValue::FullLoadAndCdc)
            .table_mappings("{}")
            .replication_task_settings("{}")
            .build();
        let task = task_from_sdk(&sdk).unwrap();
        assert_eq!(task.migration_type, MigrationType::FullLoadAndCdc);
        assert_eq!(task.identifier, "non-prod-orders");
    }

    #[test]
    fn task_conversion_rejects_missing_settings() {
        let sdk = types::ReplicationTask::builder()
            .replication_task_identifier("orders")
            .source_endpoint_arn("arn:src")
            .target_endpoint_arn("arn:tgt")
            .replication_instance_arn("arn:rep")
            .migration_type(MigrationTypeValue::Cdc)
            .table_mappings("{}")
            .build();
        let err = task_from_sdk(&sdk).unwrap_err();
        assert!(err.to_string().contains("ReplicationTaskSettings"));
    }

    #[test]
    fn created_task_tolerates_empty_response() {
        let created = created_from_sdk("new-orders", None);
        assert_eq!(created.identifier, "new-orders");
        assert!(created.arn.is_none());
        assert!(created.created_at.is_none());
    }
}

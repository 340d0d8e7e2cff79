//! The migration service seam.
//!
//! Everything the clone workflow needs from DMS goes through
//! [`MigrationService`]. The trait is synchronous; the AWS implementation
//! blocks on its own runtime so the workflow reads top to bottom.

pub mod dms;
pub mod memory;

use thiserror::Error;

use crate::model::{CreatedTask, Endpoint, EndpointRole, Page, ReplicationTask, ReplicationTaskDraft};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The resource is in a state that rejects the request (for example a
    /// task is running against the endpoint being tested).
    #[error("resource busy: {0}")]
    ResourceBusy(String),

    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("{operation} failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} returned an unusable response: {message}")]
    Malformed {
        operation: &'static str,
        message: String,
    },

    #[error("service runtime error: {0}")]
    Runtime(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

pub trait MigrationService {
    /// One page of endpoints of the given role.
    fn list_endpoints(
        &self,
        role: EndpointRole,
        page_size: u32,
        marker: Option<&str>,
    ) -> ServiceResult<Page<Endpoint>>;

    /// One page of the replication tasks running on `instance_arn`.
    fn list_replication_tasks(
        &self,
        instance_arn: &str,
        page_size: u32,
        marker: Option<&str>,
    ) -> ServiceResult<Page<ReplicationTask>>;

    /// Returns `false` when the service reports the connection as failed.
    fn test_connection(&self, instance_arn: &str, endpoint_arn: &str) -> ServiceResult<bool>;

    fn create_replication_task(&self, draft: &ReplicationTaskDraft) -> ServiceResult<CreatedTask>;
}

impl<S: MigrationService + ?Sized> MigrationService for &S {
    fn list_endpoints(
        &self,
        role: EndpointRole,
        page_size: u32,
        marker: Option<&str>,
    ) -> ServiceResult<Page<Endpoint>> {
        (**self).list_endpoints(role, page_size, marker)
    }

    fn list_replication_tasks(
        &self,
        instance_arn: &str,
        page_size: u32,
        marker: Option<&str>,
    ) -> ServiceResult<Page<ReplicationTask>> {
        (**self).list_replication_tasks(instance_arn, page_size, marker)
    }

    fn test_connection(&self, instance_arn: &str, endpoint_arn: &str) -> ServiceResult<bool> {
        (**self).test_connection(instance_arn, endpoint_arn)
    }

    fn create_replication_task(&self, draft: &ReplicationTaskDraft) -> ServiceResult<CreatedTask> {
        (**self).create_replication_task(draft)
    }
}

//! In-process migration service seeded from a JSON snapshot.
//!
//! Backs the `--snapshot` offline mode and the test suite. Every call is
//! recorded so callers can assert what the workflow asked of the service.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{MigrationService, ServiceError, ServiceResult};
use crate::error::Result;
use crate::model::{
    CreatedTask, Endpoint, EndpointRole, Page, ReplicationTask, ReplicationTaskDraft,
};

/// Offline description of a DMS account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub tasks: Vec<ReplicationTask>,
    /// Endpoint ARNs whose connection test reports failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unreachable: Vec<String>,
    /// Endpoint ARNs whose connection test is rejected as busy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub busy: Vec<String>,
    /// Endpoint ARNs whose connection test fails with a service error.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probe_errors: Vec<String>,
    /// Task identifiers that already exist in the account.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub existing_task_ids: Vec<String>,
    /// Task identifiers whose creation fails with a service error.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected_task_ids: Vec<String>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// A call the workflow made against the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    ListEndpoints {
        role: EndpointRole,
        marker: Option<String>,
    },
    ListReplicationTasks {
        instance_arn: String,
        marker: Option<String>,
    },
    TestConnection {
        instance_arn: String,
        endpoint_arn: String,
    },
    CreateReplicationTask(ReplicationTaskDraft),
}

#[derive(Debug)]
pub struct MemoryService {
    snapshot: Snapshot,
    existing: RefCell<BTreeSet<String>>,
    calls: RefCell<Vec<ServiceCall>>,
}

impl MemoryService {
    pub fn new(snapshot: Snapshot) -> Self {
        let mut existing: BTreeSet<String> = snapshot.existing_task_ids.iter().cloned().collect();
        existing.extend(snapshot.tasks.iter().map(|t| t.identifier.clone()));
        Self {
            snapshot,
            existing: RefCell::new(existing),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.borrow().clone()
    }

    /// Drafts submitted so far, in submission order.
    pub fn submitted(&self) -> Vec<ReplicationTaskDraft> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                ServiceCall::CreateReplicationTask(draft) => Some(draft.clone()),
                _ => None,
            })
            .collect()
    }

    /// Endpoint ARNs probed so far, in probe order.
    pub fn probed(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                ServiceCall::TestConnection { endpoint_arn, .. } => Some(endpoint_arn.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn task_listings(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, ServiceCall::ListReplicationTasks { .. }))
            .count()
    }

    fn record(&self, call: ServiceCall) {
        self.calls.borrow_mut().push(call);
    }
}

/// Slice `items` into a page starting at the offset encoded in `marker`.
fn paginate<T: Clone>(
    operation: &'static str,
    items: &[T],
    page_size: u32,
    marker: Option<&str>,
) -> ServiceResult<Page<T>> {
    let start = match marker {
        Some(raw) => raw.parse::<usize>().map_err(|_| ServiceError::Api {
            operation,
            message: format!("invalid marker '{raw}'"),
        })?,
        None => 0,
    };
    let end = (start + page_size.max(1) as usize).min(items.len());
    let page = items.get(start..end).unwrap_or_default().to_vec();
    let marker = (end < items.len()).then(|| end.to_string());
    Ok(Page {
        items: page,
        marker,
    })
}

impl MigrationService for MemoryService {
    fn list_endpoints(
        &self,
        role: EndpointRole,
        page_size: u32,
        marker: Option<&str>,
    ) -> ServiceResult<Page<Endpoint>> {
        self.record(ServiceCall::ListEndpoints {
            role,
            marker: marker.map(String::from),
        });
        let endpoints: Vec<Endpoint> = self
            .snapshot
            .endpoints
            .iter()
            .filter(|e| e.role == role)
            .cloned()
            .collect();
        paginate("DescribeEndpoints", &endpoints, page_size, marker)
    }

    fn list_replication_tasks(
        &self,
        instance_arn: &str,
        page_size: u32,
        marker: Option<&str>,
    ) -> ServiceResult<Page<ReplicationTask>> {
        self.record(ServiceCall::ListReplicationTasks {
            instance_arn: instance_arn.to_string(),
            marker: marker.map(String::from),
        });
        let tasks: Vec<ReplicationTask> = self
            .snapshot
            .tasks
            .iter()
            .filter(|t| t.replication_instance_arn == instance_arn)
            .cloned()
            .collect();
        paginate("DescribeReplicationTasks", &tasks, page_size, marker)
    }

    fn test_connection(&self, instance_arn: &str, endpoint_arn: &str) -> ServiceResult<bool> {
        self.record(ServiceCall::TestConnection {
            instance_arn: instance_arn.to_string(),
            endpoint_arn: endpoint_arn.to_string(),
        });
        let listed = |arns: &[String]| arns.iter().any(|a| a == endpoint_arn);
        if listed(&self.snapshot.busy) {
            return Err(ServiceError::ResourceBusy(endpoint_arn.to_string()));
        }
        if listed(&self.snapshot.probe_errors) {
            return Err(ServiceError::Api {
                operation: "TestConnection",
                message: format!("AccessDeniedFault: {endpoint_arn}"),
            });
        }
        if !self.snapshot.endpoints.iter().any(|e| e.arn == endpoint_arn) {
            return Err(ServiceError::Api {
                operation: "TestConnection",
                message: format!("ResourceNotFoundFault: {endpoint_arn}"),
            });
        }
        Ok(!listed(&self.snapshot.unreachable))
    }

    fn create_replication_task(&self, draft: &ReplicationTaskDraft) -> ServiceResult<CreatedTask> {
        self.record(ServiceCall::CreateReplicationTask(draft.clone()));
        if self.snapshot.rejected_task_ids.contains(&draft.identifier) {
            return Err(ServiceError::Api {
                operation: "CreateReplicationTask",
                message: format!("InvalidParameterValueException: {}", draft.identifier),
            });
        }
        if !self.existing.borrow_mut().insert(draft.identifier.clone()) {
            return Err(ServiceError::AlreadyExists(draft.identifier.clone()));
        }
        Ok(CreatedTask {
            identifier: draft.identifier.clone(),
            arn: Some(format!("arn:aws:dms:memory:task:{}", draft.identifier)),
            status: Some("creating".into()),
            created_at: Some(Utc::now()),
        })
    }
}

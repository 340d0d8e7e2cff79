//! Per-task remapping decisions.
//!
//! [`Remapper::plan`] is pure: it decides whether an existing task is
//! recreated and builds the draft, without touching the service.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::RunConfig;
use crate::directory::EndpointDirectory;
use crate::error::{CloneError, Result};
use crate::model::{EndpointRole, RemapMode, ReplicationTask, ReplicationTaskDraft};

/// Environment prefixes replaced by the configured task prefix.
pub const ENVIRONMENT_PREFIXES: [&str; 2] = ["non-prod-", "prod-"];

/// Strip one environment prefix, then prepend `prefix`.
///
/// Not idempotent when `prefix` itself starts with an environment prefix:
/// a second pass strips it again.
pub fn derive_task_identifier(prefix: &str, identifier: &str) -> String {
    let base = ENVIRONMENT_PREFIXES
        .iter()
        .find_map(|env| identifier.strip_prefix(env))
        .unwrap_or(identifier);
    format!("{prefix}{base}")
}

/// Force CloudWatch logging on (or off) and clear the log group and stream
/// so the service assigns fresh ones to the new task.
pub fn patch_task_settings(settings: &str, enable_logging: bool) -> serde_json::Result<String> {
    let mut doc: Value = serde_json::from_str(settings)?;
    let Some(root) = doc.as_object_mut() else {
        return Err(serde::de::Error::custom("task settings must be a JSON object"));
    };
    let logging = root
        .entry("Logging")
        .or_insert_with(|| Value::Object(Map::new()));
    if !logging.is_object() {
        *logging = Value::Object(Map::new());
    }
    if let Some(logging) = logging.as_object_mut() {
        logging.insert("EnableLogging".into(), Value::Bool(enable_logging));
        logging.insert("CloudWatchLogGroup".into(), Value::Null);
        logging.insert("CloudWatchLogStream".into(), Value::Null);
    }
    serde_json::to_string(&doc)
}

/// Which endpoints of a task actually move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointChange {
    SourceOnly,
    TargetOnly,
    /// Both moved, or neither did.
    Both,
}

impl EndpointChange {
    pub fn classify(old_source: &str, new_source: &str, old_target: &str, new_target: &str) -> Self {
        let source_moved = old_source != new_source;
        let target_moved = old_target != new_target;
        match (source_moved, target_moved) {
            (true, false) => Self::SourceOnly,
            (false, true) => Self::TargetOnly,
            _ => Self::Both,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::SourceOnly => "change in source endpoint ARN",
            Self::TargetOnly => "change in target endpoint ARN",
            Self::Both => "change in both source and target endpoint ARNs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    OutOfScope,
    NoSourceMapping { endpoint_arn: String },
    NoTargetMapping { endpoint_arn: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfScope => write!(f, "not in the configured task list"),
            Self::NoSourceMapping { endpoint_arn } => {
                write!(f, "source endpoint {endpoint_arn} has no transform")
            }
            Self::NoTargetMapping { endpoint_arn } => {
                write!(f, "target endpoint {endpoint_arn} has no transform")
            }
        }
    }
}

/// A task the run will recreate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPlan {
    pub old_identifier: String,
    pub old_source_endpoint_arn: String,
    pub old_target_endpoint_arn: String,
    pub old_replication_instance_arn: String,
    pub change: EndpointChange,
    pub instance_replaced: bool,
    pub draft: ReplicationTaskDraft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanDecision {
    Recreate(Box<TaskPlan>),
    Skip(SkipReason),
}

pub struct Remapper<'a> {
    config: &'a RunConfig,
    directory: &'a EndpointDirectory,
}

impl<'a> Remapper<'a> {
    pub fn new(config: &'a RunConfig, directory: &'a EndpointDirectory) -> Self {
        Self { config, directory }
    }

    /// New ARN for `arn` of the given role, or `None` when any hop of the
    /// lookup is missing.
    pub fn remap_endpoint(&self, role: EndpointRole, arn: &str) -> Option<String> {
        let endpoints = self.directory.role(role);
        let transforms = self.config.transforms(role);
        match self.config.remap_mode {
            RemapMode::Arn => {
                if !endpoints.contains_arn(arn) {
                    return None;
                }
                transforms.get(arn).cloned()
            }
            RemapMode::Identifier => {
                let identifier = endpoints.identifier_of(arn)?;
                let new_identifier = transforms.get(identifier)?;
                endpoints.arn_for_identifier(new_identifier).map(String::from)
            }
        }
    }

    pub fn plan(&self, task: &ReplicationTask) -> Result<PlanDecision> {
        if !self.config.scope.includes(&task.identifier) {
            return Ok(PlanDecision::Skip(SkipReason::OutOfScope));
        }

        let identifier = derive_task_identifier(&self.config.task_prefix, &task.identifier);

        let Some(source) = self.remap_endpoint(EndpointRole::Source, &task.source_endpoint_arn)
        else {
            return Ok(PlanDecision::Skip(SkipReason::NoSourceMapping {
                endpoint_arn: task.source_endpoint_arn.clone(),
            }));
        };
        let Some(target) = self.remap_endpoint(EndpointRole::Target, &task.target_endpoint_arn)
        else {
            return Ok(PlanDecision::Skip(SkipReason::NoTargetMapping {
                endpoint_arn: task.target_endpoint_arn.clone(),
            }));
        };

        let change = EndpointChange::classify(
            &task.source_endpoint_arn,
            &source,
            &task.target_endpoint_arn,
            &target,
        );

        let task_settings =
            patch_task_settings(&task.task_settings, self.config.enable_cloudwatch_logging)
                .map_err(|err| CloneError::TaskSettings {
                    task: task.identifier.clone(),
                    source: err,
                })?;

        let (replication_instance_arn, instance_replaced) =
            match &self.config.replacement_instance_arn {
                Some(arn) => (arn.clone(), true),
                None => (task.replication_instance_arn.clone(), false),
            };

        Ok(PlanDecision::Recreate(Box::new(TaskPlan {
            old_identifier: task.identifier.clone(),
            old_source_endpoint_arn: task.source_endpoint_arn.clone(),
            old_target_endpoint_arn: task.target_endpoint_arn.clone(),
            old_replication_instance_arn: task.replication_instance_arn.clone(),
            change,
            instance_replaced,
            draft: ReplicationTaskDraft {
                identifier,
                source_endpoint_arn: source,
                target_endpoint_arn: target,
                replication_instance_arn,
                migration_type: task.migration_type,
                table_mappings: task.table_mappings.clone(),
                task_settings,
            },
        })))
    }
}

//! Run configuration loaded from a YAML file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CloneError, Result};
use crate::model::{EndpointRole, RemapMode};
use crate::service::dms::DmsConfig;

/// DMS accepts `MaxRecords` between these bounds.
pub const MIN_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

/// Ordered old-key → new-key endpoint mapping for one role.
pub type TransformTable = BTreeMap<String, String>;

/// Which existing tasks a run considers.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskScope {
    #[default]
    All,
    Only(Vec<String>),
}

impl TaskScope {
    pub fn includes(&self, identifier: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(allowed) => allowed.iter().any(|a| a == identifier),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_timeout_ms: Option<u64>,
    /// Instance whose tasks are cloned; also runs the connection tests.
    pub replication_instance_arn: String,
    /// Prepended to every new task identifier.
    pub task_prefix: String,
    #[serde(default)]
    pub remap_mode: RemapMode,
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub scope: TaskScope,
    #[serde(default)]
    pub source_transforms: TransformTable,
    #[serde(default)]
    pub target_transforms: TransformTable,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// New tasks run on this instance instead of the original one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_instance_arn: Option<String>,
    #[serde(default = "default_true")]
    pub enable_cloudwatch_logging: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl RunConfig {
    /// Read, parse and validate a run file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CloneError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.replication_instance_arn.trim().is_empty() {
            return Err(CloneError::Config(
                "replication_instance_arn must not be empty".into(),
            ));
        }
        if self.task_prefix.trim().is_empty() {
            return Err(CloneError::Config("task_prefix must not be empty".into()));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(CloneError::Config(format!(
                "page_size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if let TaskScope::Only(tasks) = &self.scope
            && tasks.is_empty()
        {
            return Err(CloneError::Config(
                "scope.only must name at least one task".into(),
            ));
        }
        if matches!(&self.replacement_instance_arn, Some(arn) if arn.trim().is_empty()) {
            return Err(CloneError::Config(
                "replacement_instance_arn must not be empty when set".into(),
            ));
        }
        if self.source_transforms.is_empty() && self.target_transforms.is_empty() {
            return Err(CloneError::Config(
                "at least one of source_transforms or target_transforms is required".into(),
            ));
        }
        Ok(())
    }

    pub fn transforms(&self, role: EndpointRole) -> &TransformTable {
        match role {
            EndpointRole::Source => &self.source_transforms,
            EndpointRole::Target => &self.target_transforms,
        }
    }

    pub fn dms(&self) -> DmsConfig {
        DmsConfig {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            operation_timeout_ms: self.operation_timeout_ms,
        }
    }
}

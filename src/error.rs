use thiserror::Error;

use crate::model::EndpointRole;
use crate::service::ServiceError;

/// Which half of a transform pair failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformSide {
    Old,
    New,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UnresolvedKey {
    pub role: EndpointRole,
    pub side: TransformSide,
    pub key: String,
}

impl std::fmt::Display for UnresolvedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = match self.side {
            TransformSide::Old => "old",
            TransformSide::New => "new",
        };
        write!(f, "{side} {} endpoint '{}'", self.role, self.key)
    }
}

#[derive(Debug, Error)]
pub enum CloneError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{} transform key(s) do not match an existing endpoint: {}", .0.len(), join_keys(.0))]
    InvalidTransforms(Vec<UnresolvedKey>),

    #[error("endpoint {endpoint_arn} failed its connection test; rectify and run again")]
    EndpointUnreachable { endpoint_arn: String },

    #[error("task {task}: replication task settings are not valid JSON: {source}")]
    TaskSettings {
        task: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn join_keys(keys: &[UnresolvedKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl CloneError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::InvalidTransforms(_) => "invalid_transforms",
            Self::EndpointUnreachable { .. } => "endpoint_unreachable",
            Self::TaskSettings { .. } => "task_settings",
            Self::Service(_) => "service_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Yaml(_) => "yaml_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, CloneError>;

use crate::config::{RunConfig, TransformTable};
use crate::directory::{EndpointDirectory, EndpointMap, build_directory};
use crate::error::{CloneError, Result, TransformSide, UnresolvedKey};
use crate::model::{EndpointRole, RemapMode};
use crate::service::MigrationService;

/// Outcome of checking one role's transform table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleValidation {
    pub role: EndpointRole,
    pub unresolved: Vec<UnresolvedKey>,
}

impl RoleValidation {
    pub fn is_valid(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Check both keys of every pair against the role's current endpoints.
///
/// Keeps going after a miss so every bad key is reported in one run.
pub fn validate_role(
    endpoints: &EndpointMap,
    table: &TransformTable,
    role: EndpointRole,
    mode: RemapMode,
) -> RoleValidation {
    let mut unresolved = Vec::new();
    for (old, new) in table {
        for (side, key) in [(TransformSide::Old, old), (TransformSide::New, new)] {
            if !endpoints.contains_key(mode, key) {
                let miss = UnresolvedKey {
                    role,
                    side,
                    key: key.clone(),
                };
                tracing::warn!(%role, %mode, key = %key, "{miss} is not valid; rectify and run again");
                tracing::debug!(%role, known = ?endpoints.keys(mode), "listed endpoint keys");
                unresolved.push(miss);
            }
        }
    }
    RoleValidation { role, unresolved }
}

/// List both endpoint pools and validate the configured transform tables.
///
/// Returns the directory on success so remapping reuses the same listing.
pub fn validate_transforms<S: MigrationService + ?Sized>(
    service: &S,
    config: &RunConfig,
) -> Result<EndpointDirectory> {
    tracing::info!(mode = %config.remap_mode, "validating source and target mappings");
    let directory = build_directory(service, config.page_size)?;

    let mut unresolved = Vec::new();
    for role in [EndpointRole::Source, EndpointRole::Target] {
        let outcome = validate_role(
            directory.role(role),
            config.transforms(role),
            role,
            config.remap_mode,
        );
        if outcome.is_valid() {
            tracing::debug!(%role, pairs = config.transforms(role).len(), "mappings resolved");
        } else {
            unresolved.extend(outcome.unresolved);
        }
    }

    if !unresolved.is_empty() {
        tracing::error!(
            count = unresolved.len(),
            "invalid endpoints present in configuration; validate and re-run"
        );
        return Err(CloneError::InvalidTransforms(unresolved));
    }

    tracing::info!("source and target mappings have been fully validated");
    Ok(directory)
}

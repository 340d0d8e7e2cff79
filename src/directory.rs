//! Endpoint listing and the per-role `arn → identifier` maps.

use std::collections::HashMap;

use crate::error::Result;
use crate::model::{Endpoint, EndpointRole, RemapMode};
use crate::service::{MigrationService, ServiceResult};

/// Lazily pages through `ListEndpoints` for one role.
///
/// Each exhausted page triggers the next request with the service's
/// marker; iteration ends when the service returns no marker. The first
/// service error is yielded once and ends the iteration.
pub struct EndpointPages<'a, S: MigrationService + ?Sized> {
    service: &'a S,
    role: EndpointRole,
    page_size: u32,
    buffer: std::vec::IntoIter<Endpoint>,
    marker: Option<String>,
    done: bool,
}

impl<'a, S: MigrationService + ?Sized> EndpointPages<'a, S> {
    pub fn new(service: &'a S, role: EndpointRole, page_size: u32) -> Self {
        Self {
            service,
            role,
            page_size,
            buffer: Vec::new().into_iter(),
            marker: None,
            done: false,
        }
    }
}

impl<S: MigrationService + ?Sized> Iterator for EndpointPages<'_, S> {
    type Item = ServiceResult<Endpoint>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(endpoint) = self.buffer.next() {
                return Some(Ok(endpoint));
            }
            if self.done {
                return None;
            }
            match self
                .service
                .list_endpoints(self.role, self.page_size, self.marker.as_deref())
            {
                Ok(page) => {
                    self.done = page.marker.is_none();
                    self.marker = page.marker;
                    self.buffer = page.items.into_iter();
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Drain every page of endpoints for `role`.
pub fn list_endpoints<S: MigrationService + ?Sized>(
    service: &S,
    role: EndpointRole,
    page_size: u32,
) -> Result<Vec<Endpoint>> {
    let endpoints = EndpointPages::new(service, role, page_size).collect::<ServiceResult<Vec<_>>>()?;
    tracing::debug!(%role, count = endpoints.len(), "listed endpoints");
    Ok(endpoints)
}

/// Insertion-ordered `arn → identifier` map for one role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointMap {
    entries: Vec<(String, String)>,
    by_arn: HashMap<String, usize>,
}

impl EndpointMap {
    pub fn from_endpoints<'e>(endpoints: impl IntoIterator<Item = &'e Endpoint>) -> Self {
        let mut map = Self::default();
        for endpoint in endpoints {
            map.insert(&endpoint.arn, &endpoint.identifier);
        }
        map
    }

    /// Re-inserting an ARN updates its identifier in place.
    pub fn insert(&mut self, arn: &str, identifier: &str) {
        match self.by_arn.get(arn) {
            Some(&idx) => self.entries[idx].1 = identifier.to_string(),
            None => {
                self.by_arn.insert(arn.to_string(), self.entries.len());
                self.entries.push((arn.to_string(), identifier.to_string()));
            }
        }
    }

    pub fn identifier_of(&self, arn: &str) -> Option<&str> {
        self.by_arn.get(arn).map(|&idx| self.entries[idx].1.as_str())
    }

    /// ARN whose identifier equals `identifier`.
    ///
    /// Identifiers are not guaranteed unique; when several endpoints share
    /// one, the last in listing order wins.
    pub fn arn_for_identifier(&self, identifier: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(_, id)| id == identifier)
            .map(|(arn, _)| arn.as_str())
    }

    pub fn contains_arn(&self, arn: &str) -> bool {
        self.by_arn.contains_key(arn)
    }

    pub fn contains_identifier(&self, identifier: &str) -> bool {
        self.entries.iter().any(|(_, id)| id == identifier)
    }

    /// Whether `key` names an endpoint under the given remap mode.
    pub fn contains_key(&self, mode: RemapMode, key: &str) -> bool {
        match mode {
            RemapMode::Arn => self.contains_arn(key),
            RemapMode::Identifier => self.contains_identifier(key),
        }
    }

    /// Endpoint keys in listing order: ARNs or identifiers per mode.
    pub fn keys(&self, mode: RemapMode) -> Vec<&str> {
        self.entries
            .iter()
            .map(|(arn, id)| match mode {
                RemapMode::Arn => arn.as_str(),
                RemapMode::Identifier => id.as_str(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointDirectory {
    pub source: EndpointMap,
    pub target: EndpointMap,
}

impl EndpointDirectory {
    pub fn role(&self, role: EndpointRole) -> &EndpointMap {
        match role {
            EndpointRole::Source => &self.source,
            EndpointRole::Target => &self.target,
        }
    }
}

/// Build both role maps from a full listing of each pool.
pub fn build_directory<S: MigrationService + ?Sized>(
    service: &S,
    page_size: u32,
) -> Result<EndpointDirectory> {
    tracing::info!("generating the mappings for source and target endpoint ARNs");
    let source = EndpointMap::from_endpoints(&list_endpoints(service, EndpointRole::Source, page_size)?);
    let target = EndpointMap::from_endpoints(&list_endpoints(service, EndpointRole::Target, page_size)?);
    tracing::info!(
        source = source.len(),
        target = target.len(),
        "endpoint mappings generated"
    );
    for (role, map) in [(EndpointRole::Source, &source), (EndpointRole::Target, &target)] {
        if map.is_empty() {
            tracing::warn!(%role, "no endpoints listed for role");
        }
    }
    Ok(EndpointDirectory { source, target })
}

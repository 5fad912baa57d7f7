//! Lookup of regulated entities.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uknf_core::config::parse_entity_list;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub entity_id: i64,
    pub name: String,
}

/// Source of truth for which entities may submit reports.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    /// `Ok(None)` when the entity does not exist.
    async fn get_entity(&self, entity_id: i64) -> anyhow::Result<Option<EntityInfo>>;
}

/// Fixed set of entities, loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticEntityDirectory {
    entities: HashMap<i64, EntityInfo>,
}

impl StaticEntityDirectory {
    pub fn new(entities: impl IntoIterator<Item = EntityInfo>) -> Self {
        Self {
            entities: entities.into_iter().map(|e| (e.entity_id, e)).collect(),
        }
    }

    pub fn with_entity(mut self, entity_id: i64, name: impl Into<String>) -> Self {
        self.entities.insert(
            entity_id,
            EntityInfo {
                entity_id,
                name: name.into(),
            },
        );
        self
    }

    /// Parses `id:name` pairs separated by commas, e.g. `1001:Bank A,1002:Bank B`.
    pub fn parse(entries: &str) -> anyhow::Result<Self> {
        Ok(Self::from_config_entries(&parse_entity_list(entries)?))
    }

    /// Directory over the entities loaded into `ReportingConfig::entities`.
    pub fn from_config_entries(entries: &[(i64, String)]) -> Self {
        entries
            .iter()
            .fold(Self::default(), |directory, (entity_id, name)| {
                directory.with_entity(*entity_id, name.clone())
            })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[async_trait]
impl EntityDirectory for StaticEntityDirectory {
    async fn get_entity(&self, entity_id: i64) -> anyhow::Result<Option<EntityInfo>> {
        Ok(self.entities.get(&entity_id).cloned())
    }
}

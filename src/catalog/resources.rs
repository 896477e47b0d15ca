use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AssociationTable;
use crate::core::{GameError, Result};

pub const METAL: &str = "metal";
pub const CRYSTAL: &str = "crystal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDesc {
    pub id: Uuid,
    pub name: String,
    /// Production per hour of a fresh planet
    pub base_production: f64,
    pub base_storage: f64,
    /// Amount available on a fresh planet
    pub base_amount: f64,
}

#[derive(Debug, Clone)]
pub struct ResourcesModule {
    names: AssociationTable,
    resources: HashMap<Uuid, ResourceDesc>,
}

impl ResourcesModule {
    pub fn new() -> Self {
        Self {
            names: AssociationTable::new("resource"),
            resources: HashMap::new(),
        }
    }

    pub fn register(&mut self, desc: ResourceDesc) -> Result<()> {
        self.names.register(desc.id, &desc.name)?;
        self.resources.insert(desc.id, desc);
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> Result<&ResourceDesc> {
        self.resources
            .get(id)
            .ok_or_else(|| GameError::not_found("resource", id))
    }

    pub fn id_of(&self, name: &str) -> Result<Uuid> {
        self.names.id_of(name)
    }

    pub fn exists(&self, id: &Uuid) -> bool {
        self.resources.contains_key(id)
    }

    /// The two resources construction throughput is computed from.
    pub fn scarce(&self) -> Result<(Uuid, Uuid)> {
        Ok((self.id_of(METAL)?, self.id_of(CRYSTAL)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDesc> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for ResourcesModule {
    fn default() -> Self {
        Self::new()
    }
}

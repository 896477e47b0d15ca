use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AssociationTable;
use crate::core::{GameError, Result, ValidationError};

pub const DEPLOYMENT: &str = "deployment";
pub const TRANSPORT: &str = "transport";

/// Purpose of a fleet: whether it needs a target planet and whether it
/// is aimed at another player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveDesc {
    pub id: Uuid,
    pub name: String,
    pub hostile: bool,
    pub directed: bool,
    #[serde(default, rename = "allowed_ships")]
    pub allowed: BTreeSet<Uuid>,
}

impl ObjectiveDesc {
    pub fn new(id: Uuid, name: &str, hostile: bool, directed: bool) -> Self {
        Self {
            id,
            name: name.to_string(),
            hostile,
            directed,
            allowed: BTreeSet::new(),
        }
    }

    pub fn allow(mut self, ship: Uuid) -> Self {
        self.allowed.insert(ship);
        self
    }

    pub fn can_be_performed_by(&self, ship: &Uuid) -> bool {
        self.allowed.contains(ship)
    }
}

#[derive(Debug, Clone)]
pub struct ObjectivesModule {
    names: AssociationTable,
    objectives: HashMap<Uuid, ObjectiveDesc>,
}

impl ObjectivesModule {
    pub fn new() -> Self {
        Self {
            names: AssociationTable::new("objective"),
            objectives: HashMap::new(),
        }
    }

    pub fn register(&mut self, desc: ObjectiveDesc) -> Result<()> {
        self.names.register(desc.id, &desc.name)?;
        self.objectives.insert(desc.id, desc);
        Ok(())
    }

    /// Unknown objectives are a validation failure: they come from
    /// requests, not from the catalog itself.
    pub fn get(&self, id: &Uuid) -> Result<&ObjectiveDesc> {
        self.objectives
            .get(id)
            .ok_or_else(|| GameError::from(ValidationError::UnknownObjective(id.to_string())))
    }

    pub fn by_name(&self, name: &str) -> Result<&ObjectiveDesc> {
        let id = self
            .names
            .id_of(name)
            .map_err(|_| ValidationError::UnknownObjective(name.to_string()))?;
        self.get(&id)
    }

    pub fn exists(&self, id: &Uuid) -> bool {
        self.objectives.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectiveDesc> {
        self.objectives.values()
    }

    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }
}

impl Default for ObjectivesModule {
    fn default() -> Self {
        Self::new()
    }
}

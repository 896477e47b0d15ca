use std::collections::HashMap;

use uuid::Uuid;

use crate::core::{ConsistencyError, GameError, Result};

/// Bidirectional identifier <-> name table of a catalog module.
///
/// Populated once while the catalog is built and read-only afterwards.
#[derive(Debug, Clone)]
pub struct AssociationTable {
    kind: &'static str,
    names: HashMap<Uuid, String>,
    ids: HashMap<String, Uuid>,
}

impl AssociationTable {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            names: HashMap::new(),
            ids: HashMap::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn register(&mut self, id: Uuid, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ConsistencyError::Inconsistent(format!("{} '{}' has an empty name", self.kind, id)).into());
        }
        if self.names.contains_key(&id) {
            return Err(ConsistencyError::Override {
                module: self.kind,
                id: id.to_string(),
            }
            .into());
        }
        if self.ids.contains_key(name) {
            return Err(ConsistencyError::DuplicatedName(name.to_string()).into());
        }

        self.names.insert(id, name.to_string());
        self.ids.insert(name.to_string(), id);
        Ok(())
    }

    pub fn exists(&self, id: &Uuid) -> bool {
        self.names.contains_key(id)
    }

    pub fn exists_name(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    pub fn name_of(&self, id: &Uuid) -> Result<&str> {
        self.names
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| GameError::not_found(self.kind, id))
    }

    pub fn id_of(&self, name: &str) -> Result<Uuid> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| GameError::not_found(self.kind, name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

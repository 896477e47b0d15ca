use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AssociationTable, CostModel};
use crate::core::{ConsistencyError, ResourceAmount, Result, ValidationError};

/// The four families of upgradable elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradableKind {
    Building,
    Technology,
    Ship,
    Defense,
}

impl UpgradableKind {
    pub const ALL: [UpgradableKind; 4] = [Self::Building, Self::Technology, Self::Ship, Self::Defense];

    /// Singular label, used in errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Technology => "technology",
            Self::Ship => "ship",
            Self::Defense => "defense",
        }
    }

    /// Prefix of the store tables describing this family.
    pub fn table_prefix(&self) -> &'static str {
        match self {
            Self::Building => "buildings",
            Self::Technology => "technologies",
            Self::Ship => "ships",
            Self::Defense => "defenses",
        }
    }

    /// Levels for buildings and technologies, unit counts otherwise.
    pub fn has_progress_cost(&self) -> bool {
        matches!(self, Self::Building | Self::Technology)
    }
}

impl fmt::Display for UpgradableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Minimum level of another element required before this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: Uuid,
    pub level: i64,
}

/// Static description shared by every upgradable element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradableDesc {
    pub id: Uuid,
    pub name: String,
    pub kind: UpgradableKind,
    #[serde(default)]
    pub buildings_deps: Vec<Dependency>,
    #[serde(default)]
    pub technologies_deps: Vec<Dependency>,
    pub cost: CostModel,
}

impl UpgradableDesc {
    pub fn new(id: Uuid, name: &str, kind: UpgradableKind, cost: CostModel) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind,
            buildings_deps: Vec::new(),
            technologies_deps: Vec::new(),
            cost,
        }
    }

    pub fn with_building_dep(mut self, id: Uuid, level: i64) -> Self {
        self.buildings_deps.push(Dependency { id, level });
        self
    }

    pub fn with_technology_dep(mut self, id: Uuid, level: i64) -> Self {
        self.technologies_deps.push(Dependency { id, level });
        self
    }

    pub fn compute_cost(&self, n: i64) -> Vec<ResourceAmount> {
        self.cost.compute(n)
    }
}

/// Anything stored in an [`UpgradablesModule`].
pub trait Upgradable {
    fn desc(&self) -> &UpgradableDesc;
}

impl Upgradable for UpgradableDesc {
    fn desc(&self) -> &UpgradableDesc {
        self
    }
}

/// One family of upgradable elements: the name table plus the full
/// descriptions keyed by identifier.
#[derive(Debug, Clone)]
pub struct UpgradablesModule<T> {
    kind: UpgradableKind,
    names: AssociationTable,
    elements: HashMap<Uuid, T>,
}

impl<T: Upgradable> UpgradablesModule<T> {
    pub fn new(kind: UpgradableKind) -> Self {
        Self {
            kind,
            names: AssociationTable::new(kind.label()),
            elements: HashMap::new(),
        }
    }

    pub fn kind(&self) -> UpgradableKind {
        self.kind
    }

    pub fn register(&mut self, element: T) -> Result<()> {
        let desc = element.desc();
        if desc.kind != self.kind {
            return Err(ConsistencyError::Inconsistent(format!(
                "'{}' is a {} registered as a {}",
                desc.name, desc.kind, self.kind
            ))
            .into());
        }
        if desc.cost.is_progress() != self.kind.has_progress_cost() {
            return Err(ConsistencyError::Inconsistent(format!(
                "'{}' has the wrong cost model for a {}",
                desc.name, self.kind
            ))
            .into());
        }

        let id = desc.id;
        self.names.register(id, &desc.name)?;
        self.elements.insert(id, element);
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> Result<&T> {
        self.elements
            .get(id)
            .ok_or_else(|| {
                ValidationError::UnknownElement {
                    kind: self.kind.label(),
                    id: id.to_string(),
                }
                .into()
            })
    }

    pub fn by_name(&self, name: &str) -> Result<&T> {
        let id = self.names.id_of(name)?;
        self.get(&id)
    }

    pub fn id_of(&self, name: &str) -> Result<Uuid> {
        self.names.id_of(name)
    }

    pub fn name_of(&self, id: &Uuid) -> Result<&str> {
        self.names.name_of(id)
    }

    pub fn exists(&self, id: &Uuid) -> bool {
        self.elements.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.values()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FixedCost, ProgressCost};
    use crate::core::GameError;

    fn lab() -> UpgradableDesc {
        UpgradableDesc::new(
            Uuid::new_v4(),
            "research lab",
            UpgradableKind::Building,
            CostModel::Progress(ProgressCost::new(vec![], 2.0)),
        )
    }

    #[test]
    fn test_module_lookup() {
        let mut module = UpgradablesModule::new(UpgradableKind::Building);
        let desc = lab();
        let id = desc.id;
        module.register(desc).unwrap();

        assert_eq!(module.by_name("research lab").unwrap().id, id);
        assert_eq!(module.name_of(&id).unwrap(), "research lab");
        assert!(matches!(
            module.get(&Uuid::new_v4()).unwrap_err(),
            GameError::Validation(ValidationError::UnknownElement { kind: "building", .. })
        ));
    }

    #[test]
    fn test_override_rejected() {
        let mut module = UpgradablesModule::new(UpgradableKind::Building);
        let desc = lab();
        module.register(desc.clone()).unwrap();
        assert!(matches!(
            module.register(desc),
            Err(GameError::Consistency(ConsistencyError::Override { .. }))
        ));
    }

    #[test]
    fn test_wrong_family_rejected() {
        let mut module: UpgradablesModule<UpgradableDesc> = UpgradablesModule::new(UpgradableKind::Ship);
        assert!(module.register(lab()).is_err());

        let fighter = UpgradableDesc::new(
            Uuid::new_v4(),
            "light fighter",
            UpgradableKind::Ship,
            CostModel::Progress(ProgressCost::new(vec![], 1.0)),
        );
        assert!(module.register(fighter).is_err());

        let fighter = UpgradableDesc::new(
            Uuid::new_v4(),
            "light fighter",
            UpgradableKind::Ship,
            CostModel::Fixed(FixedCost::new(vec![])),
        );
        assert!(module.register(fighter).is_ok());
    }
}

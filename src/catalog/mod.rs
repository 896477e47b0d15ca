//! Read-only reference data: resources, the four families of upgradable
//! elements and fleet objectives.
//!
//! A [`Catalog`] is assembled once through a [`CatalogBuilder`], either from
//! the store ([`Catalog::load`]) or from a JSON document
//! ([`CatalogData`]), and is shared behind an `Arc` afterwards. Building it
//! fails as a whole on the first override or dangling reference.

pub mod association;
pub mod buildings;
pub mod costs;
pub mod data;
pub mod loader;
pub mod objectives;
pub mod resources;
pub mod ships;
pub mod upgradables;

pub use association::AssociationTable;
pub use buildings::{BuildingDesc, ProductionRule, StorageRule};
pub use costs::{CostModel, FixedCost, ProgressCost, amount_of};
pub use data::CatalogData;
pub use objectives::ObjectiveDesc;
pub use resources::ResourceDesc;
pub use ships::{Propulsion, ShipDesc};
pub use upgradables::{Dependency, Upgradable, UpgradableDesc, UpgradableKind, UpgradablesModule};

use objectives::ObjectivesModule;
use resources::ResourcesModule;
use uuid::Uuid;

use crate::core::{ConsistencyError, GameError, Result};

#[derive(Debug, Clone)]
pub struct Catalog {
    resources: ResourcesModule,
    buildings: UpgradablesModule<BuildingDesc>,
    technologies: UpgradablesModule<UpgradableDesc>,
    ships: UpgradablesModule<ShipDesc>,
    defenses: UpgradablesModule<UpgradableDesc>,
    objectives: ObjectivesModule,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn resources(&self) -> &ResourcesModule {
        &self.resources
    }

    pub fn buildings(&self) -> &UpgradablesModule<BuildingDesc> {
        &self.buildings
    }

    pub fn technologies(&self) -> &UpgradablesModule<UpgradableDesc> {
        &self.technologies
    }

    pub fn ships(&self) -> &UpgradablesModule<ShipDesc> {
        &self.ships
    }

    pub fn defenses(&self) -> &UpgradablesModule<UpgradableDesc> {
        &self.defenses
    }

    pub fn objectives(&self) -> &ObjectivesModule {
        &self.objectives
    }

    /// Common description of any upgradable element.
    pub fn element(&self, kind: UpgradableKind, id: &Uuid) -> Result<&UpgradableDesc> {
        match kind {
            UpgradableKind::Building => self.buildings.get(id).map(|b| &b.desc),
            UpgradableKind::Technology => self.technologies.get(id),
            UpgradableKind::Ship => self.ships.get(id).map(|s| &s.desc),
            UpgradableKind::Defense => self.defenses.get(id),
        }
    }
}

/// Accumulates catalog entries and checks cross references on `build`.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    catalog: Catalog,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            catalog: Catalog {
                resources: ResourcesModule::new(),
                buildings: UpgradablesModule::new(UpgradableKind::Building),
                technologies: UpgradablesModule::new(UpgradableKind::Technology),
                ships: UpgradablesModule::new(UpgradableKind::Ship),
                defenses: UpgradablesModule::new(UpgradableKind::Defense),
                objectives: ObjectivesModule::new(),
            },
        }
    }

    pub fn resource(mut self, desc: ResourceDesc) -> Result<Self> {
        self.catalog.resources.register(desc)?;
        Ok(self)
    }

    pub fn building(mut self, desc: BuildingDesc) -> Result<Self> {
        self.catalog.buildings.register(desc)?;
        Ok(self)
    }

    pub fn technology(mut self, desc: UpgradableDesc) -> Result<Self> {
        self.catalog.technologies.register(desc)?;
        Ok(self)
    }

    pub fn ship(mut self, desc: ShipDesc) -> Result<Self> {
        self.catalog.ships.register(desc)?;
        Ok(self)
    }

    pub fn defense(mut self, desc: UpgradableDesc) -> Result<Self> {
        self.catalog.defenses.register(desc)?;
        Ok(self)
    }

    pub fn objective(mut self, desc: ObjectiveDesc) -> Result<Self> {
        self.catalog.objectives.register(desc)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Catalog> {
        if let Err(err) = self.check_references() {
            log::error!("Catalog rejected: {}", err);
            return Err(err);
        }

        let catalog = self.catalog;
        tracing::info!(
            resources = catalog.resources.len(),
            buildings = catalog.buildings.len(),
            technologies = catalog.technologies.len(),
            ships = catalog.ships.len(),
            defenses = catalog.defenses.len(),
            objectives = catalog.objectives.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    fn check_references(&self) -> Result<()> {
        let c = &self.catalog;

        let upgradables = c
            .buildings
            .iter()
            .map(|b| &b.desc)
            .chain(c.technologies.iter())
            .chain(c.ships.iter().map(|s| &s.desc))
            .chain(c.defenses.iter());

        for desc in upgradables {
            for dep in &desc.buildings_deps {
                if !c.buildings.exists(&dep.id) {
                    return Err(dangling(&desc.name, dep.id));
                }
            }
            for dep in &desc.technologies_deps {
                if !c.technologies.exists(&dep.id) {
                    return Err(dangling(&desc.name, dep.id));
                }
            }
            for cost in desc.cost.init_costs() {
                if !c.resources.exists(&cost.resource) {
                    return Err(dangling(&desc.name, cost.resource));
                }
            }
        }

        for building in c.buildings.iter() {
            let resources = building
                .production
                .iter()
                .map(|r| r.resource)
                .chain(building.storage.iter().map(|r| r.resource));
            for resource in resources {
                if !c.resources.exists(&resource) {
                    return Err(dangling(&building.desc.name, resource));
                }
            }
        }

        for ship in c.ships.iter() {
            if !c.technologies.exists(&ship.propulsion.technology) {
                return Err(dangling(&ship.desc.name, ship.propulsion.technology));
            }
            for fuel in &ship.consumption {
                if !c.resources.exists(&fuel.resource) {
                    return Err(dangling(&ship.desc.name, fuel.resource));
                }
            }
        }

        for objective in c.objectives.iter() {
            for ship in &objective.allowed {
                if !c.ships.exists(ship) {
                    return Err(dangling(&objective.name, *ship));
                }
            }
        }

        Ok(())
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn dangling(element: &str, requirement: Uuid) -> GameError {
    ConsistencyError::DanglingDependency {
        element: element.to_string(),
        requirement: requirement.to_string(),
    }
    .into()
}

use std::collections::{BTreeMap, HashMap};

use serde::{Serialize, Serializer};
use tracing::warn;
use uuid::Uuid;

use super::action::{self, BuildingAction, FixedAction, TechnologyAction};
use super::{Coordinate, Location, PlanetShape};
use crate::catalog::{Catalog, UpgradableDesc, UpgradableKind};
use crate::core::{ResourceAmount, Result, Scanner, ValidationError};
use crate::locker::HeldLocks;
use crate::store::{Filter, QueryDesc, StoreProxy};

/// Stock, hourly production and storage capacity of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceInfo {
    pub resource: Uuid,
    pub name: String,
    pub amount: f64,
    pub production: f64,
    pub storage: f64,
}

/// Level of a building or technology, with its catalog name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    pub id: Uuid,
    pub name: String,
    pub level: i64,
}

/// Number of ships or defenses of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountInfo {
    pub id: Uuid,
    pub name: String,
    pub count: i64,
}

/// Snapshot of a planet, taken under its lock and its owner's lock.
///
/// Read-write snapshots keep both locks until [`Planet::close`].
#[derive(Debug)]
pub struct Planet {
    pub id: Uuid,
    pub player: Uuid,
    pub name: String,
    pub coordinate: Coordinate,
    pub fields: i64,
    pub min_temperature: i64,
    pub max_temperature: i64,
    pub diameter: i64,
    pub resources: BTreeMap<Uuid, ResourceInfo>,
    pub buildings: BTreeMap<Uuid, LevelInfo>,
    pub ships: BTreeMap<Uuid, CountInfo>,
    pub defenses: BTreeMap<Uuid, CountInfo>,
    /// Research of the owner, levels by technology
    pub technologies: HashMap<Uuid, i64>,
    pub buildings_upgrade: Vec<BuildingAction>,
    pub technologies_upgrade: Vec<TechnologyAction>,
    pub ships_construction: Vec<FixedAction>,
    pub defenses_construction: Vec<FixedAction>,
    locks: HeldLocks,
}

impl Planet {
    /// A new planet at `coordinate`. The shape only depends on the
    /// coordinate; stocks start from the catalog's base values.
    pub fn generate(player: Uuid, coordinate: Coordinate, homeworld: bool, catalog: &Catalog) -> Planet {
        let shape = PlanetShape::generate(&coordinate);
        let resources = catalog
            .resources()
            .iter()
            .map(|desc| {
                let info = ResourceInfo {
                    resource: desc.id,
                    name: desc.name.clone(),
                    amount: desc.base_amount,
                    production: desc.base_production,
                    storage: desc.base_storage,
                };
                (desc.id, info)
            })
            .collect();

        Planet {
            id: Uuid::new_v4(),
            player,
            name: if homeworld { "homeworld" } else { "planet" }.to_string(),
            coordinate,
            fields: shape.fields,
            min_temperature: shape.min_temperature,
            max_temperature: shape.max_temperature,
            diameter: shape.diameter,
            resources,
            buildings: BTreeMap::new(),
            ships: BTreeMap::new(),
            defenses: BTreeMap::new(),
            technologies: HashMap::new(),
            buildings_upgrade: Vec::new(),
            technologies_upgrade: Vec::new(),
            ships_construction: Vec::new(),
            defenses_construction: Vec::new(),
            locks: HeldLocks::default(),
        }
    }

    pub fn average_temperature(&self) -> f64 {
        (self.min_temperature + self.max_temperature) as f64 / 2.0
    }

    /// Fields not used by buildings. Pending upgrades are not counted.
    pub fn remaining_fields(&self) -> i64 {
        let used: i64 = self.buildings.values().map(|b| b.level).sum();
        self.fields - used
    }

    pub fn resource(&self, id: &Uuid) -> Option<&ResourceInfo> {
        self.resources.get(id)
    }

    fn resource_amount(&self, id: &Uuid) -> f64 {
        self.resources.get(id).map(|r| r.amount).unwrap_or(0.0)
    }

    pub fn building_level(&self, id: &Uuid) -> i64 {
        self.buildings.get(id).map(|b| b.level).unwrap_or(0)
    }

    pub fn technology_level(&self, id: &Uuid) -> i64 {
        self.technologies.get(id).copied().unwrap_or(0)
    }

    pub fn ship_count(&self, id: &Uuid) -> i64 {
        self.ships.get(id).map(|s| s.count).unwrap_or(0)
    }

    pub fn production_for(&self, catalog: &Catalog, building: &Uuid, level: i64) -> Result<Vec<ResourceAmount>> {
        Ok(catalog
            .buildings()
            .get(building)?
            .production_at(level, self.average_temperature()))
    }

    pub fn storage_for(&self, catalog: &Catalog, building: &Uuid, level: i64) -> Result<Vec<ResourceAmount>> {
        Ok(catalog.buildings().get(building)?.storage_at(level))
    }

    /// The planet can pay `costs` and meets the dependencies of `desc`.
    pub fn validate_action(&self, costs: &[ResourceAmount], desc: &UpgradableDesc) -> Result<()> {
        for cost in costs {
            if self.resource_amount(&cost.resource) < cost.amount {
                return Err(ValidationError::NotEnoughResources { resource: cost.resource }.into());
            }
        }

        let buildings_met = desc
            .buildings_deps
            .iter()
            .all(|dep| self.building_level(&dep.id) >= dep.level);
        let technologies_met = desc
            .technologies_deps
            .iter()
            .all(|dep| self.technology_level(&dep.id) >= dep.level);
        if !buildings_met || !technologies_met {
            return Err(ValidationError::DependenciesNotMet { element: desc.id }.into());
        }

        Ok(())
    }

    /// The planet holds the fuel, then the fuel plus the cargo, then the
    /// ships of a departing component.
    pub fn validate_fleet(
        &self,
        consumption: &[ResourceAmount],
        cargo: &[ResourceAmount],
        ships: &[(Uuid, i64)],
    ) -> Result<()> {
        let mut needed: HashMap<Uuid, f64> = HashMap::new();
        for fuel in consumption {
            if self.resource_amount(&fuel.resource) < fuel.amount {
                return Err(ValidationError::NotEnoughFuel { resource: fuel.resource }.into());
            }
            *needed.entry(fuel.resource).or_default() += fuel.amount;
        }

        for load in cargo {
            *needed.entry(load.resource).or_default() += load.amount;
        }
        for (resource, amount) in &needed {
            if self.resource_amount(resource) < *amount {
                return Err(ValidationError::NotEnoughResources { resource: *resource }.into());
            }
        }

        for (ship, count) in ships {
            if self.ship_count(ship) < *count {
                return Err(ValidationError::NotEnoughShips { ship: *ship }.into());
            }
        }
        Ok(())
    }

    pub(crate) fn attach(&mut self, locks: HeldLocks) {
        self.locks = locks;
    }

    /// Whether the snapshot still holds its locks.
    pub fn is_locked(&self) -> bool {
        self.locks.is_held()
    }

    /// Releases the locks of a read-write snapshot. Closing twice, or
    /// closing a read-only snapshot, is a lock error.
    pub fn close(&mut self) -> Result<()> {
        self.locks.release(self.id)
    }

    pub fn view(&self) -> PlanetView {
        PlanetView {
            id: self.id,
            player: self.player,
            name: self.name.clone(),
            coordinate: self.coordinate,
            fields: self.fields,
            min_temperature: self.min_temperature,
            max_temperature: self.max_temperature,
            diameter: self.diameter,
            resources: self.resources.values().cloned().collect(),
            buildings: self.buildings.values().cloned().collect(),
            ships: self.ships.values().cloned().collect(),
            defenses: self.defenses.values().cloned().collect(),
            buildings_upgrade: self.buildings_upgrade.clone(),
            technologies_upgrade: self.technologies_upgrade.clone(),
            ships_construction: self.ships_construction.clone(),
            defenses_construction: self.defenses_construction.clone(),
        }
    }
}

/// What a planet looks like on the wire. The owner's technologies stay
/// out of it.
#[derive(Debug, Clone, Serialize)]
pub struct PlanetView {
    pub id: Uuid,
    pub player: Uuid,
    pub name: String,
    pub coordinate: Coordinate,
    pub fields: i64,
    pub min_temperature: i64,
    pub max_temperature: i64,
    pub diameter: i64,
    pub resources: Vec<ResourceInfo>,
    pub buildings: Vec<LevelInfo>,
    pub ships: Vec<CountInfo>,
    pub defenses: Vec<CountInfo>,
    pub buildings_upgrade: Vec<BuildingAction>,
    pub technologies_upgrade: Vec<TechnologyAction>,
    pub ships_construction: Vec<FixedAction>,
    pub defenses_construction: Vec<FixedAction>,
}

impl Serialize for Planet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.view().serialize(serializer)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Owner of a planet, the first read of a planet load.
pub async fn fetch_owner(proxy: &dyn StoreProxy, id: Uuid) -> Result<Uuid> {
    let query = QueryDesc::new("planets", &["player"]).filter(Filter::equals("id", id));
    let row = proxy.fetch(&query).await?.single("planet", id)?;
    Scanner::new(&row).uuid()
}

async fn fetch_counts(
    proxy: &dyn StoreProxy,
    catalog: &Catalog,
    kind: UpgradableKind,
    planet: Uuid,
) -> Result<BTreeMap<Uuid, CountInfo>> {
    let (table, column) = match kind {
        UpgradableKind::Defense => ("planets_defenses", "defense"),
        _ => ("planets_ships", "ship"),
    };
    let query = QueryDesc::new(table, &[column, "count"]).filter(Filter::equals("planet", planet));

    let mut counts = BTreeMap::new();
    for row in proxy.fetch(&query).await? {
        let mut scan = Scanner::new(&row);
        let id = scan.uuid()?;
        let name = catalog.element(kind, &id)?.name.clone();
        counts.insert(id, CountInfo { id, name, count: scan.int()? });
    }
    Ok(counts)
}

/// Technology levels of a player.
pub async fn fetch_technologies(proxy: &dyn StoreProxy, catalog: &Catalog, player: Uuid) -> Result<BTreeMap<Uuid, LevelInfo>> {
    let query = QueryDesc::new("player_technologies", &["technology", "level"])
        .filter(Filter::equals("player", player));

    let mut technologies = BTreeMap::new();
    for row in proxy.fetch(&query).await? {
        let mut scan = Scanner::new(&row);
        let id = scan.uuid()?;
        let name = catalog.technologies().name_of(&id)?.to_string();
        technologies.insert(id, LevelInfo { id, name, level: scan.int()? });
    }
    Ok(technologies)
}

impl Planet {
    /// Reads every row of the planet. Resolution of elapsed actions must
    /// have happened before.
    pub async fn fetch(proxy: &dyn StoreProxy, catalog: &Catalog, id: Uuid) -> Result<Planet> {
        let query = QueryDesc::new(
            "planets",
            &[
                "player",
                "name",
                "min_temperature",
                "max_temperature",
                "fields",
                "galaxy",
                "solar_system",
                "position",
                "diameter",
            ],
        )
        .filter(Filter::equals("id", id));
        let row = proxy.fetch(&query).await?.single("planet", id)?;

        let mut scan = Scanner::new(&row);
        let player = scan.uuid()?;
        let name = scan.text()?;
        let min_temperature = scan.int()?;
        let max_temperature = scan.int()?;
        let fields = scan.int()?;
        let coordinate = Coordinate::from_parts(scan.int()?, scan.int()?, scan.int()?, Location::Planet)?;
        let diameter = scan.int()?;

        let query = QueryDesc::new("planets_resources", &["res", "amount", "production", "storage_capacity"])
            .filter(Filter::equals("planet", id));
        let mut resources = BTreeMap::new();
        for row in proxy.fetch(&query).await? {
            let mut scan = Scanner::new(&row);
            let resource = scan.uuid()?;
            let name = catalog.resources().get(&resource)?.name.clone();
            let info = ResourceInfo {
                resource,
                name,
                amount: scan.float()?,
                production: scan.float()?,
                storage: scan.float()?,
            };
            resources.insert(resource, info);
        }

        let query = QueryDesc::new("planets_buildings", &["building", "level"]).filter(Filter::equals("planet", id));
        let mut buildings = BTreeMap::new();
        for row in proxy.fetch(&query).await? {
            let mut scan = Scanner::new(&row);
            let building = scan.uuid()?;
            let name = catalog.buildings().name_of(&building)?.to_string();
            buildings.insert(
                building,
                LevelInfo {
                    id: building,
                    name,
                    level: scan.int()?,
                },
            );
        }

        let ships = fetch_counts(proxy, catalog, UpgradableKind::Ship, id).await?;
        let defenses = fetch_counts(proxy, catalog, UpgradableKind::Defense, id).await?;
        let technologies = fetch_technologies(proxy, catalog, player)
            .await?
            .into_values()
            .map(|t| (t.id, t.level))
            .collect();

        let planet = Planet {
            id,
            player,
            name,
            coordinate,
            fields,
            min_temperature,
            max_temperature,
            diameter,
            resources,
            buildings,
            ships,
            defenses,
            technologies,
            buildings_upgrade: action::fetch_building_actions(proxy, catalog, id).await?,
            technologies_upgrade: action::fetch_technology_actions(proxy, catalog, player).await?,
            ships_construction: action::fetch_fixed_actions(proxy, catalog, UpgradableKind::Ship, id).await?,
            defenses_construction: action::fetch_fixed_actions(proxy, catalog, UpgradableKind::Defense, id).await?,
            locks: HeldLocks::default(),
        };

        if planet.remaining_fields() < 0 {
            warn!(planet = %id, fields = planet.fields, "buildings use more fields than available");
        }
        Ok(planet)
    }
}

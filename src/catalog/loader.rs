use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use super::{
    BuildingDesc, Catalog, CatalogBuilder, CostModel, Dependency, FixedCost, ObjectiveDesc,
    ProductionRule, ProgressCost, Propulsion, ResourceDesc, ShipDesc, StorageRule, UpgradableDesc,
    UpgradableKind,
};
use crate::core::{ConsistencyError, GameError, ResourceAmount, Result, Scanner};
use crate::store::{QueryDesc, StoreProxy};

// ============================================================================
// Store layout
// ============================================================================

const RESOURCES: &str = "resources";
const PRODUCTION_RULES: &str = "buildings_gains_progress";
const STORAGE_RULES: &str = "buildings_storage_progress";
const SHIPS_PROPULSION: &str = "ships_propulsion";
const SHIPS_FUELS: &str = "ships_fuels";
const OBJECTIVES: &str = "fleets_objectives";
const SHIPS_USAGE: &str = "ships_usage";

/// Description of an element while its rows are being gathered.
struct Staged {
    name: String,
    buildings_deps: Vec<Dependency>,
    technologies_deps: Vec<Dependency>,
    progression: Option<f64>,
    costs: Vec<ResourceAmount>,
}

impl Catalog {
    /// Reads every catalog table from the store.
    ///
    /// Any override (two rows defining the same thing) or row referencing
    /// an unknown element fails the whole load.
    pub async fn load(proxy: &dyn StoreProxy) -> Result<Catalog> {
        let mut builder = CatalogBuilder::new();

        for resource in load_resources(proxy).await? {
            builder = builder.resource(resource)?;
        }

        let mut production = load_production_rules(proxy).await?;
        let mut storage = load_storage_rules(proxy).await?;
        let buildings = load_upgradables(proxy, UpgradableKind::Building).await?;
        for leftover in production.keys().chain(storage.keys()) {
            if !buildings.iter().any(|b| &b.id == leftover) {
                return Err(unknown_element(UpgradableKind::Building, leftover));
            }
        }
        for desc in buildings {
            let building = BuildingDesc {
                production: production.remove(&desc.id).unwrap_or_default(),
                storage: storage.remove(&desc.id).unwrap_or_default(),
                desc,
            };
            builder = builder.building(building)?;
        }

        for desc in load_upgradables(proxy, UpgradableKind::Technology).await? {
            builder = builder.technology(desc)?;
        }

        for ship in load_ships(proxy).await? {
            builder = builder.ship(ship)?;
        }

        for desc in load_upgradables(proxy, UpgradableKind::Defense).await? {
            builder = builder.defense(desc)?;
        }

        for objective in load_objectives(proxy).await? {
            builder = builder.objective(objective)?;
        }

        builder.build()
    }
}

fn unknown_element(kind: UpgradableKind, id: &Uuid) -> GameError {
    ConsistencyError::Inconsistent(format!("rows reference unknown {} '{}'", kind, id)).into()
}

fn overridden(module: &'static str, id: impl ToString) -> GameError {
    ConsistencyError::Override {
        module,
        id: id.to_string(),
    }
    .into()
}

async fn load_resources(proxy: &dyn StoreProxy) -> Result<Vec<ResourceDesc>> {
    let query = QueryDesc::new(
        RESOURCES,
        &["id", "name", "base_production", "base_storage", "base_amount"],
    );
    let rows = proxy.fetch(&query).await?;
    debug!(table = RESOURCES, rows = rows.len(), "catalog table read");

    rows.into_iter()
        .map(|row| {
            let mut scan = Scanner::new(&row);
            Ok(ResourceDesc {
                id: scan.uuid()?,
                name: scan.text()?,
                base_production: scan.float()?,
                base_storage: scan.float()?,
                base_amount: scan.float()?,
            })
        })
        .collect()
}

async fn load_upgradables(proxy: &dyn StoreProxy, kind: UpgradableKind) -> Result<Vec<UpgradableDesc>> {
    let prefix = kind.table_prefix();
    let mut staged: HashMap<Uuid, Staged> = HashMap::new();
    let mut order = Vec::new();

    // Identifiers and names.
    for row in proxy.fetch(&QueryDesc::new(prefix, &["id", "name"])).await? {
        let mut scan = Scanner::new(&row);
        let id = scan.uuid()?;
        let name = scan.text()?;
        if staged.contains_key(&id) {
            return Err(overridden(kind.label(), id));
        }
        order.push(id);
        staged.insert(
            id,
            Staged {
                name,
                buildings_deps: Vec::new(),
                technologies_deps: Vec::new(),
                progression: None,
                costs: Vec::new(),
            },
        );
    }

    // Tech tree.
    for (suffix, on_buildings) in [("buildings", true), ("technologies", false)] {
        let table = format!("tech_tree_{}_vs_{}", prefix, suffix);
        let query = QueryDesc::new(&table, &["element", "requirement", "level"]);
        for row in proxy.fetch(&query).await? {
            let mut scan = Scanner::new(&row);
            let element = scan.uuid()?;
            let dependency = Dependency {
                id: scan.uuid()?,
                level: scan.int()?,
            };

            let entry = staged
                .get_mut(&element)
                .ok_or_else(|| unknown_element(kind, &element))?;
            let deps = if on_buildings {
                &mut entry.buildings_deps
            } else {
                &mut entry.technologies_deps
            };
            if deps.iter().any(|d| d.id == dependency.id) {
                return Err(overridden(kind.label(), format!("{}/{}", element, dependency.id)));
            }
            deps.push(dependency);
        }
    }

    // Progression rules.
    if kind.has_progress_cost() {
        let table = format!("{}_costs_progress", prefix);
        for row in proxy.fetch(&QueryDesc::new(&table, &["element", "progress"])).await? {
            let mut scan = Scanner::new(&row);
            let element = scan.uuid()?;
            let progress = scan.float()?;
            let entry = staged
                .get_mut(&element)
                .ok_or_else(|| unknown_element(kind, &element))?;
            if entry.progression.replace(progress).is_some() {
                return Err(overridden(kind.label(), element));
            }
        }
    }

    // Initial costs.
    let table = format!("{}_costs", prefix);
    for row in proxy.fetch(&QueryDesc::new(&table, &["element", "res", "cost"])).await? {
        let mut scan = Scanner::new(&row);
        let element = scan.uuid()?;
        let cost = ResourceAmount::new(scan.uuid()?, scan.float()?);
        let entry = staged
            .get_mut(&element)
            .ok_or_else(|| unknown_element(kind, &element))?;
        if entry.costs.iter().any(|c| c.resource == cost.resource) {
            return Err(overridden(kind.label(), format!("{}/{}", element, cost.resource)));
        }
        entry.costs.push(cost);
    }

    debug!(kind = %kind, elements = order.len(), "catalog family read");

    let mut out = Vec::with_capacity(order.len());
    for id in order {
        if let Some(s) = staged.remove(&id) {
            let cost = if kind.has_progress_cost() {
                CostModel::Progress(ProgressCost::new(s.costs, s.progression.unwrap_or(1.0)))
            } else {
                CostModel::Fixed(FixedCost::new(s.costs))
            };
            out.push(UpgradableDesc {
                id,
                name: s.name,
                kind,
                buildings_deps: s.buildings_deps,
                technologies_deps: s.technologies_deps,
                cost,
            });
        }
    }
    Ok(out)
}

async fn load_production_rules(proxy: &dyn StoreProxy) -> Result<HashMap<Uuid, Vec<ProductionRule>>> {
    let query = QueryDesc::new(
        PRODUCTION_RULES,
        &["element", "res", "base", "progress", "temperature_offset", "temperature_coeff"],
    );

    let mut rules: HashMap<Uuid, Vec<ProductionRule>> = HashMap::new();
    for row in proxy.fetch(&query).await? {
        let mut scan = Scanner::new(&row);
        let element = scan.uuid()?;
        let rule = ProductionRule {
            resource: scan.uuid()?,
            init: scan.float()?,
            progression: scan.float()?,
            temperature_offset: scan.float()?,
            temperature_coeff: scan.float()?,
        };
        let entry = rules.entry(element).or_default();
        if entry.iter().any(|r| r.resource == rule.resource) {
            return Err(overridden("production rule", format!("{}/{}", element, rule.resource)));
        }
        entry.push(rule);
    }
    Ok(rules)
}

async fn load_storage_rules(proxy: &dyn StoreProxy) -> Result<HashMap<Uuid, Vec<StorageRule>>> {
    let query = QueryDesc::new(STORAGE_RULES, &["element", "res", "base", "multiplier", "progress"]);

    let mut rules: HashMap<Uuid, Vec<StorageRule>> = HashMap::new();
    for row in proxy.fetch(&query).await? {
        let mut scan = Scanner::new(&row);
        let element = scan.uuid()?;
        let rule = StorageRule {
            resource: scan.uuid()?,
            init: scan.float()?,
            multiplier: scan.float()?,
            progress: scan.float()?,
        };
        let entry = rules.entry(element).or_default();
        if entry.iter().any(|r| r.resource == rule.resource) {
            return Err(overridden("storage rule", format!("{}/{}", element, rule.resource)));
        }
        entry.push(rule);
    }
    Ok(rules)
}

async fn load_ships(proxy: &dyn StoreProxy) -> Result<Vec<ShipDesc>> {
    let descs = load_upgradables(proxy, UpgradableKind::Ship).await?;

    let mut props: HashMap<Uuid, (f64, f64)> = HashMap::new();
    for row in proxy.fetch(&QueryDesc::new("ships", &["id", "cargo", "speed"])).await? {
        let mut scan = Scanner::new(&row);
        props.insert(scan.uuid()?, (scan.float()?, scan.float()?));
    }

    let mut engines: HashMap<Uuid, Propulsion> = HashMap::new();
    let query = QueryDesc::new(SHIPS_PROPULSION, &["ship", "propulsion", "increase"]);
    for row in proxy.fetch(&query).await? {
        let mut scan = Scanner::new(&row);
        let ship = scan.uuid()?;
        let engine = Propulsion {
            technology: scan.uuid()?,
            increase: scan.float()?,
        };
        if engines.insert(ship, engine).is_some() {
            return Err(overridden("propulsion", ship));
        }
    }

    let mut fuels: HashMap<Uuid, Vec<ResourceAmount>> = HashMap::new();
    for row in proxy.fetch(&QueryDesc::new(SHIPS_FUELS, &["ship", "res", "amount"])).await? {
        let mut scan = Scanner::new(&row);
        let ship = scan.uuid()?;
        let fuel = ResourceAmount::new(scan.uuid()?, scan.float()?);
        let entry = fuels.entry(ship).or_default();
        if entry.iter().any(|f| f.resource == fuel.resource) {
            return Err(overridden("fuel", format!("{}/{}", ship, fuel.resource)));
        }
        entry.push(fuel);
    }

    let mut ships = Vec::with_capacity(descs.len());
    for desc in descs {
        let (cargo, speed) = props.get(&desc.id).copied().unwrap_or((0.0, 0.0));
        let propulsion = engines.remove(&desc.id).ok_or_else(|| {
            GameError::from(ConsistencyError::Inconsistent(format!(
                "ship '{}' has no propulsion system",
                desc.name
            )))
        })?;
        let consumption = fuels.remove(&desc.id).unwrap_or_default();
        ships.push(ShipDesc {
            desc,
            cargo,
            speed,
            propulsion,
            consumption,
        });
    }

    if let Some(id) = engines.keys().chain(fuels.keys()).next() {
        return Err(unknown_element(UpgradableKind::Ship, id));
    }
    Ok(ships)
}

async fn load_objectives(proxy: &dyn StoreProxy) -> Result<Vec<ObjectiveDesc>> {
    let mut objectives: Vec<ObjectiveDesc> = Vec::new();
    let query = QueryDesc::new(OBJECTIVES, &["id", "name", "hostile", "directed"]);
    for row in proxy.fetch(&query).await? {
        let mut scan = Scanner::new(&row);
        let id = scan.uuid()?;
        let name = scan.text()?;
        objectives.push(ObjectiveDesc::new(id, &name, scan.boolean()?, scan.boolean()?));
    }

    let query = QueryDesc::new(SHIPS_USAGE, &["ship", "objective", "usable"]);
    for row in proxy.fetch(&query).await? {
        let mut scan = Scanner::new(&row);
        let ship = scan.uuid()?;
        let objective = scan.uuid()?;
        let usable = scan.boolean()?;

        let entry = objectives
            .iter_mut()
            .find(|o| o.id == objective)
            .ok_or_else(|| {
                GameError::from(ConsistencyError::Inconsistent(format!(
                    "usage of ship '{}' references unknown objective '{}'",
                    ship, objective
                )))
            })?;
        if usable {
            entry.allowed.insert(ship);
        }
    }

    Ok(objectives)
}

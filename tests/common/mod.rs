#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use oglike_core::catalog::{
    BuildingDesc, Catalog, CostModel, FixedCost, ObjectiveDesc, ProductionRule, ProgressCost, Propulsion,
    ResourceDesc, ShipDesc, UpgradableDesc, UpgradableKind,
};
use oglike_core::config::EngineConfig;
use oglike_core::core::{GameError, ResourceAmount, Row, Value};
use oglike_core::facade::Instance;
use oglike_core::locker::LockRegistry;
use oglike_core::store::{MemoryStore, TableSet};
use uuid::Uuid;

pub const TABLES: &[(&str, &[&str])] = &[
    (
        "universes",
        &[
            "id",
            "name",
            "economic_speed",
            "fleet_speed",
            "research_speed",
            "fleets_to_ruins_ratio",
            "defenses_to_ruins_ratio",
            "fleets_consumption_ratio",
            "galaxies_count",
            "galaxy_size",
            "solar_system_size",
        ],
    ),
    ("players", &["id", "account", "uni", "name"]),
    ("player_technologies", &["player", "technology", "level"]),
    (
        "planets",
        &[
            "id",
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
    ),
    ("planets_resources", &["planet", "res", "amount", "production", "storage_capacity"]),
    ("planets_buildings", &["planet", "building", "level"]),
    ("planets_ships", &["planet", "ship", "count"]),
    ("planets_defenses", &["planet", "defense", "count"]),
    (
        "construction_actions_buildings",
        &["id", "planet", "element", "current_level", "desired_level", "completion_time"],
    ),
    (
        "construction_actions_buildings_production_effects",
        &["action", "resource", "production_change"],
    ),
    (
        "construction_actions_buildings_storage_effects",
        &["action", "resource", "storage_capacity_change"],
    ),
    (
        "construction_actions_technologies",
        &["id", "player", "planet", "element", "current_level", "desired_level", "completion_time"],
    ),
    (
        "construction_actions_ships",
        &["id", "planet", "element", "amount", "remaining", "completion_time", "created_at"],
    ),
    (
        "construction_actions_defenses",
        &["id", "planet", "element", "amount", "remaining", "completion_time", "created_at"],
    ),
    (
        "fleets",
        &[
            "id",
            "name",
            "uni",
            "objective",
            "target_galaxy",
            "target_solar_system",
            "target_position",
            "target_kind",
            "planet",
            "arrival_time",
        ],
    ),
    ("fleet_elements", &["id", "fleet", "player", "planet", "speed", "joined_at"]),
    ("fleet_ships", &["fleet_element", "ship", "count"]),
    ("fleet_resources", &["fleet_element", "resource", "amount"]),
];

/// Identifiers of the catalog entries used by the tests.
#[derive(Debug, Clone, Copy)]
pub struct Ids {
    pub metal: Uuid,
    pub crystal: Uuid,
    pub deuterium: Uuid,
    pub mine: Uuid,
    pub robotics: Uuid,
    pub nanite: Uuid,
    pub shipyard: Uuid,
    pub lab: Uuid,
    pub energy: Uuid,
    pub combustion: Uuid,
    pub cargo_ship: Uuid,
    pub rocket: Uuid,
    pub deployment: Uuid,
    pub transport: Uuid,
    pub attacking: Uuid,
    pub colonization: Uuid,
}

impl Ids {
    fn new() -> Self {
        Self {
            metal: Uuid::new_v4(),
            crystal: Uuid::new_v4(),
            deuterium: Uuid::new_v4(),
            mine: Uuid::new_v4(),
            robotics: Uuid::new_v4(),
            nanite: Uuid::new_v4(),
            shipyard: Uuid::new_v4(),
            lab: Uuid::new_v4(),
            energy: Uuid::new_v4(),
            combustion: Uuid::new_v4(),
            cargo_ship: Uuid::new_v4(),
            rocket: Uuid::new_v4(),
            deployment: Uuid::new_v4(),
            transport: Uuid::new_v4(),
            attacking: Uuid::new_v4(),
            colonization: Uuid::new_v4(),
        }
    }
}

fn progress(kind: UpgradableKind, id: Uuid, name: &str, costs: Vec<ResourceAmount>, progression: f64) -> UpgradableDesc {
    UpgradableDesc::new(id, name, kind, CostModel::Progress(ProgressCost::new(costs, progression)))
}

fn resource(id: Uuid, name: &str, amount: f64) -> ResourceDesc {
    ResourceDesc {
        id,
        name: name.to_string(),
        base_production: 10.0,
        base_storage: 100000.0,
        base_amount: amount,
    }
}

/// Metal mine at 125 metal and 62.5 crystal doubling per level: 1000
/// metal and 500 crystal at level 3.
pub fn catalog(ids: &Ids) -> Catalog {
    let building = |id, name: &str, costs| BuildingDesc::new(progress(UpgradableKind::Building, id, name, costs, 2.0));
    let cheap = vec![ResourceAmount::new(ids.metal, 100.0)];

    Catalog::builder()
        .resource(resource(ids.metal, "metal", 500.0))
        .unwrap()
        .resource(resource(ids.crystal, "crystal", 500.0))
        .unwrap()
        .resource(resource(ids.deuterium, "deuterium", 0.0))
        .unwrap()
        .building(
            building(
                ids.mine,
                "metal mine",
                vec![ResourceAmount::new(ids.metal, 125.0), ResourceAmount::new(ids.crystal, 62.5)],
            )
            .with_production(ProductionRule {
                resource: ids.metal,
                init: 30.0,
                progression: 1.1,
                temperature_offset: 1.0,
                temperature_coeff: 0.0,
            }),
        )
        .unwrap()
        .building(building(ids.robotics, "robotics factory", cheap.clone()))
        .unwrap()
        .building(building(ids.nanite, "nanite factory", cheap.clone()))
        .unwrap()
        .building(building(ids.shipyard, "shipyard", cheap.clone()))
        .unwrap()
        .building(building(ids.lab, "research lab", cheap.clone()))
        .unwrap()
        .technology(
            progress(
                UpgradableKind::Technology,
                ids.energy,
                "energy technology",
                vec![ResourceAmount::new(ids.crystal, 800.0)],
                2.0,
            )
            .with_building_dep(ids.lab, 1),
        )
        .unwrap()
        .technology(progress(
            UpgradableKind::Technology,
            ids.combustion,
            "combustion drive",
            vec![ResourceAmount::new(ids.metal, 400.0), ResourceAmount::new(ids.deuterium, 600.0)],
            2.0,
        ))
        .unwrap()
        .ship(
            ShipDesc::new(
                UpgradableDesc::new(
                    ids.cargo_ship,
                    "small cargo ship",
                    UpgradableKind::Ship,
                    CostModel::Fixed(FixedCost::new(vec![
                        ResourceAmount::new(ids.metal, 2000.0),
                        ResourceAmount::new(ids.crystal, 2000.0),
                    ])),
                )
                .with_building_dep(ids.shipyard, 2),
                250.0,
                5000.0,
                Propulsion {
                    technology: ids.combustion,
                    increase: 500.0,
                },
            )
            .with_fuel(ids.deuterium, 10.0),
        )
        .unwrap()
        .defense(UpgradableDesc::new(
            ids.rocket,
            "rocket launcher",
            UpgradableKind::Defense,
            CostModel::Fixed(FixedCost::new(vec![ResourceAmount::new(ids.metal, 2000.0)])),
        ))
        .unwrap()
        .objective(ObjectiveDesc::new(ids.deployment, "deployment", false, true).allow(ids.cargo_ship))
        .unwrap()
        .objective(ObjectiveDesc::new(ids.transport, "transport", false, true).allow(ids.cargo_ship))
        .unwrap()
        .objective(ObjectiveDesc::new(ids.attacking, "attacking", true, true).allow(ids.cargo_ship))
        .unwrap()
        .objective(ObjectiveDesc::new(ids.colonization, "colonization", false, false))
        .unwrap()
        .build()
        .unwrap()
}

fn native(err: GameError) -> String {
    err.to_string()
}

fn column(tables: &TableSet, table: &str, name: &str) -> Result<usize, String> {
    tables.get(table).and_then(|t| t.column_index(name)).map_err(native)
}

/// Sets `level` in a (owner, element, level) table, inserting the row
/// when missing.
fn set_level(tables: &mut TableSet, table: &str, owner: &Value, element: &Value, level: Value) -> Result<(), String> {
    let target = tables.get_mut(table).map_err(native)?;
    let owner_key = target.columns()[0].clone();
    let element_idx = 1;
    let level_idx = target.column_index("level").map_err(native)?;

    let mut touched = 0;
    target
        .update_where(&owner_key, owner, |_, row| {
            if &row[element_idx] == element {
                row[level_idx] = level.clone();
                touched += 1;
            }
        })
        .map_err(native)?;
    if touched == 0 {
        target
            .insert(vec![owner.clone(), element.clone(), level])
            .map_err(native)?;
    }
    Ok(())
}

/// Completes the progress actions of `table` owned by `owner` whose
/// completion time is past.
fn complete_progress(
    tables: &mut TableSet,
    table: &str,
    owner_key: &str,
    owner: &Value,
    levels: &str,
    effects: &[&str],
) -> Result<(), String> {
    let now = Utc::now();
    let (id, owner_idx, element, desired, time) = (
        column(tables, table, "id")?,
        column(tables, table, owner_key)?,
        column(tables, table, "element")?,
        column(tables, table, "desired_level")?,
        column(tables, table, "completion_time")?,
    );

    let due: Vec<(Value, Value, Value)> = tables
        .get(table)
        .map_err(native)?
        .rows()
        .iter()
        .filter(|row| &row[owner_idx] == owner && row[time].as_timestamp().is_some_and(|t| t <= now))
        .map(|row| (row[id].clone(), row[element].clone(), row[desired].clone()))
        .collect();

    for (action, element, level) in due {
        set_level(tables, levels, owner, &element, level)?;
        tables.get_mut(table).map_err(native)?.delete_where("id", &action).map_err(native)?;
        for effect in effects {
            tables.get_mut(effect).map_err(native)?.delete_where("action", &action).map_err(native)?;
        }
    }
    Ok(())
}

fn text_arg(args: &[Value], index: usize) -> Result<serde_json::Value, String> {
    let raw = args
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing argument {}", index))?;
    serde_json::from_str(raw).map_err(|e| e.to_string())
}

fn json_uuid(json: &serde_json::Value, key: &str) -> Result<Value, String> {
    json[key]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .map(Value::Uuid)
        .ok_or_else(|| format!("null value in column \"{}\" violates not-null constraint (SQLSTATE 23502)", key))
}

fn json_time(json: &serde_json::Value, key: &str) -> Result<Value, String> {
    json[key]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
        .ok_or_else(|| format!("invalid timestamp for {}", key))
}

fn register_procedures(store: &MemoryStore) {
    store
        .register_procedure("update_building_upgrade_action", |tables, args| {
            let planet = args.first().cloned().ok_or("missing planet")?;
            complete_progress(
                tables,
                "construction_actions_buildings",
                "planet",
                &planet,
                "planets_buildings",
                &[
                    "construction_actions_buildings_production_effects",
                    "construction_actions_buildings_storage_effects",
                ],
            )?;
            Ok(None)
        })
        .unwrap();

    store
        .register_procedure("update_technology_upgrade_action", |tables, args| {
            let player = args.first().cloned().ok_or("missing player")?;
            complete_progress(
                tables,
                "construction_actions_technologies",
                "player",
                &player,
                "player_technologies",
                &[],
            )?;
            Ok(None)
        })
        .unwrap();

    for name in [
        "update_ship_upgrade_action",
        "update_defense_upgrade_action",
        "update_resources_for_planet",
        "fleet_deployment",
        "fleet_transport",
    ] {
        store.register_procedure(name, |_, _| Ok(None)).unwrap();
    }

    store
        .register_procedure("create_building_upgrade_action", |tables, args| {
            let action = text_arg(args, 0)?;
            let planet = json_uuid(&action, "planet")?;

            let table = tables.get_mut("construction_actions_buildings").map_err(native)?;
            if !table.lookup("planet", &planet, "id").map_err(native)?.is_empty() {
                return Err("duplicate key value violates unique constraint \"construction_actions_buildings_planet_key\" (SQLSTATE 23505)".to_string());
            }
            table
                .insert(vec![
                    json_uuid(&action, "id")?,
                    planet,
                    json_uuid(&action, "element")?,
                    Value::Integer(action["current_level"].as_i64().unwrap_or_default()),
                    Value::Integer(action["desired_level"].as_i64().unwrap_or_default()),
                    json_time(&action, "completion_time")?,
                ])
                .map_err(native)?;
            Ok(None)
        })
        .unwrap();

    store
        .register_procedure("create_technology_upgrade_action", |tables, args| {
            let action = text_arg(args, 0)?;
            let player = json_uuid(&action, "player")?;

            let table = tables.get_mut("construction_actions_technologies").map_err(native)?;
            if !table.lookup("player", &player, "id").map_err(native)?.is_empty() {
                return Err("duplicate key value violates unique constraint \"construction_actions_technologies_player_key\" (SQLSTATE 23505)".to_string());
            }
            table
                .insert(vec![
                    json_uuid(&action, "id")?,
                    player,
                    json_uuid(&action, "planet")?,
                    json_uuid(&action, "element")?,
                    Value::Integer(action["current_level"].as_i64().unwrap_or_default()),
                    Value::Integer(action["desired_level"].as_i64().unwrap_or_default()),
                    json_time(&action, "completion_time")?,
                ])
                .map_err(native)?;
            Ok(None)
        })
        .unwrap();

    store
        .register_procedure("create_ship_upgrade_action", |tables, args| {
            let action = text_arg(args, 0)?;
            tables
                .get_mut("construction_actions_ships")
                .map_err(native)?
                .insert(vec![
                    json_uuid(&action, "id")?,
                    json_uuid(&action, "planet")?,
                    json_uuid(&action, "element")?,
                    Value::Integer(action["amount"].as_i64().unwrap_or_default()),
                    Value::Integer(action["remaining"].as_i64().unwrap_or_default()),
                    Value::Integer(action["completion_time"].as_i64().unwrap_or_default()),
                    json_time(&action, "created_at")?,
                ])
                .map_err(native)?;
            Ok(None)
        })
        .unwrap();
}

/// A universe with two players. `home` and `colony` belong to `player`,
/// `enemy_home` to `enemy`.
pub struct World {
    pub ids: Ids,
    pub store: Arc<MemoryStore>,
    pub catalog: Arc<Catalog>,
    pub instance: Instance,
    pub universe: Uuid,
    pub player: Uuid,
    pub enemy: Uuid,
    pub home: Uuid,
    pub colony: Uuid,
    pub enemy_home: Uuid,
}

impl World {
    pub async fn new() -> World {
        Self::with_registry(Arc::new(LockRegistry::with_config(&EngineConfig::default()))).await
    }

    pub async fn with_registry(locks: Arc<LockRegistry>) -> World {
        let ids = Ids::new();
        let store = Arc::new(MemoryStore::new());
        for (name, columns) in TABLES {
            store.create_table(name, columns).await.unwrap();
        }
        register_procedures(&store);

        let catalog = Arc::new(catalog(&ids));
        let instance = Instance::with_registry(catalog.clone(), store.clone(), locks);

        let universe = Uuid::new_v4();
        store
            .insert_row(
                "universes",
                vec![
                    universe.into(),
                    "oberon".into(),
                    1i64.into(),
                    1i64.into(),
                    1i64.into(),
                    0.3.into(),
                    0.0.into(),
                    1.0.into(),
                    9i64.into(),
                    499i64.into(),
                    15i64.into(),
                ],
            )
            .await
            .unwrap();

        let mut world = World {
            ids,
            store,
            catalog,
            instance,
            universe,
            player: Uuid::new_v4(),
            enemy: Uuid::new_v4(),
            home: Uuid::new_v4(),
            colony: Uuid::new_v4(),
            enemy_home: Uuid::new_v4(),
        };

        for (player, name) in [(world.player, "ash"), (world.enemy, "rook")] {
            world
                .store
                .insert_row("players", vec![player.into(), Uuid::new_v4().into(), universe.into(), name.into()])
                .await
                .unwrap();
        }

        let (player, enemy) = (world.player, world.enemy);
        world.home = world.add_planet(player, "homeworld", (1, 10, 4)).await;
        world.colony = world.add_planet(player, "colony", (1, 12, 8)).await;
        world.enemy_home = world.add_planet(enemy, "fortress", (2, 10, 4)).await;
        world
    }

    pub async fn add_planet(&mut self, player: Uuid, name: &str, (galaxy, system, position): (i64, i64, i64)) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .insert_row(
                "planets",
                vec![
                    id.into(),
                    player.into(),
                    name.into(),
                    (-10i64).into(),
                    40i64.into(),
                    163i64.into(),
                    galaxy.into(),
                    system.into(),
                    position.into(),
                    12800i64.into(),
                ],
            )
            .await
            .unwrap();
        for (resource, amount) in [(self.ids.metal, 5000.0), (self.ids.crystal, 5000.0), (self.ids.deuterium, 1000.0)] {
            self.store
                .insert_row(
                    "planets_resources",
                    vec![id.into(), resource.into(), amount.into(), 30.0.into(), 100000.0.into()],
                )
                .await
                .unwrap();
        }
        id
    }

    pub async fn set_resource(&self, planet: Uuid, resource: Uuid, amount: f64) {
        self.store
            .with_tables(|tables| {
                let table = tables.get_mut("planets_resources").unwrap();
                let (res_idx, amount_idx) = (table.column_index("res").unwrap(), table.column_index("amount").unwrap());
                table
                    .update_where("planet", &planet.into(), |_, row: &mut Row| {
                        if row[res_idx] == Value::Uuid(resource) {
                            row[amount_idx] = Value::Float(amount);
                        }
                    })
                    .unwrap();
            })
            .await;
    }

    pub async fn add_building(&self, planet: Uuid, building: Uuid, level: i64) {
        self.store
            .insert_row("planets_buildings", vec![planet.into(), building.into(), level.into()])
            .await
            .unwrap();
    }

    pub async fn add_technology(&self, player: Uuid, technology: Uuid, level: i64) {
        self.store
            .insert_row("player_technologies", vec![player.into(), technology.into(), level.into()])
            .await
            .unwrap();
    }

    pub async fn add_ships(&self, planet: Uuid, ship: Uuid, count: i64) {
        self.store
            .insert_row("planets_ships", vec![planet.into(), ship.into(), count.into()])
            .await
            .unwrap();
    }

    pub async fn add_building_action(&self, planet: Uuid, building: Uuid, current: i64, completion: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .insert_row(
                "construction_actions_buildings",
                vec![
                    id.into(),
                    planet.into(),
                    building.into(),
                    current.into(),
                    (current + 1).into(),
                    completion.into(),
                ],
            )
            .await
            .unwrap();
        id
    }

    pub async fn add_technology_action(
        &self,
        player: Uuid,
        planet: Uuid,
        technology: Uuid,
        current: i64,
        completion: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .insert_row(
                "construction_actions_technologies",
                vec![
                    id.into(),
                    player.into(),
                    planet.into(),
                    technology.into(),
                    current.into(),
                    (current + 1).into(),
                    completion.into(),
                ],
            )
            .await
            .unwrap();
        id
    }
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(minutes)
}

pub fn in_minutes(minutes: i64) -> DateTime<Utc> {
    Utc::now() + Duration::minutes(minutes)
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::Planet;
use crate::catalog::buildings::{NANITE_FACTORY, RESEARCH_LAB, ROBOTICS_FACTORY, SHIPYARD};
use crate::catalog::{Catalog, UpgradableKind, amount_of};
use crate::core::{GameError, ResourceAmount, Result, Scanner, ValidationError, Value};
use crate::store::{Filter, InsertReq, QueryDesc, StoreProxy};

/// Throughput of a construction site, in scarce resources per hour.
const CONSTRUCTION_THROUGHPUT: f64 = 2500.0;
/// Throughput of a laboratory, in scarce resources per hour.
const RESEARCH_THROUGHPUT: f64 = 1000.0;

fn invalid(reason: impl Into<String>) -> GameError {
    ValidationError::InvalidAction(reason.into()).into()
}

fn hours(value: f64) -> Result<Duration> {
    let millis = (value * 3_600_000.0).round();
    if !millis.is_finite() || millis < 0.0 || millis >= i64::MAX as f64 {
        return Err(invalid(format!("{} hours is out of range", value)));
    }
    Duration::try_milliseconds(millis as i64).ok_or_else(|| invalid(format!("{} hours is out of range", value)))
}

/// Hours needed to gather the scarce part of `costs` at `throughput`.
fn build_time(catalog: &Catalog, costs: &[ResourceAmount], throughput: f64) -> Result<Duration> {
    let (metal, crystal) = catalog.resources().scarce()?;
    let scarce = amount_of(costs, metal) + amount_of(costs, crystal);
    hours(scarce / throughput)
}

fn finish_at(start: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>> {
    start
        .checked_add_signed(duration)
        .ok_or_else(|| invalid(format!("completion time out of range ({} ms after {})", duration.num_milliseconds(), start)))
}

/// Level of a supporting building on the planet; a building the catalog
/// does not know counts as not built.
fn facility_level(catalog: &Catalog, planet: &Planet, name: &str) -> i64 {
    catalog
        .buildings()
        .id_of(name)
        .map(|id| planet.building_level(&id))
        .unwrap_or(0)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_string(value)
        .map(Value::Text)
        .map_err(|e| invalid(format!("cannot serialize action: {}", e)))
}

/// Per-unit durations travel as integer milliseconds.
mod millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        Duration::try_milliseconds(millis)
            .ok_or_else(|| serde::de::Error::custom(format!("{} ms is out of range", millis)))
    }
}

// ============================================================================
// Progress actions
// ============================================================================

/// Upgrade of a level-based element by one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressAction {
    pub id: Uuid,
    pub planet: Uuid,
    pub element: Uuid,
    pub current_level: i64,
    pub desired_level: i64,
    pub completion_time: DateTime<Utc>,
    #[serde(default)]
    pub costs: Vec<ResourceAmount>,
}

impl ProgressAction {
    fn new(planet: Uuid, element: Uuid, current_level: i64, desired_level: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            planet,
            element,
            current_level,
            desired_level,
            completion_time: DateTime::<Utc>::UNIX_EPOCH,
            costs: Vec::new(),
        }
    }

    pub fn valid(&self) -> bool {
        self.current_level >= 0 && self.desired_level >= 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingAction {
    #[serde(flatten)]
    pub progress: ProgressAction,
    #[serde(default)]
    pub production_effects: Vec<ResourceAmount>,
    #[serde(default)]
    pub storage_effects: Vec<ResourceAmount>,
}

impl BuildingAction {
    pub fn new(planet: Uuid, element: Uuid, current_level: i64, desired_level: i64) -> Result<Self> {
        let action = Self {
            progress: ProgressAction::new(planet, element, current_level, desired_level),
            production_effects: Vec::new(),
            storage_effects: Vec::new(),
        };
        if !action.valid() {
            return Err(invalid(format!(
                "cannot go from level {} to {}",
                current_level, desired_level
            )));
        }
        Ok(action)
    }

    /// Levels are non-negative and differ by exactly one: an upgrade or a
    /// demolition.
    pub fn valid(&self) -> bool {
        self.progress.valid() && (self.progress.desired_level - self.progress.current_level).abs() == 1
    }

    pub fn is_upgrade(&self) -> bool {
        self.progress.desired_level > self.progress.current_level
    }

    /// Costs at the current level, completion time from the planet's
    /// robotics and nanite factories, then production and storage effects.
    pub fn consolidate_completion_time(&mut self, catalog: &Catalog, planet: &Planet, now: DateTime<Utc>) -> Result<()> {
        let building = catalog.buildings().get(&self.progress.element)?;
        let costs = building.desc.compute_cost(self.progress.current_level);

        let robotics = facility_level(catalog, planet, ROBOTICS_FACTORY);
        let nanite = facility_level(catalog, planet, NANITE_FACTORY);
        let throughput = CONSTRUCTION_THROUGHPUT * (1.0 + robotics as f64) * 2f64.powi(nanite as i32);

        self.progress.completion_time = finish_at(now, build_time(catalog, &costs, throughput)?)?;
        self.progress.costs = costs;

        let temperature = planet.average_temperature();
        let (current, desired) = (self.progress.current_level, self.progress.desired_level);
        self.production_effects = building
            .production_at(desired, temperature)
            .into_iter()
            .zip(building.production_at(current, temperature))
            .map(|(to, from)| ResourceAmount::new(to.resource, to.amount - from.amount))
            .collect();
        self.storage_effects = building
            .storage_at(desired)
            .into_iter()
            .zip(building.storage_at(current))
            .map(|(to, from)| ResourceAmount::new(to.resource, to.amount - from.amount))
            .collect();
        Ok(())
    }

    pub fn validate(&mut self, catalog: &Catalog, planet: &Planet, now: DateTime<Utc>) -> Result<()> {
        if self.progress.planet != planet.id {
            return Err(invalid("action does not belong to the planet"));
        }
        if planet.building_level(&self.progress.element) != self.progress.current_level {
            return Err(invalid(format!(
                "building is not at level {}",
                self.progress.current_level
            )));
        }
        self.consolidate_completion_time(catalog, planet, now)?;
        if self.is_upgrade() && planet.remaining_fields() <= 0 {
            return Err(invalid("no field left on the planet"));
        }

        let building = catalog.buildings().get(&self.progress.element)?;
        planet.validate_action(&self.progress.costs, &building.desc)
    }

    pub async fn save(&self, proxy: &dyn StoreProxy) -> Result<()> {
        let request = InsertReq::call(
            "create_building_upgrade_action",
            vec![
                to_json(&self.progress)?,
                to_json(&self.progress.costs)?,
                to_json(&self.production_effects)?,
                to_json(&self.storage_effects)?,
            ],
        );
        proxy.insert(&request).await?;
        debug!(action = %self.progress.id, planet = %self.progress.planet, "building action created");
        Ok(())
    }
}

/// Research, owned by the player but run from one of their planets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyAction {
    #[serde(flatten)]
    pub progress: ProgressAction,
    pub player: Uuid,
}

impl TechnologyAction {
    pub fn new(planet: Uuid, player: Uuid, element: Uuid, current_level: i64, desired_level: i64) -> Result<Self> {
        let action = Self {
            progress: ProgressAction::new(planet, element, current_level, desired_level),
            player,
        };
        if !action.valid() {
            return Err(invalid(format!(
                "research must reach level {}, not {}",
                current_level + 1,
                desired_level
            )));
        }
        Ok(action)
    }

    pub fn valid(&self) -> bool {
        self.progress.valid() && self.progress.desired_level == self.progress.current_level + 1
    }

    /// Costs at the current level, completion time from the research lab
    /// of the planet running the research.
    pub fn consolidate_completion_time(&mut self, catalog: &Catalog, planet: &Planet, now: DateTime<Utc>) -> Result<()> {
        if self.progress.planet != planet.id {
            return Err(invalid("action does not belong to the planet"));
        }
        let technology = catalog.technologies().get(&self.progress.element)?;
        let costs = technology.compute_cost(self.progress.current_level);

        let lab = facility_level(catalog, planet, RESEARCH_LAB);
        let throughput = RESEARCH_THROUGHPUT * (1.0 + lab as f64);

        self.progress.completion_time = finish_at(now, build_time(catalog, &costs, throughput)?)?;
        self.progress.costs = costs;
        Ok(())
    }

    pub fn validate(&mut self, catalog: &Catalog, planet: &Planet, now: DateTime<Utc>) -> Result<()> {
        if self.progress.planet != planet.id || self.player != planet.player {
            return Err(invalid("action does not belong to the planet's owner"));
        }
        if planet.technology_level(&self.progress.element) != self.progress.current_level {
            return Err(invalid(format!(
                "technology is not at level {}",
                self.progress.current_level
            )));
        }
        self.consolidate_completion_time(catalog, planet, now)?;

        let technology = catalog.technologies().get(&self.progress.element)?;
        planet.validate_action(&self.progress.costs, technology)
    }

    pub async fn save(&self, proxy: &dyn StoreProxy) -> Result<()> {
        let request = InsertReq::call(
            "create_technology_upgrade_action",
            vec![to_json(self)?, to_json(&self.progress.costs)?],
        );
        proxy.insert(&request).await?;
        debug!(action = %self.progress.id, player = %self.player, "technology action created");
        Ok(())
    }
}

// ============================================================================
// Fixed actions
// ============================================================================

/// Production of a batch of identical units, one after the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedAction {
    pub id: Uuid,
    pub kind: UpgradableKind,
    pub planet: Uuid,
    pub element: Uuid,
    pub amount: i64,
    pub remaining: i64,
    /// Time to produce one unit
    #[serde(rename = "completion_time", with = "millis")]
    pub per_unit: Duration,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub costs: Vec<ResourceAmount>,
}

pub type ShipAction = FixedAction;
pub type DefenseAction = FixedAction;

impl FixedAction {
    fn new(kind: UpgradableKind, planet: Uuid, element: Uuid, amount: i64) -> Result<Self> {
        let action = Self {
            id: Uuid::new_v4(),
            kind,
            planet,
            element,
            amount,
            remaining: amount,
            per_unit: Duration::zero(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            costs: Vec::new(),
        };
        if !action.valid() {
            return Err(invalid(format!("cannot build {} units", amount)));
        }
        Ok(action)
    }

    pub fn ship(planet: Uuid, element: Uuid, amount: i64) -> Result<ShipAction> {
        Self::new(UpgradableKind::Ship, planet, element, amount)
    }

    pub fn defense(planet: Uuid, element: Uuid, amount: i64) -> Result<DefenseAction> {
        Self::new(UpgradableKind::Defense, planet, element, amount)
    }

    pub fn valid(&self) -> bool {
        self.amount > 0 && self.remaining >= 0 && self.remaining <= self.amount
    }

    /// When the whole batch is done.
    pub fn completion_time(&self) -> Result<DateTime<Utc>> {
        let total = self
            .per_unit
            .num_milliseconds()
            .checked_mul(self.amount)
            .and_then(Duration::try_milliseconds)
            .ok_or_else(|| invalid(format!("{} units take too long to build", self.amount)))?;
        finish_at(self.created_at, total)
    }

    /// Costs for the whole batch, per-unit duration from the shipyard and
    /// nanite factory. Production starts once the planet's previous batch
    /// of the same kind is done.
    pub fn consolidate_completion_time(&mut self, catalog: &Catalog, planet: &Planet, now: DateTime<Utc>) -> Result<()> {
        let desc = catalog.element(self.kind, &self.element)?;
        let unit_costs = desc.compute_cost(1);

        let shipyard = facility_level(catalog, planet, SHIPYARD);
        let nanite = facility_level(catalog, planet, NANITE_FACTORY);
        let throughput = CONSTRUCTION_THROUGHPUT * (1.0 + shipyard as f64) * 2f64.powi(nanite as i32);

        self.per_unit = build_time(catalog, &unit_costs, throughput)?;
        self.costs = desc.compute_cost(self.amount);

        let queue = match self.kind {
            UpgradableKind::Defense => &planet.defenses_construction,
            _ => &planet.ships_construction,
        };
        self.created_at = queue
            .iter()
            .try_fold(now, |start, batch| Ok::<_, GameError>(start.max(batch.completion_time()?)))?;
        self.completion_time()?;
        Ok(())
    }

    pub fn validate(&mut self, catalog: &Catalog, planet: &Planet, now: DateTime<Utc>) -> Result<()> {
        if self.planet != planet.id {
            return Err(invalid("action does not belong to the planet"));
        }
        self.consolidate_completion_time(catalog, planet, now)?;

        let desc = catalog.element(self.kind, &self.element)?;
        planet.validate_action(&self.costs, desc)
    }

    pub async fn save(&self, proxy: &dyn StoreProxy) -> Result<()> {
        let procedure = match self.kind {
            UpgradableKind::Ship => "create_ship_upgrade_action",
            UpgradableKind::Defense => "create_defense_upgrade_action",
            other => return Err(invalid(format!("a {} is not built in batches", other))),
        };
        let request = InsertReq::call(procedure, vec![to_json(self)?, to_json(&self.costs)?]);
        proxy.insert(&request).await?;
        debug!(action = %self.id, planet = %self.planet, kind = %self.kind, "fixed action created");
        Ok(())
    }
}

// ============================================================================
// Loading
// ============================================================================

async fn fetch_effects(proxy: &dyn StoreProxy, table: &str, column: &str, action: Uuid) -> Result<Vec<ResourceAmount>> {
    let query = QueryDesc::new(table, &["resource", column]).filter(Filter::equals("action", action));
    let mut effects = Vec::new();
    for row in proxy.fetch(&query).await? {
        let mut scan = Scanner::new(&row);
        effects.push(ResourceAmount::new(scan.uuid()?, scan.float()?));
    }
    Ok(effects)
}

/// Building actions still pending on `planet`, with costs recomputed
/// from the catalog.
pub async fn fetch_building_actions(proxy: &dyn StoreProxy, catalog: &Catalog, planet: Uuid) -> Result<Vec<BuildingAction>> {
    let query = QueryDesc::new(
        "construction_actions_buildings",
        &["id", "element", "current_level", "desired_level", "completion_time"],
    )
    .filter(Filter::equals("planet", planet));

    let mut actions = Vec::new();
    for row in proxy.fetch(&query).await? {
        let mut scan = Scanner::new(&row);
        let id = scan.uuid()?;
        let element = scan.uuid()?;
        let current_level = scan.int()?;
        let building = catalog.buildings().get(&element)?;

        actions.push(BuildingAction {
            progress: ProgressAction {
                id,
                planet,
                element,
                current_level,
                desired_level: scan.int()?,
                completion_time: scan.timestamp()?,
                costs: building.desc.compute_cost(current_level),
            },
            production_effects: fetch_effects(
                proxy,
                "construction_actions_buildings_production_effects",
                "production_change",
                id,
            )
            .await?,
            storage_effects: fetch_effects(
                proxy,
                "construction_actions_buildings_storage_effects",
                "storage_capacity_change",
                id,
            )
            .await?,
        });
    }
    Ok(actions)
}

/// The research of `player`, if any. Players run one research at a time.
pub async fn fetch_technology_actions(proxy: &dyn StoreProxy, catalog: &Catalog, player: Uuid) -> Result<Vec<TechnologyAction>> {
    let query = QueryDesc::new(
        "construction_actions_technologies",
        &["id", "planet", "element", "current_level", "desired_level", "completion_time"],
    )
    .filter(Filter::equals("player", player));

    let rows = proxy.fetch(&query).await?;
    if rows.len() > 1 {
        return Err(ValidationError::Duplicated {
            kind: "technology action",
            id: player.to_string(),
        }
        .into());
    }

    let mut actions = Vec::new();
    for row in rows {
        let mut scan = Scanner::new(&row);
        let id = scan.uuid()?;
        let planet = scan.uuid()?;
        let element = scan.uuid()?;
        let current_level = scan.int()?;
        let technology = catalog.technologies().get(&element)?;

        actions.push(TechnologyAction {
            progress: ProgressAction {
                id,
                planet,
                element,
                current_level,
                desired_level: scan.int()?,
                completion_time: scan.timestamp()?,
                costs: technology.compute_cost(current_level),
            },
            player,
        });
    }
    Ok(actions)
}

/// Ship or defense batches still in production on `planet`.
pub async fn fetch_fixed_actions(
    proxy: &dyn StoreProxy,
    catalog: &Catalog,
    kind: UpgradableKind,
    planet: Uuid,
) -> Result<Vec<FixedAction>> {
    let table = format!("construction_actions_{}", kind.table_prefix());
    let query = QueryDesc::new(
        &table,
        &["id", "element", "amount", "remaining", "completion_time", "created_at"],
    )
    .filter(Filter::equals("planet", planet));

    let mut actions = Vec::new();
    for row in proxy.fetch(&query).await? {
        let mut scan = Scanner::new(&row);
        let id = scan.uuid()?;
        let element = scan.uuid()?;
        let amount = scan.int()?;
        let desc = catalog.element(kind, &element)?;

        let action = FixedAction {
            id,
            kind,
            planet,
            element,
            amount,
            remaining: scan.int()?,
            per_unit: Duration::try_milliseconds(scan.int()?)
                .ok_or_else(|| invalid(format!("{} batch {} has an invalid unit duration", kind, id)))?,
            created_at: scan.timestamp()?,
            costs: desc.compute_cost(amount),
        };
        if !action.valid() {
            return Err(invalid(format!("{} batch {} has {} of {} units left", kind, id, action.remaining, amount)));
        }
        actions.push(action);
    }
    Ok(actions)
}

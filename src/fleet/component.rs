use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::formulas::{self, ShipInFleet};
use super::Fleet;
use crate::catalog::Catalog;
use crate::core::{GameError, ResourceAmount, Result, Scanner, ValidationError};
use crate::model::{Coordinate, Planet};
use crate::store::{Filter, QueryDesc, StoreProxy};

fn invalid(reason: impl Into<String>) -> GameError {
    ValidationError::InvalidComponent(reason.into()).into()
}

/// Ships sent by one player from one planet to join a fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: Uuid,
    pub fleet: Uuid,
    pub player: Uuid,
    pub planet: Uuid,
    /// Fraction of the maximum speed
    pub speed: f64,
    pub joined_at: DateTime<Utc>,
    pub ships: Vec<ShipInFleet>,
    #[serde(default)]
    pub cargo: Vec<ResourceAmount>,
    #[serde(skip)]
    pub consumption: Vec<ResourceAmount>,
    #[serde(skip)]
    pub flight_time: f64,
}

impl Component {
    pub fn new(fleet: Uuid, player: Uuid, planet: Uuid, speed: f64, joined_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fleet,
            player,
            planet,
            speed,
            joined_at,
            ships: Vec::new(),
            cargo: Vec::new(),
            consumption: Vec::new(),
            flight_time: 0.0,
        }
    }

    pub fn with_ships(mut self, ship: Uuid, count: i64) -> Self {
        self.ships.push(ShipInFleet::new(ship, count));
        self
    }

    pub fn with_cargo(mut self, resource: Uuid, amount: f64) -> Self {
        self.cargo.push(ResourceAmount::new(resource, amount));
        self
    }

    /// Non-empty manifest of positive counts and a speed ratio in `(0, 1]`.
    pub fn valid(&self) -> bool {
        !self.ships.is_empty()
            && self.ships.iter().all(|s| s.count > 0)
            && self.speed > 0.0
            && self.speed <= 1.0
    }

    pub fn arrival_time(&self) -> DateTime<Utc> {
        self.joined_at + formulas::flight_duration(self.flight_time)
    }

    /// Flight time and fuel from `source` to `target`, given the source
    /// owner's propulsion technologies.
    pub fn consolidate(&mut self, catalog: &Catalog, source: &Planet, target: &Coordinate) -> Result<()> {
        let distance = formulas::distance(&source.coordinate, target);
        let slowest = formulas::slowest_speed(catalog, &self.ships, &source.technologies)?;

        self.flight_time = formulas::flight_time(distance, self.speed, slowest);
        self.consumption = formulas::consumption(catalog, &self.ships, distance, self.flight_time)?;
        Ok(())
    }

    pub fn cargo_capacity(&self, catalog: &Catalog) -> Result<f64> {
        let mut capacity = 0.0;
        for ship in &self.ships {
            capacity += catalog.ships().get(&ship.id)?.cargo * ship.count as f64;
        }
        Ok(capacity)
    }

    /// Checks the component can join `fleet` from `source`. `target_owner`
    /// is the owner of the planet at the fleet's destination, if any.
    pub fn validate(&mut self, catalog: &Catalog, fleet: &Fleet, source: &Planet, target_owner: Option<Uuid>) -> Result<()> {
        if self.planet != source.id {
            return Err(invalid("component does not start from the planet"));
        }
        if self.fleet != fleet.id {
            return Err(invalid("component does not belong to the fleet"));
        }
        if !self.valid() {
            return Err(invalid("empty manifest or speed out of range"));
        }

        self.consolidate(catalog, source, &fleet.target)?;

        let mut needed = 0.0;
        for load in &self.cargo {
            if load.amount < 0.0 {
                return Err(ValidationError::InvalidCargo { resource: load.resource }.into());
            }
            needed += load.amount;
        }
        let capacity = self.cargo_capacity(catalog)?;
        if needed > capacity {
            return Err(ValidationError::InsufficientCargo { needed, capacity }.into());
        }

        let arrival = self.arrival_time();
        if arrival != fleet.arrival_time {
            return Err(ValidationError::ArrivalTimeMismatch {
                expected: fleet.arrival_time.to_rfc3339(),
                computed: arrival.to_rfc3339(),
            }
            .into());
        }

        let objective = catalog.objectives().get(&fleet.objective)?;
        if (objective.directed || objective.hostile) && target_owner.is_none() {
            return Err(ValidationError::InvalidObjective(format!("{} needs a target planet", objective.name)).into());
        }
        if objective.hostile && target_owner == Some(source.player) {
            return Err(ValidationError::InvalidObjective(format!("{} against own planet", objective.name)).into());
        }

        let ships: Vec<(Uuid, i64)> = self.ships.iter().map(|s| (s.id, s.count)).collect();
        source.validate_fleet(&self.consumption, &self.cargo, &ships)
    }

    pub async fn load(proxy: &dyn StoreProxy, id: Uuid) -> Result<Component> {
        let query = QueryDesc::new("fleet_elements", &["fleet", "player", "planet", "speed", "joined_at"])
            .filter(Filter::equals("id", id));
        let row = proxy.fetch(&query).await?.single("fleet component", id)?;

        let mut scan = Scanner::new(&row);
        let mut component = Component {
            id,
            fleet: scan.uuid()?,
            player: scan.uuid()?,
            planet: scan.uuid()?,
            speed: scan.float()?,
            joined_at: scan.timestamp()?,
            ships: Vec::new(),
            cargo: Vec::new(),
            consumption: Vec::new(),
            flight_time: 0.0,
        };

        let query = QueryDesc::new("fleet_ships", &["ship", "count"]).filter(Filter::equals("fleet_element", id));
        for row in proxy.fetch(&query).await? {
            let mut scan = Scanner::new(&row);
            component.ships.push(ShipInFleet::new(scan.uuid()?, scan.int()?));
        }

        let query = QueryDesc::new("fleet_resources", &["resource", "amount"]).filter(Filter::equals("fleet_element", id));
        for row in proxy.fetch(&query).await? {
            let mut scan = Scanner::new(&row);
            component.cargo.push(ResourceAmount::new(scan.uuid()?, scan.float()?));
        }

        Ok(component)
    }
}

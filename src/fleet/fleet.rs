use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::debug;
use uuid::Uuid;

use super::Component;
use crate::catalog::Catalog;
use crate::catalog::objectives::{DEPLOYMENT, TRANSPORT};
use crate::core::{Result, Scanner, ValidationError};
use crate::locker::HeldLocks;
use crate::model::{Coordinate, Location, Planet};
use crate::store::{Filter, InsertReq, QueryDesc, StoreProxy};

/// Ships travelling together to one destination with one objective.
#[derive(Debug)]
pub struct Fleet {
    pub id: Uuid,
    pub name: String,
    pub universe: Uuid,
    pub objective: Uuid,
    pub target: Coordinate,
    /// Planet at the destination, when there is one
    pub target_planet: Option<Uuid>,
    pub arrival_time: DateTime<Utc>,
    pub components: Vec<Component>,
    locks: HeldLocks,
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetView {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "uni")]
    pub universe: Uuid,
    pub objective: Uuid,
    pub target: Coordinate,
    #[serde(rename = "planet", skip_serializing_if = "Option::is_none")]
    pub target_planet: Option<Uuid>,
    pub arrival_time: DateTime<Utc>,
    pub components: Vec<Component>,
}

impl Fleet {
    pub fn new(
        name: &str,
        universe: Uuid,
        objective: Uuid,
        target: Coordinate,
        target_planet: Option<Uuid>,
        arrival_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            universe,
            objective,
            target,
            target_planet,
            arrival_time,
            components: Vec::new(),
            locks: HeldLocks::default(),
        }
    }

    /// At least one ship of some component can carry out the objective.
    pub fn validate(&self, catalog: &Catalog) -> Result<()> {
        let objective = catalog.objectives().get(&self.objective)?;
        let capable = self
            .components
            .iter()
            .flat_map(|c| c.ships.iter())
            .any(|ship| objective.can_be_performed_by(&ship.id));
        if !capable {
            return Err(ValidationError::InvalidObjective(format!("no ship can perform {}", objective.name)).into());
        }
        Ok(())
    }

    /// Owner of the destination planet. A destination planet that does not
    /// exist is an invalid objective.
    pub async fn target_owner(&self, proxy: &dyn StoreProxy) -> Result<Option<Uuid>> {
        let Some(planet) = self.target_planet else {
            return Ok(None);
        };
        let query = QueryDesc::new("planets", &["player"]).filter(Filter::equals("id", planet));
        match proxy.fetch(&query).await?.at_most_one("planet", planet)? {
            Some(row) => Scanner::new(&row).uuid().map(Some),
            None => Err(ValidationError::InvalidObjective(format!("target planet {} does not exist", planet)).into()),
        }
    }

    /// Validates `component` against this fleet, resolving the owner of
    /// the destination first.
    pub async fn validate_component(
        &self,
        catalog: &Catalog,
        proxy: &dyn StoreProxy,
        component: &mut Component,
        source: &Planet,
    ) -> Result<()> {
        let owner = self.target_owner(proxy).await?;
        component.validate(catalog, self, source, owner)
    }

    /// Runs the store-side outcome of the objective at arrival.
    pub async fn simulate(&self, catalog: &Catalog, proxy: &dyn StoreProxy) -> Result<()> {
        let objective = catalog.objectives().get(&self.objective)?;
        let procedure = match objective.name.as_str() {
            DEPLOYMENT => "fleet_deployment",
            TRANSPORT => "fleet_transport",
            other => return Err(ValidationError::UnsupportedObjective(other.to_string()).into()),
        };

        proxy.insert(&InsertReq::call(procedure, vec![self.id.into()])).await?;
        debug!(fleet = %self.id, procedure, "fleet simulated");
        Ok(())
    }

    pub(crate) fn attach(&mut self, locks: HeldLocks) {
        self.locks = locks;
    }

    pub fn is_locked(&self) -> bool {
        self.locks.is_held()
    }

    pub fn close(&mut self) -> Result<()> {
        self.locks.release(self.id)
    }

    pub fn view(&self) -> FleetView {
        FleetView {
            id: self.id,
            name: self.name.clone(),
            universe: self.universe,
            objective: self.objective,
            target: self.target,
            target_planet: self.target_planet,
            arrival_time: self.arrival_time,
            components: self.components.clone(),
        }
    }

    pub async fn fetch(proxy: &dyn StoreProxy, id: Uuid) -> Result<Fleet> {
        let query = QueryDesc::new(
            "fleets",
            &[
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
        )
        .filter(Filter::equals("id", id));
        let row = proxy.fetch(&query).await?.single("fleet", id)?;

        let mut scan = Scanner::new(&row);
        let name = scan.text()?;
        let universe = scan.uuid()?;
        let objective = scan.uuid()?;
        let (galaxy, system, position) = (scan.int()?, scan.int()?, scan.int()?);
        let location: Location = scan.text()?.parse()?;

        let mut fleet = Fleet {
            id,
            name,
            universe,
            objective,
            target: Coordinate::from_parts(galaxy, system, position, location)?,
            target_planet: scan.opt_uuid()?,
            arrival_time: scan.timestamp()?,
            components: Vec::new(),
            locks: HeldLocks::default(),
        };

        let query = QueryDesc::new("fleet_elements", &["id"]).filter(Filter::equals("fleet", id));
        for row in proxy.fetch(&query).await? {
            let component = Scanner::new(&row).uuid()?;
            fleet.components.push(Component::load(proxy, component).await?);
        }
        Ok(fleet)
    }
}

impl Serialize for Fleet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.view().serialize(serializer)
    }
}

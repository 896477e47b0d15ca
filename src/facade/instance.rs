use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::core::{Result, parse_id};
use crate::fleet::{Component, Fleet};
use crate::locker::{EntityGuard, HeldLocks, LockClass, LockRegistry, release_all};
use crate::model::{AccessMode, Planet, Player, Universe, planet, player};
use crate::store::{InsertReq, StoreProxy};

/// Resolution procedures run before a planet is read, in this order.
const PLANET_RESOLUTION: [&str; 4] = [
    "update_building_upgrade_action",
    "update_ship_upgrade_action",
    "update_defense_upgrade_action",
    "update_resources_for_planet",
];
const RESEARCH_RESOLUTION: &str = "update_technology_upgrade_action";

/// Entry point to the game state: the catalog, the store and the locks
/// protecting entities while they are loaded.
///
/// Lock order is fleet, then planet, then player. A planet load takes
/// the planet lock before its owner's.
#[derive(Clone)]
pub struct Instance {
    catalog: Arc<Catalog>,
    proxy: Arc<dyn StoreProxy>,
    locks: Arc<LockRegistry>,
}

impl Instance {
    pub fn new(catalog: Arc<Catalog>, proxy: Arc<dyn StoreProxy>, config: &EngineConfig) -> Self {
        Self::with_registry(catalog, proxy, Arc::new(LockRegistry::with_config(config)))
    }

    /// Shares an existing registry, e.g. one carrying an observer.
    pub fn with_registry(catalog: Arc<Catalog>, proxy: Arc<dyn StoreProxy>, locks: Arc<LockRegistry>) -> Self {
        Self { catalog, proxy, locks }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn proxy(&self) -> &dyn StoreProxy {
        self.proxy.as_ref()
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub async fn universe(&self, id: Uuid) -> Result<Universe> {
        Universe::load(self.proxy(), id).await
    }

    async fn resolve(&self, procedure: &str, id: Uuid) -> Result<()> {
        let started = Instant::now();
        self.proxy.insert(&InsertReq::call(procedure, vec![id.into()])).await?;
        debug!(
            procedure,
            entity = %id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "actions resolved"
        );
        Ok(())
    }

    /// Keeps or gives back the guards of a successful load.
    fn finish(guards: Vec<EntityGuard>, mode: AccessMode) -> HeldLocks {
        match mode {
            AccessMode::ReadOnly => {
                release_all(guards);
                HeldLocks::default()
            }
            AccessMode::ReadWrite => HeldLocks::new(guards),
        }
    }

    /// Loads a planet after resolving everything that elapsed on it and
    /// on its owner's research.
    pub async fn planet(&self, id: Uuid, mode: AccessMode) -> Result<Planet> {
        let mut guards = vec![self.locks.lock(LockClass::Planet, id).await];

        match self.load_planet(id, &mut guards).await {
            Ok(mut planet) => {
                planet.attach(Self::finish(guards, mode));
                Ok(planet)
            }
            Err(err) => {
                debug!(planet = %id, error = %err, "planet load aborted");
                release_all(guards);
                Err(err)
            }
        }
    }

    async fn load_planet(&self, id: Uuid, guards: &mut Vec<EntityGuard>) -> Result<Planet> {
        let owner = planet::fetch_owner(self.proxy(), id).await?;
        guards.push(self.locks.lock(LockClass::Player, owner).await);

        self.resolve(RESEARCH_RESOLUTION, owner).await?;
        for procedure in PLANET_RESOLUTION {
            self.resolve(procedure, id).await?;
        }

        Planet::fetch(self.proxy(), &self.catalog, id).await
    }

    pub async fn player(&self, id: Uuid, mode: AccessMode) -> Result<Player> {
        let guards = vec![self.locks.lock(LockClass::Player, id).await];

        let loaded = async {
            player::fetch_exists(self.proxy(), id).await?;
            self.resolve(RESEARCH_RESOLUTION, id).await?;
            Player::fetch(self.proxy(), &self.catalog, id).await
        }
        .await;

        match loaded {
            Ok(mut player) => {
                player.attach(Self::finish(guards, mode));
                Ok(player)
            }
            Err(err) => {
                release_all(guards);
                Err(err)
            }
        }
    }

    /// Loads a fleet and its components. Fleets are not resolved here:
    /// arrival is handled by [`Fleet::simulate`].
    pub async fn fleet(&self, id: Uuid, mode: AccessMode) -> Result<Fleet> {
        let guards = vec![self.locks.lock(LockClass::Fleet, id).await];

        match Fleet::fetch(self.proxy(), id).await {
            Ok(mut fleet) => {
                fleet.attach(Self::finish(guards, mode));
                Ok(fleet)
            }
            Err(err) => {
                release_all(guards);
                Err(err)
            }
        }
    }

    /// Same as [`Instance::planet`] for an identifier received as text.
    pub async fn planet_from_str(&self, raw: &str, mode: AccessMode) -> Result<Planet> {
        self.planet(parse_id(raw)?, mode).await
    }

    pub async fn player_from_str(&self, raw: &str, mode: AccessMode) -> Result<Player> {
        self.player(parse_id(raw)?, mode).await
    }

    pub async fn fleet_from_str(&self, raw: &str, mode: AccessMode) -> Result<Fleet> {
        self.fleet(parse_id(raw)?, mode).await
    }

    pub async fn validate_component(&self, fleet: &Fleet, component: &mut Component, source: &Planet) -> Result<()> {
        fleet
            .validate_component(&self.catalog, self.proxy(), component, source)
            .await
    }

    pub async fn simulate(&self, fleet: &Fleet) -> Result<()> {
        fleet.simulate(&self.catalog, self.proxy()).await
    }
}

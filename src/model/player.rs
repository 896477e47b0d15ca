use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use uuid::Uuid;

use super::action::{self, TechnologyAction};
use super::planet::{self, LevelInfo};
use crate::catalog::Catalog;
use crate::core::{Result, Scanner};
use crate::locker::HeldLocks;
use crate::store::{Filter, QueryDesc, StoreProxy};

/// A player of one universe and their research.
#[derive(Debug)]
pub struct Player {
    pub id: Uuid,
    pub account: Uuid,
    pub universe: Uuid,
    pub name: String,
    pub technologies: BTreeMap<Uuid, LevelInfo>,
    pub research: Vec<TechnologyAction>,
    locks: HeldLocks,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub id: Uuid,
    pub account: Uuid,
    #[serde(rename = "uni")]
    pub universe: Uuid,
    pub name: String,
    pub technologies: Vec<LevelInfo>,
    pub research: Vec<TechnologyAction>,
}

impl Player {
    pub fn technology_level(&self, id: &Uuid) -> i64 {
        self.technologies.get(id).map(|t| t.level).unwrap_or(0)
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

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            account: self.account,
            universe: self.universe,
            name: self.name.clone(),
            technologies: self.technologies.values().cloned().collect(),
            research: self.research.clone(),
        }
    }

    /// Reads the player's rows. Pending research must have been resolved
    /// before.
    pub async fn fetch(proxy: &dyn StoreProxy, catalog: &Catalog, id: Uuid) -> Result<Player> {
        let query = QueryDesc::new("players", &["account", "uni", "name"]).filter(Filter::equals("id", id));
        let row = proxy.fetch(&query).await?.single("player", id)?;

        let mut scan = Scanner::new(&row);
        Ok(Player {
            id,
            account: scan.uuid()?,
            universe: scan.uuid()?,
            name: scan.text()?,
            technologies: planet::fetch_technologies(proxy, catalog, id).await?,
            research: action::fetch_technology_actions(proxy, catalog, id).await?,
            locks: HeldLocks::default(),
        })
    }
}

/// Existence check run before resolution, so that unknown players are
/// reported without touching the store's procedures.
pub async fn fetch_exists(proxy: &dyn StoreProxy, id: Uuid) -> Result<()> {
    let query = QueryDesc::new("players", &["id"]).filter(Filter::equals("id", id));
    proxy.fetch(&query).await?.single("player", id).map(|_| ())
}

impl Serialize for Player {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.view().serialize(serializer)
    }
}

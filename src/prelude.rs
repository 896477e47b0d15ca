//! Types needed by most callers of the engine.

pub use crate::catalog::{Catalog, CatalogData, UpgradableKind};
pub use crate::config::EngineConfig;
pub use crate::core::{GameError, Result, ValidationError, parse_id};
pub use crate::facade::Instance;
pub use crate::fleet::{Component, Fleet};
pub use crate::locker::{LockClass, LockRegistry};
pub use crate::model::{
    AccessMode, BuildingAction, Coordinate, FixedAction, Planet, Player, TechnologyAction, Universe,
};
pub use crate::store::{MemoryStore, StoreProxy};

pub mod action;
pub mod coordinate;
pub mod planet;
pub mod player;
pub mod shape;
pub mod universe;

pub use action::{BuildingAction, DefenseAction, FixedAction, ProgressAction, ShipAction, TechnologyAction};
pub use coordinate::{Coordinate, Location};
pub use planet::{CountInfo, LevelInfo, Planet, PlanetView, ResourceInfo};
pub use player::{Player, PlayerView};
pub use shape::PlanetShape;
pub use universe::Universe;

/// How long a loaded aggregate keeps its locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Locks are released before the aggregate is returned.
    ReadOnly,
    /// Locks are held until the caller closes the aggregate.
    ReadWrite,
}

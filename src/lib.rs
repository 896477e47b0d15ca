// ============================================================================
// oglike-core Library
// ============================================================================

//! Entity access for a persistent-world strategy game.
//!
//! Planets, players and fleets are loaded under per-entity locks. Before
//! a planet or a player is read, the store resolves whatever elapsed since
//! the last access: finished constructions, finished research and the
//! resources produced meanwhile.
//!
//! ```
//! use oglike_core::fleet::formulas;
//! use oglike_core::model::Coordinate;
//!
//! let from = Coordinate::planet(1, 10, 4);
//! let to = Coordinate::planet(1, 13, 4);
//! assert_eq!(formulas::distance(&from, &to), 2985.0);
//! ```

pub mod catalog;
pub mod config;
pub mod core;
pub mod facade;
pub mod fleet;
pub mod locker;
pub mod model;
pub mod prelude;
pub mod store;

// Re-export main types for convenience
pub use crate::core::{GameError, Result};
pub use catalog::Catalog;
pub use config::EngineConfig;
pub use facade::Instance;
pub use model::AccessMode;

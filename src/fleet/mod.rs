pub mod component;
#[allow(clippy::module_inception)]
pub mod fleet;
pub mod formulas;

pub use component::Component;
pub use fleet::{Fleet, FleetView};
pub use formulas::ShipInFleet;

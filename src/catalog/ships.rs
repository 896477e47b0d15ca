use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Upgradable, UpgradableDesc};
use crate::core::ResourceAmount;

/// Engine of a ship: the technology driving it and the speed gained per
/// level of that technology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Propulsion {
    pub technology: Uuid,
    pub increase: f64,
}

impl Propulsion {
    pub fn speed(&self, base: f64, level: i64) -> f64 {
        base + level.max(0) as f64 * self.increase
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipDesc {
    #[serde(flatten)]
    pub desc: UpgradableDesc,
    pub cargo: f64,
    pub speed: f64,
    pub propulsion: Propulsion,
    /// Fuel needed per unit for a reference trip
    #[serde(default)]
    pub consumption: Vec<ResourceAmount>,
}

impl ShipDesc {
    pub fn new(desc: UpgradableDesc, cargo: f64, speed: f64, propulsion: Propulsion) -> Self {
        Self {
            desc,
            cargo,
            speed,
            propulsion,
            consumption: Vec::new(),
        }
    }

    pub fn with_fuel(mut self, resource: Uuid, amount: f64) -> Self {
        self.consumption.push(ResourceAmount::new(resource, amount));
        self
    }

    /// Speed once the propulsion technology reached `level`.
    pub fn speed_at(&self, level: i64) -> f64 {
        self.propulsion.speed(self.speed, level)
    }
}

impl Upgradable for ShipDesc {
    fn desc(&self) -> &UpgradableDesc {
        &self.desc
    }
}

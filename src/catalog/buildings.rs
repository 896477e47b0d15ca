use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Upgradable, UpgradableDesc};
use crate::core::ResourceAmount;

pub const ROBOTICS_FACTORY: &str = "robotics factory";
pub const NANITE_FACTORY: &str = "nanite factory";
pub const SHIPYARD: &str = "shipyard";
pub const RESEARCH_LAB: &str = "research lab";

/// Hourly production of a resource granted by a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRule {
    pub resource: Uuid,
    pub init: f64,
    pub progression: f64,
    #[serde(default = "default_offset")]
    pub temperature_offset: f64,
    #[serde(default)]
    pub temperature_coeff: f64,
}

fn default_offset() -> f64 {
    1.0
}

impl ProductionRule {
    /// `(offset + T × coeff) × init × L × progression^L`
    pub fn compute(&self, level: i64, temperature: f64) -> f64 {
        let level = level.max(0);
        let thermal = self.temperature_offset + temperature * self.temperature_coeff;
        thermal * self.init * level as f64 * self.progression.powi(level as i32)
    }
}

/// Storage capacity granted by a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRule {
    pub resource: Uuid,
    pub init: f64,
    pub multiplier: f64,
    pub progress: f64,
}

impl StorageRule {
    /// `init × floor(multiplier × e^(progress × L))`
    pub fn compute(&self, level: i64) -> f64 {
        let level = level.max(0) as f64;
        self.init * (self.multiplier * (self.progress * level).exp()).floor()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDesc {
    #[serde(flatten)]
    pub desc: UpgradableDesc,
    #[serde(default)]
    pub production: Vec<ProductionRule>,
    #[serde(default)]
    pub storage: Vec<StorageRule>,
}

impl BuildingDesc {
    pub fn new(desc: UpgradableDesc) -> Self {
        Self {
            desc,
            production: Vec::new(),
            storage: Vec::new(),
        }
    }

    pub fn with_production(mut self, rule: ProductionRule) -> Self {
        self.production.push(rule);
        self
    }

    pub fn with_storage(mut self, rule: StorageRule) -> Self {
        self.storage.push(rule);
        self
    }

    pub fn production_at(&self, level: i64, temperature: f64) -> Vec<ResourceAmount> {
        self.production
            .iter()
            .map(|rule| ResourceAmount::new(rule.resource, rule.compute(level, temperature)))
            .collect()
    }

    pub fn storage_at(&self, level: i64) -> Vec<ResourceAmount> {
        self.storage
            .iter()
            .map(|rule| ResourceAmount::new(rule.resource, rule.compute(level)))
            .collect()
    }
}

impl Upgradable for BuildingDesc {
    fn desc(&self) -> &UpgradableDesc {
        &self.desc
    }
}

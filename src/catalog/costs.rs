use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::ResourceAmount;

/// Cost scaling exponentially with the level being reached.
///
/// `cost(level) = floor(init × progression^level)` per resource, negative
/// levels are clamped to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressCost {
    pub init_costs: Vec<ResourceAmount>,
    #[serde(default = "default_progression")]
    pub progression: f64,
}

fn default_progression() -> f64 {
    1.0
}

impl ProgressCost {
    pub fn new(init_costs: Vec<ResourceAmount>, progression: f64) -> Self {
        Self {
            init_costs,
            progression,
        }
    }

    pub fn compute(&self, level: i64) -> Vec<ResourceAmount> {
        let factor = self.progression.powi(level.max(0) as i32);
        self.init_costs
            .iter()
            .map(|c| ResourceAmount::new(c.resource, (c.amount * factor).floor()))
            .collect()
    }
}

/// Cost proportional to the number of units produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedCost {
    pub init_costs: Vec<ResourceAmount>,
}

impl FixedCost {
    pub fn new(init_costs: Vec<ResourceAmount>) -> Self {
        Self { init_costs }
    }

    pub fn compute(&self, count: i64) -> Vec<ResourceAmount> {
        let count = count.max(0) as f64;
        self.init_costs
            .iter()
            .map(|c| ResourceAmount::new(c.resource, (c.amount * count).floor()))
            .collect()
    }
}

/// Cost function attached to an upgradable element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum CostModel {
    Progress(ProgressCost),
    Fixed(FixedCost),
}

impl CostModel {
    /// Cost at `n`, a level for progress costs or a unit count for fixed
    /// costs.
    pub fn compute(&self, n: i64) -> Vec<ResourceAmount> {
        match self {
            Self::Progress(cost) => cost.compute(n),
            Self::Fixed(cost) => cost.compute(n),
        }
    }

    pub fn init_costs(&self) -> &[ResourceAmount] {
        match self {
            Self::Progress(cost) => &cost.init_costs,
            Self::Fixed(cost) => &cost.init_costs,
        }
    }

    pub fn init_costs_mut(&mut self) -> &mut Vec<ResourceAmount> {
        match self {
            Self::Progress(cost) => &mut cost.init_costs,
            Self::Fixed(cost) => &mut cost.init_costs,
        }
    }

    pub fn is_progress(&self) -> bool {
        matches!(self, Self::Progress(_))
    }
}

/// Amount of `resource` in a cost list, zero when absent.
pub fn amount_of(costs: &[ResourceAmount], resource: Uuid) -> f64 {
    costs
        .iter()
        .filter(|c| c.resource == resource)
        .map(|c| c.amount)
        .sum()
}

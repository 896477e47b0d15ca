use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{Result, Scanner, ValidationError};
use crate::store::{Filter, QueryDesc, StoreProxy};

/// Per-universe settings: speed multipliers, ruin ratios and dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub id: Uuid,
    pub name: String,
    pub economic_speed: u32,
    pub fleet_speed: u32,
    pub research_speed: u32,
    pub fleets_to_ruins_ratio: f64,
    pub defenses_to_ruins_ratio: f64,
    pub fleets_consumption_ratio: f64,
    pub galaxies_count: u32,
    pub galaxy_size: u32,
    pub solar_system_size: u32,
}

impl Universe {
    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("fleets_to_ruins_ratio", self.fleets_to_ruins_ratio),
            ("defenses_to_ruins_ratio", self.defenses_to_ruins_ratio),
            ("fleets_consumption_ratio", self.fleets_consumption_ratio),
        ];
        for (name, ratio) in ratios {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(ValidationError::InvalidUniverse(format!("{} must be in [0, 1], got {}", name, ratio)).into());
            }
        }

        let counts = [
            ("economic_speed", self.economic_speed),
            ("fleet_speed", self.fleet_speed),
            ("research_speed", self.research_speed),
            ("galaxies_count", self.galaxies_count),
            ("galaxy_size", self.galaxy_size),
            ("solar_system_size", self.solar_system_size),
        ];
        for (name, count) in counts {
            if count == 0 {
                return Err(ValidationError::InvalidUniverse(format!("{} must be > 0", name)).into());
            }
        }

        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidUniverse("name cannot be empty".to_string()).into());
        }

        Ok(())
    }

    pub async fn load(proxy: &dyn StoreProxy, id: Uuid) -> Result<Universe> {
        let query = QueryDesc::new(
            "universes",
            &[
                "name",
                "economic_speed",
                "fleet_speed",
                "research_speed",
                "fleets_to_ruins_ratio",
                "defenses_to_ruins_ratio",
                "fleets_consumption_ratio",
                "galaxies_count",
                "galaxy_size",
                "solar_system_size",
            ],
        )
        .filter(Filter::equals("id", id));

        let row = proxy.fetch(&query).await?.single("universe", id)?;
        let mut scan = Scanner::new(&row);
        let count = |v: i64| {
            u32::try_from(v).map_err(|_| ValidationError::InvalidUniverse(format!("negative count {}", v)))
        };

        let universe = Universe {
            id,
            name: scan.text()?,
            economic_speed: count(scan.int()?)?,
            fleet_speed: count(scan.int()?)?,
            research_speed: count(scan.int()?)?,
            fleets_to_ruins_ratio: scan.float()?,
            defenses_to_ruins_ratio: scan.float()?,
            fleets_consumption_ratio: scan.float()?,
            galaxies_count: count(scan.int()?)?,
            galaxy_size: count(scan.int()?)?,
            solar_system_size: count(scan.int()?)?,
        };
        universe.validate()?;
        Ok(universe)
    }
}

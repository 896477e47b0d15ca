use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{BuildingDesc, Catalog, ObjectiveDesc, ResourceDesc, ShipDesc, UpgradableDesc};
use crate::core::{ConsistencyError, Result};

/// Serializable form of a whole catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub resources: Vec<ResourceDesc>,
    #[serde(default)]
    pub buildings: Vec<BuildingDesc>,
    #[serde(default)]
    pub technologies: Vec<UpgradableDesc>,
    #[serde(default)]
    pub ships: Vec<ShipDesc>,
    #[serde(default)]
    pub defenses: Vec<UpgradableDesc>,
    #[serde(default)]
    pub objectives: Vec<ObjectiveDesc>,
}

impl CatalogData {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| ConsistencyError::Inconsistent(format!("invalid catalog document: {}", e)).into())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConsistencyError::Inconsistent(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConsistencyError::Inconsistent(e.to_string()).into())
    }

    pub fn into_catalog(self) -> Result<Catalog> {
        let mut builder = Catalog::builder();
        for resource in self.resources {
            builder = builder.resource(resource)?;
        }
        for building in self.buildings {
            builder = builder.building(building)?;
        }
        for technology in self.technologies {
            builder = builder.technology(technology)?;
        }
        for ship in self.ships {
            builder = builder.ship(ship)?;
        }
        for defense in self.defenses {
            builder = builder.defense(defense)?;
        }
        for objective in self.objectives {
            builder = builder.objective(objective)?;
        }
        builder.build()
    }
}

impl From<&Catalog> for CatalogData {
    fn from(catalog: &Catalog) -> Self {
        Self {
            resources: catalog.resources().iter().cloned().collect(),
            buildings: catalog.buildings().iter().cloned().collect(),
            technologies: catalog.technologies().iter().cloned().collect(),
            ships: catalog.ships().iter().cloned().collect(),
            defenses: catalog.defenses().iter().cloned().collect(),
            objectives: catalog.objectives().iter().cloned().collect(),
        }
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Universe;
use crate::core::{GameError, Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Planet,
    Moon,
    Debris,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planet => "planet",
            Self::Moon => "moon",
            Self::Debris => "debris",
        }
    }
}

impl FromStr for Location {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planet" => Ok(Self::Planet),
            "moon" => Ok(Self::Moon),
            "debris" => Ok(Self::Debris),
            other => Err(ValidationError::InvalidCoordinate(format!("unknown location '{}'", other)).into()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a celestial body in a universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub galaxy: u32,
    pub system: u32,
    pub position: u32,
    pub location: Location,
}

/// Cantor pairing; the even factor of `n(n+1)` is halved first so the
/// wrapping product stays exact while it fits.
fn cantor(a: u64, b: u64) -> u64 {
    let n = a.wrapping_add(b);
    let (x, y) = if n % 2 == 0 { (n / 2, n.wrapping_add(1)) } else { (n, n.wrapping_add(1) / 2) };
    x.wrapping_mul(y).wrapping_add(b)
}

impl Coordinate {
    pub fn new(galaxy: u32, system: u32, position: u32, location: Location) -> Self {
        Self {
            galaxy,
            system,
            position,
            location,
        }
    }

    pub fn planet(galaxy: u32, system: u32, position: u32) -> Self {
        Self::new(galaxy, system, position, Location::Planet)
    }

    pub fn moon(galaxy: u32, system: u32, position: u32) -> Self {
        Self::new(galaxy, system, position, Location::Moon)
    }

    pub fn debris(galaxy: u32, system: u32, position: u32) -> Self {
        Self::new(galaxy, system, position, Location::Debris)
    }

    /// Builds a coordinate from store integers, rejecting negative parts.
    pub fn from_parts(galaxy: i64, system: i64, position: i64, location: Location) -> Result<Self> {
        let part = |v: i64| {
            u32::try_from(v).map_err(|_| {
                GameError::from(ValidationError::InvalidCoordinate(format!(
                    "{}:{}:{}",
                    galaxy, system, position
                )))
            })
        };
        Ok(Self::new(part(galaxy)?, part(system)?, part(position)?, location))
    }

    pub fn valid(&self, universe: &Universe) -> bool {
        self.galaxy < universe.galaxies_count
            && self.system < universe.galaxy_size
            && self.position < universe.solar_system_size
    }

    pub fn validate(&self, universe: &Universe) -> Result<()> {
        if !self.valid(universe) {
            return Err(ValidationError::InvalidCoordinate(self.to_string()).into());
        }
        Ok(())
    }

    /// Unique integer for the coordinate within a universe, keeping the
    /// galaxy/system/position digits readable.
    pub fn linearize(&self, universe: &Universe) -> u64 {
        let digits = |n: u32| n.max(1).to_string().len() as u32;
        let system_offset = 10u64.pow(digits(universe.galaxy_size));
        let position_offset = 10u64.pow(digits(universe.solar_system_size));

        self.position as u64
            + self.system as u64 * position_offset
            + self.galaxy as u64 * position_offset * system_offset
    }

    /// Double Cantor pairing of position, system and galaxy, wrapping
    /// around `u64` for coordinates outside any universe.
    pub fn seed(&self) -> u64 {
        let (g, s, p) = (self.galaxy as u64, self.system as u64, self.position as u64);
        let k1 = cantor(p, s);
        cantor(k1, g)
    }

    /// Travel distance: galaxies dominate systems, systems dominate
    /// positions, and two bodies at the same position are 5 apart.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        if self.galaxy != other.galaxy {
            return 20000.0 * self.galaxy.abs_diff(other.galaxy) as f64;
        }
        if self.system != other.system {
            return 2700.0 + 95.0 * self.system.abs_diff(other.system) as f64;
        }
        if self.position != other.position {
            return 1000.0 + 5.0 * self.position.abs_diff(other.position) as f64;
        }
        5.0
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[G: {}, S: {}, P: {} {}]",
            self.galaxy, self.system, self.position, self.location
        )
    }
}

/// Parses `galaxy:system:position[:location]`.
impl FromStr for Coordinate {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GameError::from(ValidationError::InvalidCoordinate(s.to_string()));
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(invalid());
        }

        let number = |raw: &str| raw.trim().parse::<u32>().map_err(|_| invalid());
        let location = match parts.get(3) {
            Some(raw) => raw.parse()?,
            None => Location::Planet,
        };

        Ok(Self::new(number(parts[0])?, number(parts[1])?, number(parts[2])?, location))
    }
}

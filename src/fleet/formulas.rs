//! Travel formulas shared by fleet components.

use std::collections::{BTreeMap, HashMap};

use chrono::Duration;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::core::{ResourceAmount, Result, ValidationError};
use crate::model::Coordinate;

const REFERENCE: f64 = 35000.0;
/// Seconds added to every trip: take-off and landing.
const MANOEUVRE: f64 = 10.0;

/// A number of ships of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ShipInFleet {
    #[serde(rename = "ship")]
    pub id: Uuid,
    pub count: i64,
}

impl ShipInFleet {
    pub fn new(id: Uuid, count: i64) -> Self {
        Self { id, count }
    }
}

pub fn distance(from: &Coordinate, to: &Coordinate) -> f64 {
    from.distance_to(to)
}

/// Seconds needed to cover `distance` at `speed_ratio` of the slowest
/// ship's speed.
pub fn flight_time(distance: f64, speed_ratio: f64, slowest: f64) -> f64 {
    REFERENCE / (10.0 * speed_ratio) * (10.0 * distance / slowest).sqrt() + MANOEUVRE
}

/// Flight time as a duration, truncated to the millisecond.
pub fn flight_duration(seconds: f64) -> Duration {
    Duration::milliseconds((1000.0 * seconds) as i64)
}

/// Speed of the slowest ship once propulsion technologies are applied.
/// Every ship's propulsion must have been researched.
pub fn slowest_speed(catalog: &Catalog, ships: &[ShipInFleet], technologies: &HashMap<Uuid, i64>) -> Result<f64> {
    let mut slowest = f64::INFINITY;
    for ship in ships {
        let desc = catalog.ships().get(&ship.id)?;
        let level = technologies
            .get(&desc.propulsion.technology)
            .ok_or(ValidationError::InvalidPropulsion { ship: ship.id })?;
        slowest = slowest.min(desc.speed_at(*level));
    }
    Ok(slowest)
}

/// Fuel burnt by the ships over `distance` in `flight_time` seconds,
/// accumulated per resource.
pub fn consumption(catalog: &Catalog, ships: &[ShipInFleet], distance: f64, flight_time: f64) -> Result<Vec<ResourceAmount>> {
    let mut total: BTreeMap<Uuid, f64> = BTreeMap::new();
    for ship in ships {
        let desc = catalog.ships().get(&ship.id)?;
        let sk = REFERENCE * (10.0 * distance / desc.speed).sqrt() / (flight_time - MANOEUVRE);
        for fuel in &desc.consumption {
            let burnt = fuel.amount * ship.count as f64 * distance * (1.0 + sk / 10.0).powi(2) / REFERENCE;
            *total.entry(fuel.resource).or_default() += burnt;
        }
    }
    Ok(total
        .into_iter()
        .map(|(resource, amount)| ResourceAmount::new(resource, amount))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CostModel, FixedCost, Propulsion, ResourceDesc, ShipDesc, UpgradableDesc, UpgradableKind, ProgressCost};

    fn catalog() -> (Catalog, Uuid, Uuid, Uuid, Uuid) {
        let deuterium = Uuid::new_v4();
        let combustion = Uuid::new_v4();
        let small = Uuid::new_v4();
        let large = Uuid::new_v4();

        let ship = |id, name: &str, cargo, speed, fuel| {
            ShipDesc::new(
                UpgradableDesc::new(id, name, UpgradableKind::Ship, CostModel::Fixed(FixedCost::new(vec![]))),
                cargo,
                speed,
                Propulsion {
                    technology: combustion,
                    increase: 500.0,
                },
            )
            .with_fuel(deuterium, fuel)
        };

        let catalog = Catalog::builder()
            .resource(ResourceDesc {
                id: deuterium,
                name: "deuterium".into(),
                base_production: 0.0,
                base_storage: 10000.0,
                base_amount: 0.0,
            })
            .unwrap()
            .technology(UpgradableDesc::new(
                combustion,
                "combustion drive",
                UpgradableKind::Technology,
                CostModel::Progress(ProgressCost::new(vec![], 2.0)),
            ))
            .unwrap()
            .ship(ship(small, "small cargo ship", 5000.0, 5000.0, 10.0))
            .unwrap()
            .ship(ship(large, "large cargo ship", 25000.0, 7500.0, 50.0))
            .unwrap()
            .build()
            .unwrap();
        (catalog, deuterium, combustion, small, large)
    }

    #[test]
    fn test_flight_time() {
        // 35000 / 10 × sqrt(10 × 1000 / 10000) + 10
        assert!((flight_time(1000.0, 1.0, 10000.0) - 3510.0).abs() < 1e-9);
        assert!(flight_time(1000.0, 0.5, 10000.0) > flight_time(1000.0, 1.0, 10000.0));
    }

    #[test]
    fn test_flight_duration_truncates() {
        assert_eq!(flight_duration(3510.0009), Duration::milliseconds(3_510_000));
    }

    #[test]
    fn test_slowest_speed() {
        let (catalog, _, combustion, small, large) = catalog();
        let ships = [ShipInFleet::new(small, 2), ShipInFleet::new(large, 1)];
        let technologies = HashMap::from([(combustion, 2)]);

        // small: 5000 + 2 × 500, large: 7500 + 2 × 500
        assert_eq!(slowest_speed(&catalog, &ships, &technologies).unwrap(), 6000.0);

        let err = slowest_speed(&catalog, &ships, &HashMap::new()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidPropulsion { ship: small }.into());
    }

    #[test]
    fn test_consumption_accumulates_per_resource() {
        let (catalog, deuterium, _, small, large) = catalog();
        let ships = [ShipInFleet::new(small, 2), ShipInFleet::new(large, 1)];
        let d = 1000.0;
        let t = flight_time(d, 1.0, 5000.0);

        let burnt = consumption(&catalog, &ships, d, t).unwrap();
        assert_eq!(burnt.len(), 1);
        assert_eq!(burnt[0].resource, deuterium);

        let single = |fuel: f64, count: f64, speed: f64| {
            let sk = 35000.0 * (10.0 * d / speed).sqrt() / (t - 10.0);
            fuel * count * d * (1.0 + sk / 10.0).powi(2) / 35000.0
        };
        let expected = single(10.0, 2.0, 5000.0) + single(50.0, 1.0, 7500.0);
        assert!((burnt[0].amount - expected).abs() < 1e-9);
    }
}

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Physical attributes of a planet, derived only from its coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetShape {
    pub fields: i64,
    pub diameter: i64,
    pub min_temperature: i64,
    pub max_temperature: i64,
}

/// Bounds of the field count by position in the solar system.
fn fields_bounds(position: u32) -> (i64, i64) {
    match position {
        0 => (96, 172),
        1 => (104, 176),
        2 => (112, 182),
        3 => (118, 208),
        4 => (133, 232),
        5 => (152, 248),
        6 => (156, 262),
        7 => (150, 246),
        8 => (142, 232),
        9 => (136, 210),
        10 => (125, 186),
        11 => (114, 172),
        12 => (100, 168),
        13 => (96, 164),
        _ => (90, 164),
    }
}

/// Bounds of the maximum temperature by position: inner orbits are hot.
fn temperature_bounds(position: u32) -> (i64, i64) {
    match position {
        0 => (220, 260),
        1 => (170, 210),
        2 => (120, 160),
        3 => (70, 110),
        4 => (60, 100),
        5 => (50, 90),
        6 => (40, 80),
        7 => (30, 70),
        8 => (20, 60),
        9 => (10, 50),
        10 => (0, 40),
        11 => (-10, 30),
        12 => (-50, -10),
        13 => (-90, -50),
        _ => (-130, -90),
    }
}

/// Normal draw centered in `[min, max]` with a sixth of the range as
/// deviation, clamped to the bounds.
fn bounded_draw(rng: &mut ChaCha8Rng, (min, max): (i64, i64)) -> i64 {
    let deviation = ((max - min) / 6) as f64;
    let mean = ((max + min) / 2) as f64;
    let raw = mean + rng.sample::<f64, _>(StandardNormal) * deviation;
    raw.clamp(min as f64, max as f64).round() as i64
}

impl PlanetShape {
    /// Same coordinate, same shape: the generator is seeded with the
    /// coordinate's pairing seed.
    pub fn generate(coordinate: &Coordinate) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(coordinate.seed());

        let fields = bounded_draw(&mut rng, fields_bounds(coordinate.position));
        let diameter = 100 * fields + (100.0 * rng.r#gen::<f64>()).round() as i64;
        let max_temperature = bounded_draw(&mut rng, temperature_bounds(coordinate.position));

        Self {
            fields,
            diameter,
            min_temperature: max_temperature - 50,
            max_temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_within_bounds() {
        for position in 0..16 {
            let coordinate = Coordinate::planet(1, 42, position);
            let shape = PlanetShape::generate(&coordinate);

            let (fmin, fmax) = fields_bounds(position);
            assert!(shape.fields >= fmin && shape.fields <= fmax);
            assert!(shape.diameter >= 100 * shape.fields && shape.diameter <= 100 * shape.fields + 100);

            let (tmin, tmax) = temperature_bounds(position);
            assert!(shape.max_temperature >= tmin && shape.max_temperature <= tmax);
            assert_eq!(shape.min_temperature, shape.max_temperature - 50);
        }
    }

    #[test]
    fn test_shape_is_deterministic() {
        let coordinate = Coordinate::planet(4, 120, 8);
        assert_eq!(PlanetShape::generate(&coordinate), PlanetShape::generate(&coordinate));
    }
}

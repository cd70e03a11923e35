use claim_schema::GridKey;
use geo::{Coord, Point};
use serde::{Deserialize, Serialize};

/// Kilometres per degree of latitude in the flat approximation.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Latitude beyond which the `cos(lat)` longitude scale is held constant.
pub const MAX_SCALING_LATITUDE: f64 = 89.5;

/// A (longitude, latitude) pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    #[inline]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Moves `distance_km` along `bearing_deg` (0 = north, 90 = east) using the
    /// equirectangular approximation. Only valid for short hops.
    pub fn destination(self, distance_km: f64, bearing_deg: f64) -> Self {
        let bearing = bearing_deg.to_radians();
        let scaling_lat = self
            .lat
            .clamp(-MAX_SCALING_LATITUDE, MAX_SCALING_LATITUDE)
            .to_radians();

        let delta_lat = (distance_km / KM_PER_DEGREE) * bearing.cos();
        let delta_lon = (distance_km / (KM_PER_DEGREE * scaling_lat.cos())) * bearing.sin();

        Self {
            lon: self.lon + delta_lon,
            lat: (self.lat + delta_lat).clamp(-90.0, 90.0),
        }
    }

    /// Straight lon/lat interpolation, not great-circle.
    #[inline]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            lon: self.lon + (other.lon - self.lon) * t,
            lat: self.lat + (other.lat - self.lat) * t,
        }
    }

    /// Nearest integer-degree key. Halves round up, so `-0.5` maps to `0`.
    pub fn grid_key(self) -> GridKey {
        GridKey::new(round_half_up(self.lat), round_half_up(self.lon))
    }

    pub fn is_finite(self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// Planar distance in degrees.
    pub fn planar_distance(self, other: Self) -> f64 {
        (self.lon - other.lon).hypot(self.lat - other.lat)
    }
}

fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

impl From<Coordinate> for Coord<f64> {
    fn from(c: Coordinate) -> Self {
        Coord { x: c.lon, y: c.lat }
    }
}

impl From<Coord<f64>> for Coordinate {
    fn from(c: Coord<f64>) -> Self {
        Coordinate::new(c.x, c.y)
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(c: Coordinate) -> Self {
        Point::new(c.lon, c.lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn north_step_moves_latitude_only() {
        let moved = Coordinate::new(10.0, 0.0).destination(111.0, 0.0);
        assert!((moved.lat - 1.0).abs() < EPS);
        assert!((moved.lon - 10.0).abs() < EPS);
    }

    #[test]
    fn east_step_scales_with_latitude() {
        let at_equator = Coordinate::new(0.0, 0.0).destination(111.0, 90.0);
        let at_sixty = Coordinate::new(0.0, 60.0).destination(111.0, 90.0);
        assert!((at_equator.lon - 1.0).abs() < EPS);
        assert!((at_sixty.lon - 2.0).abs() < 1e-6);
        assert!((at_sixty.lat - 60.0).abs() < 1e-6);
    }

    #[test]
    fn pole_step_stays_finite() {
        let moved = Coordinate::new(0.0, 90.0).destination(10.0, 90.0);
        assert!(moved.is_finite());
        assert!(moved.lat <= 90.0);

        let over = Coordinate::new(0.0, 89.99).destination(50.0, 0.0);
        assert_eq!(over.lat, 90.0);
    }

    #[test]
    fn grid_key_rounds_half_up() {
        assert_eq!(Coordinate::new(2.5, -0.5).grid_key(), GridKey::new(0, 3));
        assert_eq!(Coordinate::new(-2.6, 1.49).grid_key(), GridKey::new(1, -3));
    }

    #[test]
    fn lerp_is_linear() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(2.0, -4.0);
        assert_eq!(a.lerp(b, 0.25), Coordinate::new(0.5, -1.0));
    }
}

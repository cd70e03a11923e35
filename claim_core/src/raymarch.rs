//! Single-bearing cost accumulation.
//!
//! A [`Ray`] walks outward from the origin in fixed distance steps, paying the
//! local speed value from its power budget for each step. It stops when the
//! budget runs out, when it reaches impassable terrain (the crossing is then
//! bisected by the [`CoastlineRefiner`]), or when the per-ray step ceiling is
//! hit.

use serde::{Deserialize, Serialize};

use crate::{
    coastline::CoastlineRefiner, config::ClaimConfig, coordinate::Coordinate,
    speed_field::SpeedField,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Termination {
    /// The ray stood on impassable terrain before moving.
    Stuck,
    /// Power ran out while still on passable terrain.
    Exhausted,
    /// A land/water crossing was found and refined.
    Coastline,
    /// The step ceiling was reached; handled like exhaustion.
    StepCeiling,
}

/// Terminal coordinate of one ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPoint {
    pub coordinate: Coordinate,
    pub bearing_deg: f64,
    pub termination: Termination,
    pub steps: u32,
}

/// Working state of one ray. Created per bearing and dropped once terminated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    bearing_deg: f64,
    power: f64,
    position: Coordinate,
    steps: u32,
}

impl Ray {
    pub fn new(origin: Coordinate, bearing_deg: f64, power: f64) -> Self {
        Self {
            bearing_deg,
            power: power.max(0.0),
            position: origin,
            steps: 0,
        }
    }

    pub fn bearing_deg(&self) -> f64 {
        self.bearing_deg
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn position(&self) -> Coordinate {
        self.position
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    fn terminate(&self, coordinate: Coordinate, termination: Termination) -> BoundaryPoint {
        BoundaryPoint {
            coordinate,
            bearing_deg: self.bearing_deg,
            termination,
            steps: self.steps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayMarcher {
    initial_power: f64,
    distance_step_km: f64,
    max_steps: u32,
    refiner: CoastlineRefiner,
}

impl RayMarcher {
    pub const DEFAULT_MAX_STEPS: u32 = 100_000;

    pub fn new(initial_power: f64, distance_step_km: f64) -> Self {
        Self {
            initial_power,
            distance_step_km,
            max_steps: Self::DEFAULT_MAX_STEPS,
            refiner: CoastlineRefiner::default(),
        }
    }

    pub fn from_config(config: &ClaimConfig) -> Self {
        Self::new(config.initial_power, config.distance_step_km)
            .with_max_steps(config.max_steps_per_ray)
            .with_refiner(CoastlineRefiner::new(config.coastline_iterations))
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_refiner(mut self, refiner: CoastlineRefiner) -> Self {
        self.refiner = refiner;
        self
    }

    pub fn launch(&self, origin: Coordinate, bearing_deg: f64) -> Ray {
        Ray::new(origin, bearing_deg, self.initial_power)
    }

    /// Runs one iteration of the march. Returns the boundary once the ray has
    /// terminated; `None` means the ray moved one full step and is still live.
    pub fn advance<F>(&self, ray: &mut Ray, field: &F) -> Option<BoundaryPoint>
    where
        F: SpeedField + ?Sized,
    {
        let speed = field.speed_at(ray.position);
        if speed <= 0.0 {
            return Some(ray.terminate(ray.position, Termination::Stuck));
        }
        if ray.steps >= self.max_steps {
            ray.power = 0.0;
            return Some(ray.terminate(ray.position, Termination::StepCeiling));
        }
        ray.steps += 1;

        if ray.power > speed {
            ray.power -= speed;
            let next = ray.position.destination(self.distance_step_km, ray.bearing_deg);
            if !field.is_passable(next) {
                let shore = self.refiner.refine(field, ray.position, next);
                return Some(ray.terminate(shore, Termination::Coastline));
            }
            ray.position = next;
            None
        } else {
            let fraction = ray.power / speed;
            let next = ray
                .position
                .destination(self.distance_step_km * fraction, ray.bearing_deg);
            ray.power = 0.0;
            if !field.is_passable(next) {
                let shore = self.refiner.refine(field, ray.position, next);
                return Some(ray.terminate(shore, Termination::Coastline));
            }
            ray.position = next;
            Some(ray.terminate(next, Termination::Exhausted))
        }
    }

    /// Marches a fresh ray along `bearing_deg` until it terminates.
    pub fn march<F>(&self, field: &F, origin: Coordinate, bearing_deg: f64) -> BoundaryPoint
    where
        F: SpeedField + ?Sized,
    {
        let mut ray = self.launch(origin, bearing_deg);
        loop {
            if let Some(boundary) = self.advance(&mut ray, field) {
                return boundary;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::KM_PER_DEGREE;

    fn uniform(speed: f64) -> impl Fn(Coordinate) -> f64 {
        move |_| speed
    }

    #[test]
    fn uniform_field_reaches_power_over_speed_steps() {
        let marcher = RayMarcher::new(10.0, 1.0);
        let boundary = marcher.march(&uniform(1.0), Coordinate::new(0.0, 0.0), 0.0);

        assert_eq!(boundary.termination, Termination::Exhausted);
        let expected_lat = 10.0 / KM_PER_DEGREE;
        assert!((boundary.coordinate.lat - expected_lat).abs() < 1e-9);
        assert!(boundary.steps as f64 <= (10.0_f64 / 1.0).ceil());
    }

    #[test]
    fn fractional_last_step_is_proportional() {
        let marcher = RayMarcher::new(2.5, 1.0);
        let boundary = marcher.march(&uniform(1.0), Coordinate::new(0.0, 0.0), 90.0);
        assert!((boundary.coordinate.lon - 2.5 / KM_PER_DEGREE).abs() < 1e-9);
        assert_eq!(boundary.steps, 3);
    }

    #[test]
    fn origin_in_water_is_stuck() {
        let marcher = RayMarcher::new(100.0, 1.0);
        let origin = Coordinate::new(3.0, 4.0);
        let boundary = marcher.march(&uniform(0.0), origin, 45.0);
        assert_eq!(boundary.termination, Termination::Stuck);
        assert_eq!(boundary.coordinate, origin);
        assert_eq!(boundary.steps, 0);
    }

    #[test]
    fn power_never_increases_or_goes_negative() {
        let field = |c: Coordinate| 0.3 + (c.lat * 50.0).sin().abs();
        let marcher = RayMarcher::new(40.0, 0.5);
        let mut ray = marcher.launch(Coordinate::new(0.0, 0.0), 10.0);
        let mut last = ray.power();
        loop {
            let done = marcher.advance(&mut ray, &field);
            assert!(ray.power() <= last);
            assert!(ray.power() >= 0.0);
            last = ray.power();
            if done.is_some() {
                break;
            }
        }
        assert_eq!(ray.power(), 0.0);
    }

    #[test]
    fn coastline_is_refined_on_the_land_side() {
        let shore_lat = 5.3 / KM_PER_DEGREE;
        let field = move |c: Coordinate| if c.lat < shore_lat { 1.0 } else { 0.0 };
        let marcher = RayMarcher::new(100.0, 1.0);
        let boundary = marcher.march(&field, Coordinate::new(0.0, 0.0), 0.0);

        assert_eq!(boundary.termination, Termination::Coastline);
        assert!(boundary.coordinate.lat < shore_lat);
        let tolerance = (1.0 / KM_PER_DEGREE) / 64.0;
        assert!(shore_lat - boundary.coordinate.lat <= tolerance + 1e-12);
    }

    #[test]
    fn step_ceiling_counts_as_exhaustion() {
        let marcher = RayMarcher::new(1_000.0, 1.0).with_max_steps(5);
        let boundary = marcher.march(&uniform(1.0), Coordinate::new(0.0, 0.0), 0.0);
        assert_eq!(boundary.termination, Termination::StepCeiling);
        assert_eq!(boundary.steps, 5);
        assert!((boundary.coordinate.lat - 5.0 / KM_PER_DEGREE).abs() < 1e-9);
    }
}

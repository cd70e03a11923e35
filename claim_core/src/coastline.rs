use crate::{coordinate::Coordinate, speed_field::SpeedField};

pub const DEFAULT_COASTLINE_ITERATIONS: u32 = 6;

/// Bisects a land/water transition between two points on a ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoastlineRefiner {
    iterations: u32,
}

impl Default for CoastlineRefiner {
    fn default() -> Self {
        Self::new(DEFAULT_COASTLINE_ITERATIONS)
    }
}

impl CoastlineRefiner {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// `low` must be passable and `high` impassable. The result is always the
    /// last midpoint confirmed passable, never a point past the transition.
    pub fn refine<F>(&self, field: &F, low: Coordinate, high: Coordinate) -> Coordinate
    where
        F: SpeedField + ?Sized,
    {
        let (mut low, mut high) = (low, high);
        for _ in 0..self.iterations {
            let mid = low.lerp(high, 0.5);
            if field.is_passable(mid) {
                low = mid;
            } else {
                high = mid;
            }
        }
        low
    }
}

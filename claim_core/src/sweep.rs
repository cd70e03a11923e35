//! Full-circle sweep of rays around an origin.
//!
//! [`TerritorySweep`] is a resumable iterator: every step runs exactly one ray
//! to completion, so no partial ray state ever survives a yield. A host loop
//! drives it with [`TerritorySweep::run_for`] and can stop it through a
//! [`CancelToken`].

use geo::{LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::ClaimConfig,
    coordinate::Coordinate,
    progress::{CancelToken, ProgressObserver, SweepProgress},
    raymarch::{BoundaryPoint, RayMarcher, Termination},
    speed_field::SpeedField,
};

/// Closed ring of boundary points, first vertex repeated last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPolygon {
    ring: Vec<Coordinate>,
}

impl RawPolygon {
    /// Closes the boundary points in bearing order. Empty input yields an
    /// empty ring.
    pub fn from_boundary(points: &[BoundaryPoint]) -> Self {
        let mut ring: Vec<Coordinate> = points.iter().map(|p| p.coordinate).collect();
        if let Some(first) = ring.first().copied() {
            ring.push(first);
        }
        Self { ring }
    }

    pub fn ring(&self) -> &[Coordinate] {
        &self.ring
    }

    /// Vertices excluding the closing duplicate.
    pub fn vertex_count(&self) -> usize {
        self.ring.len().saturating_sub(1)
    }

    pub fn is_closed(&self) -> bool {
        matches!((self.ring.first(), self.ring.last()), (Some(a), Some(b)) if a == b)
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        let exterior: LineString<f64> = self.ring.iter().map(|c| geo::Coord::from(*c)).collect();
        Polygon::new(exterior, Vec::new())
    }

    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![self.to_polygon()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStatus {
    Pending,
    Complete,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweepError {
    #[error("sweep finished {completed} of {total} rays")]
    Incomplete { completed: usize, total: usize },
    #[error("sweep was cancelled")]
    Cancelled,
}

pub struct TerritorySweep<'f, F: ?Sized> {
    field: &'f F,
    marcher: RayMarcher,
    origin: Coordinate,
    angle_step_deg: f64,
    total: usize,
    boundary: Vec<BoundaryPoint>,
    cancel: CancelToken,
    cancelled: bool,
}

impl<'f, F> TerritorySweep<'f, F>
where
    F: SpeedField + ?Sized,
{
    /// `angle_step_deg` must be positive; callers validate it through
    /// [`ClaimConfig::validate`].
    pub fn new(field: &'f F, origin: Coordinate, marcher: RayMarcher, angle_step_deg: f64) -> Self {
        let total = (360.0 / angle_step_deg).ceil() as usize;
        Self {
            field,
            marcher,
            origin,
            angle_step_deg,
            total,
            boundary: Vec::with_capacity(total),
            cancel: CancelToken::default(),
            cancelled: false,
        }
    }

    pub fn from_config(field: &'f F, origin: Coordinate, config: &ClaimConfig) -> Self {
        Self::new(
            field,
            origin,
            RayMarcher::from_config(config),
            config.angle_step_deg,
        )
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.boundary.len()
    }

    pub fn is_complete(&self) -> bool {
        self.boundary.len() >= self.total
    }

    pub fn boundary_points(&self) -> &[BoundaryPoint] {
        &self.boundary
    }

    fn next_bearing(&self) -> f64 {
        self.boundary.len() as f64 * self.angle_step_deg
    }

    fn run_next_ray(&mut self) -> Option<SweepProgress> {
        if self.is_complete() {
            return None;
        }
        let bearing_deg = self.next_bearing();
        let boundary = self.marcher.march(self.field, self.origin, bearing_deg);
        tracing::trace!(
            target: "territory_claim::sweep",
            bearing = bearing_deg,
            steps = boundary.steps,
            termination = ?boundary.termination,
            "ray.complete"
        );
        self.boundary.push(boundary);
        Some(SweepProgress {
            bearing_deg,
            completed: self.boundary.len(),
            total: self.total,
        })
    }

    /// Advances at most `budget` rays, then yields back to the caller.
    pub fn run_for<O>(&mut self, budget: usize, observer: &mut O) -> SweepStatus
    where
        O: ProgressObserver + ?Sized,
    {
        for _ in 0..budget {
            if self.cancel.is_cancelled() {
                self.cancelled = true;
                tracing::debug!(
                    target: "territory_claim::sweep",
                    completed = self.completed(),
                    total = self.total,
                    "sweep.cancelled"
                );
                return SweepStatus::Cancelled;
            }
            match self.run_next_ray() {
                Some(progress) => observer.on_progress(progress),
                None => break,
            }
        }

        if self.is_complete() {
            SweepStatus::Complete
        } else {
            SweepStatus::Pending
        }
    }

    /// Closes the collected boundary into a ring.
    pub fn finish(self) -> Result<RawPolygon, SweepError> {
        if self.cancelled {
            return Err(SweepError::Cancelled);
        }
        if !self.is_complete() {
            return Err(SweepError::Incomplete {
                completed: self.completed(),
                total: self.total,
            });
        }

        let coastline = self
            .boundary
            .iter()
            .filter(|b| b.termination == Termination::Coastline)
            .count();
        let stuck = self
            .boundary
            .iter()
            .filter(|b| b.termination == Termination::Stuck)
            .count();
        tracing::debug!(
            target: "territory_claim::sweep",
            rays = self.total,
            coastline,
            stuck,
            origin_lon = self.origin.lon,
            origin_lat = self.origin.lat,
            "sweep.complete"
        );
        Ok(RawPolygon::from_boundary(&self.boundary))
    }
}

impl<'f, F> Iterator for TerritorySweep<'f, F>
where
    F: SpeedField + ?Sized,
{
    type Item = SweepProgress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cancel.is_cancelled() {
            self.cancelled = true;
            return None;
        }
        self.run_next_ray()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{FnObserver, NoopObserver};

    fn land(_: Coordinate) -> f64 {
        1.0
    }

    fn sweep_for<F: SpeedField>(field: &F, step: f64) -> TerritorySweep<'_, F> {
        TerritorySweep::new(field, Coordinate::new(0.0, 0.0), RayMarcher::new(5.0, 1.0), step)
    }

    #[test]
    fn iterator_yields_one_progress_per_bearing() {
        let sweep = sweep_for(&land, 90.0);
        let bearings: Vec<f64> = sweep.map(|p| p.bearing_deg).collect();
        assert_eq!(bearings, vec![0.0, 90.0, 180.0, 270.0]);
    }

    #[test]
    fn run_for_respects_budget() {
        let mut sweep = sweep_for(&land, 30.0);
        let mut seen = Vec::new();
        let status = sweep.run_for(5, &mut FnObserver(|p: SweepProgress| seen.push(p.completed)));
        assert_eq!(status, SweepStatus::Pending);
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);

        assert_eq!(sweep.run_for(100, &mut NoopObserver), SweepStatus::Complete);
        assert_eq!(sweep.completed(), 12);
    }

    #[test]
    fn finish_closes_ring() {
        let mut sweep = sweep_for(&land, 45.0);
        sweep.run_for(usize::MAX, &mut NoopObserver);
        let ring = sweep.finish().unwrap();
        assert!(ring.is_closed());
        assert_eq!(ring.vertex_count(), 8);
        assert_eq!(ring.ring().len(), 9);
    }

    #[test]
    fn finish_before_completion_is_an_error() {
        let mut sweep = sweep_for(&land, 10.0);
        sweep.run_for(3, &mut NoopObserver);
        assert_eq!(
            sweep.finish(),
            Err(SweepError::Incomplete {
                completed: 3,
                total: 36
            })
        );
    }

    #[test]
    fn cancellation_stops_at_next_yield_point() {
        let token = CancelToken::new();
        let mut sweep = sweep_for(&land, 1.0).with_cancel_token(token.clone());
        assert_eq!(sweep.run_for(10, &mut NoopObserver), SweepStatus::Pending);
        token.cancel();
        assert_eq!(sweep.run_for(10, &mut NoopObserver), SweepStatus::Cancelled);
        assert_eq!(sweep.completed(), 10);
        assert_eq!(sweep.finish(), Err(SweepError::Cancelled));
    }
}

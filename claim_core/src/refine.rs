//! Boundary refinement against authoritative land geometry.
//!
//! The raw ray-marched ring is clipped to the land union and then snapped onto
//! nearby coast and river edges. Every boolean step has a fallback to the best
//! shape produced so far, so a degenerate input can shrink the result but
//! never abort the claim.

use geo::MultiPolygon;

use crate::{
    config::ClaimConfig,
    geometry::{self, buffer_all, union_all, AuthoritativeGeometry, GeometryError},
};

const TARGET: &str = "territory_claim::refine";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerritoryRefiner {
    snap_deg: f64,
    river_buffer_deg: f64,
}

impl TerritoryRefiner {
    pub fn new(snap_deg: f64, river_buffer_deg: f64) -> Self {
        Self {
            snap_deg,
            river_buffer_deg,
        }
    }

    pub fn from_config(config: &ClaimConfig) -> Self {
        Self::new(config.refiner_snap_deg, config.river_buffer_deg)
    }

    /// Union of land, lakes, glaciers and buffered rivers. `None` when no
    /// usable land data was supplied at all.
    pub fn land_union(&self, geometry: &AuthoritativeGeometry) -> Option<MultiPolygon<f64>> {
        let mut land = union_all(&geometry.land);

        if let Some(lakes) = geometry.lakes.as_deref().and_then(union_all) {
            land = merge(land, lakes, "lakes");
        }
        if let Some(glaciers) = union_all(&geometry.glaciers) {
            land = merge(land, glaciers, "glaciers");
        }
        if self.river_buffer_deg > 0.0 {
            let corridors = geometry
                .rivers
                .as_deref()
                .and_then(|rivers| buffer_all(rivers, self.river_buffer_deg));
            if let Some(corridors) = corridors {
                land = merge(land, corridors, "rivers");
            }
        }

        land.filter(|shape| !geometry::is_empty(shape))
    }

    /// Clips and snaps `raw`. Returns `raw` untouched without land data and
    /// `None` when the claim has no land component.
    pub fn refine(
        &self,
        raw: &MultiPolygon<f64>,
        geometry: &AuthoritativeGeometry,
    ) -> Option<MultiPolygon<f64>> {
        match self.land_union(geometry) {
            Some(land) => self.refine_against(raw, &land),
            None => {
                tracing::debug!(target: TARGET, "refine.skipped=no_land_data");
                Some(raw.clone())
            }
        }
    }

    /// Same as [`refine`](Self::refine) with a precomputed land union.
    pub fn refine_against(
        &self,
        raw: &MultiPolygon<f64>,
        land: &MultiPolygon<f64>,
    ) -> Option<MultiPolygon<f64>> {
        let on_land = match geometry::intersection(raw, land) {
            Ok(clipped) => clipped,
            Err(err) => {
                log_fallback("clip", &err, "raw");
                return Some(raw.clone());
            }
        };
        if geometry::is_empty(&on_land) {
            tracing::debug!(target: TARGET, "refine.result=no_territory");
            return None;
        }

        if self.snap_deg <= 0.0 {
            return Some(on_land);
        }
        Some(self.snap(on_land, land))
    }

    fn snap(&self, on_land: MultiPolygon<f64>, land: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let snapped = geometry::buffer(&on_land, self.snap_deg)
            .map_err(|err| ("buffer", err))
            .and_then(|grown| geometry::union(&grown, land).map_err(|err| ("union", err)))
            .and_then(|merged| {
                geometry::intersection(&merged, land).map_err(|err| ("reclip", err))
            });

        match snapped {
            Ok(shape) if !geometry::is_empty(&shape) => shape,
            Ok(_) => {
                tracing::warn!(target: TARGET, fallback = "on_land", "refine.snap_empty");
                on_land
            }
            Err((stage, err)) => {
                log_fallback(stage, &err, "on_land");
                on_land
            }
        }
    }
}

fn merge(
    acc: Option<MultiPolygon<f64>>,
    layer: MultiPolygon<f64>,
    name: &'static str,
) -> Option<MultiPolygon<f64>> {
    match acc {
        None => Some(layer),
        Some(acc) => match geometry::union(&acc, &layer) {
            Ok(merged) => Some(merged),
            Err(err) => {
                log_fallback(name, &err, "previous_union");
                Some(acc)
            }
        },
    }
}

fn log_fallback(stage: &str, err: &GeometryError, fallback: &str) {
    tracing::warn!(
        target: TARGET,
        stage,
        fallback,
        error = %err,
        "refine.fallback"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryInput;
    use geo::{polygon, Area, BoundingRect, LineString};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> geo::Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
    }

    fn island() -> AuthoritativeGeometry {
        AuthoritativeGeometry::new(GeometryInput::Single(rect(0.0, 0.0, 10.0, 10.0)))
    }

    #[test]
    fn clip_removes_water() {
        let raw: MultiPolygon<f64> = rect(5.0, 2.0, 12.0, 8.0).into();
        let refined = TerritoryRefiner::new(0.0, 0.0)
            .refine(&raw, &island())
            .expect("overlap with land");
        let bounds = refined.bounding_rect().unwrap();
        assert!((bounds.max().x - 10.0).abs() < 1e-9);
        assert!((refined.unsigned_area() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn claim_entirely_at_sea_is_none() {
        let raw: MultiPolygon<f64> = rect(20.0, 20.0, 22.0, 22.0).into();
        assert!(TerritoryRefiner::new(0.1, 0.0).refine(&raw, &island()).is_none());
    }

    #[test]
    fn missing_land_returns_raw() {
        let raw: MultiPolygon<f64> = rect(20.0, 20.0, 22.0, 22.0).into();
        let refined = TerritoryRefiner::new(0.1, 0.1).refine(&raw, &AuthoritativeGeometry::default());
        assert_eq!(refined, Some(raw));
    }

    #[test]
    fn snap_pulls_boundary_onto_nearby_coast() {
        // Territory stops 0.05 short of the eastern coast.
        let raw: MultiPolygon<f64> = rect(5.0, 4.0, 9.95, 6.0).into();
        let refined = TerritoryRefiner::new(0.1, 0.0)
            .refine(&raw, &island())
            .unwrap();
        let bounds = refined.bounding_rect().unwrap();
        assert!((bounds.max().x - 10.0).abs() < 1e-9);
        assert!(bounds.min().x < 5.0);
    }

    #[test]
    fn lakes_and_rivers_extend_land() {
        let geometry = island()
            .with_lakes(GeometryInput::Single(rect(10.0, 0.0, 12.0, 2.0)))
            .with_rivers(GeometryInput::Single(LineString::from(vec![
                (10.0, 5.0),
                (14.0, 5.0),
            ])));
        let land = TerritoryRefiner::new(0.0, 0.25).land_union(&geometry).unwrap();
        let bounds = land.bounding_rect().unwrap();
        assert!(bounds.max().x > 13.9);
        assert!(land.unsigned_area() > 100.0 + 4.0);
    }

    #[test]
    fn degenerate_land_member_keeps_partial_union() {
        let broken = polygon![
            (x: 20.0, y: 0.0),
            (x: f64::NAN, y: 0.0),
            (x: 21.0, y: 1.0),
        ];
        let mut trailing = island();
        trailing.land.push(broken.clone());
        let mut leading = island();
        leading.land.insert(0, broken);

        for geometry in [trailing, leading] {
            let land = TerritoryRefiner::new(0.0, 0.0).land_union(&geometry).unwrap();
            assert!((land.unsigned_area() - 100.0).abs() < 1e-9);

            // The claim is still clipped rather than passed through raw.
            let raw: MultiPolygon<f64> = rect(5.0, 2.0, 12.0, 8.0).into();
            let refined = TerritoryRefiner::new(0.0, 0.0).refine(&raw, &geometry).unwrap();
            assert!((refined.unsigned_area() - 30.0).abs() < 1e-9);
        }
    }

    #[test]
    fn snapped_inland_claim_is_stable() {
        // 3 degrees from every coast.
        let raw: MultiPolygon<f64> = rect(3.0, 3.0, 5.0, 5.0).into();
        let refiner = TerritoryRefiner::new(0.5, 0.0);
        let once = refiner.refine(&raw, &island()).unwrap();
        let twice = refiner.refine(&once, &island()).unwrap();
        let thrice = refiner.refine(&twice, &island()).unwrap();
        assert!((twice.unsigned_area() - once.unsigned_area()).abs() < 1e-6);
        assert!((thrice.unsigned_area() - once.unsigned_area()).abs() < 1e-6);
        assert!(once.unsigned_area() <= 100.0 + 1e-6);
    }

    #[test]
    fn refining_saturated_territory_is_stable() {
        let raw: MultiPolygon<f64> = rect(-1.0, -1.0, 11.0, 11.0).into();
        let refiner = TerritoryRefiner::new(0.2, 0.0);
        let once = refiner.refine(&raw, &island()).unwrap();
        let twice = refiner.refine(&once, &island()).unwrap();
        assert!((once.unsigned_area() - 100.0).abs() < 1e-6);
        assert!((twice.unsigned_area() - once.unsigned_area()).abs() < 1e-6);
    }
}

//! Boolean geometry kernel and authoritative geometry inputs.
//!
//! Every boolean operation returns a [`GeometryResult`] instead of panicking or
//! yielding a silent empty shape, so callers can pick their own fallback.
//! Polygons with zero area or fewer than four ring positions carry no area and
//! are dropped before reaching the kernel; non-finite coordinates are rejected.

use std::{
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
};

use claim_schema::{GeoJson, SchemaError};
use geo::{
    Area, BooleanOps, BoundingRect, Buffer, Contains, LineString, MultiPolygon, Point, Polygon,
    Rect,
};
use thiserror::Error;

use crate::coordinate::Coordinate;

/// One geometry or an ordered collection of them, normalised on entry.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryInput<G> {
    Single(G),
    Collection(Vec<G>),
}

impl<G> GeometryInput<G> {
    pub fn into_vec(self) -> Vec<G> {
        match self {
            GeometryInput::Single(geometry) => vec![geometry],
            GeometryInput::Collection(geometries) => geometries,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            GeometryInput::Single(_) => 1,
            GeometryInput::Collection(geometries) => geometries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<G> From<Vec<G>> for GeometryInput<G> {
    fn from(geometries: Vec<G>) -> Self {
        GeometryInput::Collection(geometries)
    }
}

impl GeometryInput<Polygon<f64>> {
    /// A lone feature holding one polygon becomes `Single`; anything else is a
    /// `Collection` of every polygon in the document.
    pub fn polygons_from_geojson(doc: &GeoJson) -> Result<Self, SchemaError> {
        let mut polygons = doc.polygons()?;
        Ok(match doc {
            GeoJson::Feature(_) if polygons.len() == 1 => {
                GeometryInput::Single(polygons.remove(0))
            }
            _ => GeometryInput::Collection(polygons),
        })
    }
}

impl GeometryInput<LineString<f64>> {
    pub fn lines_from_geojson(doc: &GeoJson) -> Result<Self, SchemaError> {
        let mut lines = doc.lines()?;
        Ok(match doc {
            GeoJson::Feature(_) if lines.len() == 1 => GeometryInput::Single(lines.remove(0)),
            _ => GeometryInput::Collection(lines),
        })
    }
}

/// Read-only land, lake, river and glacier layers.
#[derive(Debug, Clone, Default)]
pub struct AuthoritativeGeometry {
    pub land: Vec<Polygon<f64>>,
    pub lakes: Option<Vec<Polygon<f64>>>,
    pub rivers: Option<Vec<LineString<f64>>>,
    pub glaciers: Vec<Polygon<f64>>,
}

impl AuthoritativeGeometry {
    pub fn new(land: GeometryInput<Polygon<f64>>) -> Self {
        Self {
            land: land.into_vec(),
            ..Default::default()
        }
    }

    pub fn with_lakes(mut self, lakes: GeometryInput<Polygon<f64>>) -> Self {
        self.lakes = Some(lakes.into_vec());
        self
    }

    pub fn with_rivers(mut self, rivers: GeometryInput<LineString<f64>>) -> Self {
        self.rivers = Some(rivers.into_vec());
        self
    }

    pub fn with_glaciers(mut self, glaciers: GeometryInput<Polygon<f64>>) -> Self {
        self.glaciers = glaciers.into_vec();
        self
    }

    pub fn has_land(&self) -> bool {
        !self.land.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Intersection,
    Difference,
    Buffer,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BooleanOp::Union => "union",
            BooleanOp::Intersection => "intersection",
            BooleanOp::Difference => "difference",
            BooleanOp::Buffer => "buffer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{op} received degenerate input: {reason}")]
    Degenerate { op: BooleanOp, reason: &'static str },
    #[error("{op} failed inside the geometry kernel")]
    Kernel { op: BooleanOp },
}

pub type GeometryResult = Result<MultiPolygon<f64>, GeometryError>;

pub fn union(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> GeometryResult {
    let (a, b) = (sanitize(BooleanOp::Union, a)?, sanitize(BooleanOp::Union, b)?);
    if a.0.is_empty() {
        return Ok(b);
    }
    if b.0.is_empty() {
        return Ok(a);
    }
    guarded(BooleanOp::Union, || a.union(&b))
}

pub fn intersection(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> GeometryResult {
    let op = BooleanOp::Intersection;
    let (a, b) = (sanitize(op, a)?, sanitize(op, b)?);
    if a.0.is_empty() || b.0.is_empty() {
        return Ok(MultiPolygon::new(Vec::new()));
    }
    guarded(op, || a.intersection(&b))
}

pub fn difference(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> GeometryResult {
    let op = BooleanOp::Difference;
    let (a, b) = (sanitize(op, a)?, sanitize(op, b)?);
    if a.0.is_empty() || b.0.is_empty() {
        return Ok(a);
    }
    guarded(op, || a.difference(&b))
}

/// Outward buffer of an areal shape. `distance` is in degrees.
pub fn buffer(shape: &MultiPolygon<f64>, distance: f64) -> GeometryResult {
    let op = BooleanOp::Buffer;
    if !distance.is_finite() || distance < 0.0 {
        return Err(GeometryError::Degenerate {
            op,
            reason: "buffer distance must be finite and non-negative",
        });
    }
    let shape = sanitize(op, shape)?;
    if shape.0.is_empty() || distance == 0.0 {
        return Ok(shape);
    }
    guarded(op, || shape.buffer(distance))
}

/// Turns a line into a corridor `distance` degrees wide on each side.
pub fn buffer_line(line: &LineString<f64>, distance: f64) -> GeometryResult {
    let op = BooleanOp::Buffer;
    if !distance.is_finite() || distance <= 0.0 {
        return Err(GeometryError::Degenerate {
            op,
            reason: "line buffer distance must be finite and positive",
        });
    }
    if line.0.len() < 2 {
        return Err(GeometryError::Degenerate {
            op,
            reason: "line needs at least two positions",
        });
    }
    if !line.0.iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        return Err(GeometryError::Degenerate {
            op,
            reason: "non-finite coordinate",
        });
    }
    guarded(op, || line.buffer(distance))
}

/// Folds `polygons` into one shape. Members that are non-finite or have no
/// area are skipped wherever they sit in the list. The fold stops at the first
/// failing union and keeps the partial result. `None` when nothing usable was
/// supplied.
pub fn union_all(polygons: &[Polygon<f64>]) -> Option<MultiPolygon<f64>> {
    let mut members = polygons.iter().enumerate().filter_map(|(index, polygon)| {
        match sanitize(BooleanOp::Union, &MultiPolygon::new(vec![polygon.clone()])) {
            Ok(member) if !member.0.is_empty() => Some(member),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(
                    target: "territory_claim::geometry",
                    index,
                    error = %err,
                    "union_all.skipped"
                );
                None
            }
        }
    });

    let mut result = members.next()?;
    for member in members {
        match union(&result, &member) {
            Ok(merged) => result = merged,
            Err(err) => {
                tracing::warn!(
                    target: "territory_claim::geometry",
                    error = %err,
                    "union_all.stopped=partial"
                );
                break;
            }
        }
    }
    Some(result).filter(|shape| !shape.0.is_empty())
}

/// Buffers every line and unions the corridors. Lines that fail to buffer are
/// skipped. `None` when no corridor survived.
pub fn buffer_all(lines: &[LineString<f64>], distance: f64) -> Option<MultiPolygon<f64>> {
    if distance <= 0.0 {
        return None;
    }
    let mut out: Option<MultiPolygon<f64>> = None;
    for (index, line) in lines.iter().enumerate() {
        let corridor = match buffer_line(line, distance) {
            Ok(corridor) => corridor,
            Err(err) => {
                tracing::warn!(
                    target: "territory_claim::geometry",
                    index,
                    error = %err,
                    "buffer_all.skipped=line"
                );
                continue;
            }
        };
        out = Some(match out {
            None => corridor,
            Some(acc) => match union(&acc, &corridor) {
                Ok(merged) => merged,
                Err(err) => {
                    tracing::warn!(
                        target: "territory_claim::geometry",
                        index,
                        error = %err,
                        "buffer_all.union_failed"
                    );
                    acc
                }
            },
        });
    }
    out.filter(|shape| !is_empty(shape))
}

pub fn is_empty(shape: &MultiPolygon<f64>) -> bool {
    shape.0.is_empty() || shape.unsigned_area() <= 0.0
}

fn sanitize(op: BooleanOp, shape: &MultiPolygon<f64>) -> GeometryResult {
    let mut kept = Vec::with_capacity(shape.0.len());
    for polygon in &shape.0 {
        let finite = std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .flat_map(|ring| ring.0.iter())
            .all(|c| c.x.is_finite() && c.y.is_finite());
        if !finite {
            return Err(GeometryError::Degenerate {
                op,
                reason: "non-finite coordinate",
            });
        }
        if polygon.exterior().0.len() >= 4 && polygon.unsigned_area() > 0.0 {
            kept.push(polygon.clone());
        }
    }
    Ok(MultiPolygon::new(kept))
}

fn guarded<F>(op: BooleanOp, kernel: F) -> GeometryResult
where
    F: FnOnce() -> MultiPolygon<f64>,
{
    catch_unwind(AssertUnwindSafe(kernel)).map_err(|_| GeometryError::Kernel { op })
}

/// Polygons paired with their bounding boxes for repeated point queries.
#[derive(Debug, Clone, Default)]
pub struct PreparedLayer {
    entries: Vec<(Rect<f64>, Polygon<f64>)>,
}

impl PreparedLayer {
    pub fn new(polygons: impl IntoIterator<Item = Polygon<f64>>) -> Self {
        let entries = polygons
            .into_iter()
            .filter_map(|polygon| polygon.bounding_rect().map(|rect| (rect, polygon)))
            .collect();
        Self { entries }
    }

    pub fn from_shape(shape: MultiPolygon<f64>) -> Self {
        Self::new(shape.0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        let point = Point::from(coordinate);
        let (x, y) = (coordinate.lon, coordinate.lat);
        self.entries.iter().any(|(rect, polygon)| {
            x >= rect.min().x
                && x <= rect.max().x
                && y >= rect.min().y
                && y <= rect.max().y
                && polygon.contains(&point)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon};

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)].into()
    }

    #[test]
    fn intersection_clips_to_overlap() {
        let clipped = intersection(&square(0.0, 0.0, 4.0, 4.0), &square(2.0, 2.0, 6.0, 6.0))
            .expect("valid squares should intersect");
        assert!((clipped.unsigned_area() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_input_is_degenerate() {
        let bad = square(0.0, 0.0, f64::NAN, 1.0);
        let err = union(&bad, &square(0.0, 0.0, 1.0, 1.0)).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::Degenerate {
                op: BooleanOp::Union,
                ..
            }
        ));
    }

    #[test]
    fn zero_area_polygons_are_dropped() {
        let sliver: MultiPolygon<f64> =
            polygon![(x: 0.0, y: 0.0), (x: 0.0, y: 0.0), (x: 0.0, y: 0.0)].into();
        let clipped = intersection(&sliver, &square(-1.0, -1.0, 1.0, 1.0)).unwrap();
        assert!(clipped.0.is_empty());
    }

    #[test]
    fn union_all_merges_overlaps() {
        let parts: Vec<Polygon<f64>> = vec![
            square(0.0, 0.0, 2.0, 2.0).0.remove(0),
            square(1.0, 0.0, 3.0, 2.0).0.remove(0),
        ];
        let merged = union_all(&parts).expect("two squares should merge");
        assert!((merged.unsigned_area() - 6.0).abs() < 1e-9);
        assert!(union_all(&[]).is_none());
    }

    #[test]
    fn union_all_ignores_where_a_broken_member_sits() {
        let broken = polygon![(x: 20.0, y: 0.0), (x: f64::NAN, y: 0.0), (x: 21.0, y: 1.0)];
        let island = square(0.0, 0.0, 10.0, 10.0).0.remove(0);

        let first = union_all(&[broken.clone(), island.clone()]).expect("island survives");
        let last = union_all(&[island, broken.clone()]).expect("island survives");
        assert!((first.unsigned_area() - 100.0).abs() < 1e-9);
        assert!((last.unsigned_area() - 100.0).abs() < 1e-9);
        assert!(union_all(&[broken]).is_none());
    }

    #[test]
    fn buffer_all_skips_broken_lines() {
        let lines = vec![
            line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)],
            line_string![(x: 1.0, y: 1.0)],
        ];
        let corridor = buffer_all(&lines, 0.5).expect("one line should survive");
        let rect = corridor.bounding_rect().unwrap();
        assert!(corridor.unsigned_area() > 3.9);
        assert!((rect.min().y + 0.5).abs() < 1e-6);
        assert!((rect.max().y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn negative_buffer_distance_is_rejected() {
        assert!(buffer(&square(0.0, 0.0, 1.0, 1.0), -1.0).is_err());
    }

    #[test]
    fn single_feature_normalises_to_single() {
        let doc = GeoJson::from_json_str(
            r#"{"type": "Feature", "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}}"#,
        )
        .unwrap();
        let input = GeometryInput::polygons_from_geojson(&doc).unwrap();
        assert!(matches!(input, GeometryInput::Single(_)));
        assert_eq!(input.into_vec().len(), 1);
    }

    #[test]
    fn prepared_layer_answers_point_queries() {
        let layer = PreparedLayer::from_shape(square(0.0, 0.0, 2.0, 2.0));
        assert!(layer.contains(Coordinate::new(1.0, 1.0)));
        assert!(!layer.contains(Coordinate::new(3.0, 1.0)));
    }
}

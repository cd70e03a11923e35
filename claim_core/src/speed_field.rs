//! Terrain speed fields.
//!
//! A speed field answers "how much power does one distance step cost here".
//! Zero is the impassable sentinel; the field must not change during a sweep,
//! so every realisation here is immutable once built.

use ahash::AHashMap;
use claim_schema::{GridKey, SchemaError, SpeedMapFile};

use crate::coordinate::Coordinate;

pub trait SpeedField {
    /// Non-negative traversal cost at `coordinate`. `0.0` means impassable.
    fn speed_at(&self, coordinate: Coordinate) -> f64;

    #[inline]
    fn is_passable(&self, coordinate: Coordinate) -> bool {
        self.speed_at(coordinate) > 0.0
    }
}

impl<F> SpeedField for F
where
    F: Fn(Coordinate) -> f64 + ?Sized,
{
    #[inline]
    fn speed_at(&self, coordinate: Coordinate) -> f64 {
        self(coordinate).max(0.0)
    }
}

/// Discretised lookup keyed by the nearest integer degree.
#[derive(Debug, Clone, Default)]
pub struct GridSpeedField {
    cells: AHashMap<GridKey, f64>,
}

impl GridSpeedField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from raw cells, discarding non-finite and non-positive speeds.
    pub fn from_cells(cells: impl IntoIterator<Item = (GridKey, f64)>) -> Self {
        let cells = cells
            .into_iter()
            .filter(|(_, speed)| speed.is_finite() && *speed > 0.0)
            .collect();
        Self { cells }
    }

    pub fn from_speed_map(file: &SpeedMapFile) -> Result<Self, SchemaError> {
        Ok(Self::from_cells(file.cells()?))
    }

    pub fn to_speed_map(&self) -> SpeedMapFile {
        SpeedMapFile::from_cells(self.cells.iter().map(|(key, speed)| (*key, *speed)))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, key: GridKey) -> f64 {
        self.cells.get(&key).copied().unwrap_or(0.0)
    }

    /// Smallest passable speed in the table, if any.
    pub fn min_speed(&self) -> Option<f64> {
        self.cells.values().copied().reduce(f64::min)
    }
}

impl SpeedField for GridSpeedField {
    #[inline]
    fn speed_at(&self, coordinate: Coordinate) -> f64 {
        self.cell(coordinate.grid_key())
    }
}

/// On/off terrain model: a fixed cost wherever the predicate holds.
#[derive(Debug, Clone)]
pub struct PassabilityField<P> {
    predicate: P,
    speed: f64,
}

impl<P> PassabilityField<P>
where
    P: Fn(Coordinate) -> bool,
{
    pub fn new(predicate: P, speed: f64) -> Self {
        Self {
            predicate,
            speed: speed.max(0.0),
        }
    }
}

impl<P> SpeedField for PassabilityField<P>
where
    P: Fn(Coordinate) -> bool,
{
    #[inline]
    fn speed_at(&self, coordinate: Coordinate) -> f64 {
        if (self.predicate)(coordinate) {
            self.speed
        } else {
            0.0
        }
    }

    #[inline]
    fn is_passable(&self, coordinate: Coordinate) -> bool {
        self.speed > 0.0 && (self.predicate)(coordinate)
    }
}

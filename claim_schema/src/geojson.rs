use std::{fs, path::Path};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::SchemaError;

/// A GeoJSON position. Ordinates past the second (altitude) are ignored.
pub type Position = Vec<f64>;

// Each struct carries its own `type` member so nested features keep their tag
// when a collection is written back out.

/// The document shapes accepted on input and produced on output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoJson {
    FeatureCollection(FeatureCollection),
    Feature(Feature),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum CollectionKind {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureKind {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: CollectionKind,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default)]
    kind: FeatureKind,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl GeoJson {
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let contents = fs::read_to_string(path).map_err(|source| SchemaError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn write_file(&self, path: &Path) -> Result<(), SchemaError> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json).map_err(|source| SchemaError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn features(&self) -> &[Feature] {
        match self {
            GeoJson::FeatureCollection(collection) => &collection.features,
            GeoJson::Feature(feature) => std::slice::from_ref(feature),
        }
    }

    /// Every areal geometry in the document, multi-polygons flattened.
    pub fn polygons(&self) -> Result<Vec<Polygon<f64>>, SchemaError> {
        let mut out = Vec::new();
        for feature in self.features() {
            if let Some(geometry) = &feature.geometry {
                out.extend(geometry.polygons()?);
            }
        }
        Ok(out)
    }

    /// Every linear geometry in the document, multi-lines flattened.
    pub fn lines(&self) -> Result<Vec<LineString<f64>>, SchemaError> {
        let mut out = Vec::new();
        for feature in self.features() {
            if let Some(geometry) = &feature.geometry {
                out.extend(geometry.lines()?);
            }
        }
        Ok(out)
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: CollectionKind::FeatureCollection,
            features,
        }
    }
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            kind: FeatureKind::Feature,
            properties: None,
            geometry: Some(geometry),
        }
    }

    /// Builds a `Polygon` feature when the input has a single member and a
    /// `MultiPolygon` feature otherwise.
    pub fn from_multi_polygon(shape: &MultiPolygon<f64>) -> Self {
        let geometry = match shape.0.as_slice() {
            [single] => Geometry::from(single),
            _ => Geometry::from(shape),
        };
        Self::new(geometry)
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }
}

impl Geometry {
    pub fn polygons(&self) -> Result<Vec<Polygon<f64>>, SchemaError> {
        match self {
            Geometry::Polygon(rings) => Ok(vec![to_polygon(rings)?]),
            Geometry::MultiPolygon(polygons) => polygons.iter().map(|p| to_polygon(p)).collect(),
            _ => Ok(Vec::new()),
        }
    }

    pub fn lines(&self) -> Result<Vec<LineString<f64>>, SchemaError> {
        match self {
            Geometry::LineString(positions) => Ok(vec![to_line(positions)?]),
            Geometry::MultiLineString(lines) => lines.iter().map(|l| to_line(l)).collect(),
            _ => Ok(Vec::new()),
        }
    }
}

impl From<&Polygon<f64>> for Geometry {
    fn from(polygon: &Polygon<f64>) -> Self {
        Geometry::Polygon(polygon_positions(polygon))
    }
}

impl From<&MultiPolygon<f64>> for Geometry {
    fn from(shape: &MultiPolygon<f64>) -> Self {
        Geometry::MultiPolygon(shape.0.iter().map(polygon_positions).collect())
    }
}

fn to_coord(position: &Position) -> Result<Coord<f64>, SchemaError> {
    match position.as_slice() {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        other => Err(SchemaError::InvalidPosition(other.len())),
    }
}

fn to_line(positions: &[Position]) -> Result<LineString<f64>, SchemaError> {
    positions
        .iter()
        .map(to_coord)
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn to_polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, SchemaError> {
    let mut rings = rings.iter().map(|ring| to_line(ring));
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => LineString::new(Vec::new()),
    };
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn ring_positions(ring: &LineString<f64>) -> Vec<Position> {
    ring.coords().map(|c| vec![c.x, c.y]).collect()
}

fn polygon_positions(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_positions)
        .collect()
}

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::SchemaError;

/// Integer-degree grid key, latitude first to match the file's `"lat,lon"` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridKey {
    pub lat: i32,
    pub lon: i32,
}

impl GridKey {
    pub fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    pub fn parse(key: &str) -> Result<Self, SchemaError> {
        let invalid = || SchemaError::InvalidGridKey(key.to_string());
        let (lat, lon) = key.split_once(',').ok_or_else(invalid)?;
        let lat = lat.trim().parse().map_err(|_| invalid())?;
        let lon = lon.trim().parse().map_err(|_| invalid())?;
        Ok(Self { lat, lon })
    }
}

impl std::fmt::Display for GridKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// On-disk form of a discretised terrain speed table.
///
/// Only passable cells are stored; a missing key reads as speed 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeedMapFile {
    cells: BTreeMap<String, f64>,
}

impl SpeedMapFile {
    pub fn from_cells(cells: impl IntoIterator<Item = (GridKey, f64)>) -> Self {
        Self {
            cells: cells
                .into_iter()
                .map(|(key, speed)| (key.to_string(), speed))
                .collect(),
        }
    }

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

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Parsed cells. Fails on the first key that is not `"lat,lon"`.
    pub fn cells(&self) -> Result<Vec<(GridKey, f64)>, SchemaError> {
        self.cells
            .iter()
            .map(|(key, speed)| GridKey::parse(key).map(|k| (k, *speed)))
            .collect()
    }
}

//! Data interchange formats for territory claims.
//!
//! Authoritative land, lake and river layers arrive as a GeoJSON subset; the
//! discretised terrain speed table travels as a flat `"lat,lon" -> speed`
//! JSON object. Both are converted into `geo` geometry or plain Rust maps
//! here so the core never touches raw JSON.

mod geojson;
mod speed_map;

use std::{io, path::PathBuf};

use thiserror::Error;

pub use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Position};
pub use speed_map::{GridKey, SpeedMapFile};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("position needs at least two ordinates, got {0}")]
    InvalidPosition(usize),
    #[error("speed map key {0:?} is not of the form \"lat,lon\"")]
    InvalidGridKey(String),
}

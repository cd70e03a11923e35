//! Territory claim engine.
//!
//! Marches rays outward from an origin across a terrain speed field, closes the
//! boundary points into a ring and refines that ring against authoritative
//! land, lake and river geometry. Entry point is [`compute_territory`].

mod claim;
mod coastline;
pub mod config;
mod coordinate;
pub mod geometry;
mod grid_builder;
mod progress;
mod raymarch;
mod refine;
mod speed_field;
pub mod surface;
mod sweep;

pub use claim::{
    compute_territory, compute_territory_with, split_land_by_claim, ClaimError, ClaimOutcome,
    LandPartition, LandPiece,
};
pub use coastline::{CoastlineRefiner, DEFAULT_COASTLINE_ITERATIONS};
pub use config::{
    load_claim_config_from_env, ClaimConfig, ClaimConfigError, SpeedGridConfig,
    BUILTIN_CLAIM_CONFIG, BUILTIN_SPEED_GRID_CONFIG,
};
pub use coordinate::{Coordinate, KM_PER_DEGREE, MAX_SCALING_LATITUDE};
pub use geometry::{AuthoritativeGeometry, GeometryError, GeometryInput};
pub use grid_builder::{build_speed_grid, build_speed_grid_with};
pub use progress::{CancelToken, FnObserver, NoopObserver, ProgressObserver, SweepProgress};
pub use raymarch::{BoundaryPoint, Ray, RayMarcher, Termination};
pub use refine::TerritoryRefiner;
pub use speed_field::{GridSpeedField, PassabilityField, SpeedField};
pub use surface::{
    ClassifiedSpeedField, GeometryClassifier, SurfaceClass, SurfaceClassifier, SurfaceTags,
};
pub use sweep::{RawPolygon, SweepError, SweepStatus, TerritorySweep};

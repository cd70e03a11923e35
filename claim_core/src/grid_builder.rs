//! Builds a 1° [`GridSpeedField`] from authoritative geometry.
//!
//! Glaciers count as land and take the glacier speed from the surface table.

use std::sync::atomic::{AtomicUsize, Ordering};

use claim_schema::GridKey;
use crossbeam_channel::Sender;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::{
    config::{ClaimConfigError, SpeedGridConfig},
    coordinate::Coordinate,
    geometry::{buffer_all, AuthoritativeGeometry, PreparedLayer},
    progress::{ProgressObserver, SweepProgress},
    speed_field::GridSpeedField,
    surface::{surface_definition, SurfaceClass},
};

const TARGET: &str = "territory_claim::grid";

struct GridLayers {
    land: PreparedLayer,
    lakes: PreparedLayer,
    rivers: PreparedLayer,
    glaciers: PreparedLayer,
}

impl GridLayers {
    fn new(geometry: &AuthoritativeGeometry, river_proximity_deg: f64) -> Self {
        let rivers = geometry
            .rivers
            .as_deref()
            .and_then(|lines| buffer_all(lines, river_proximity_deg))
            .map(PreparedLayer::from_shape)
            .unwrap_or_default();
        Self {
            land: PreparedLayer::new(geometry.land.iter().chain(&geometry.glaciers).cloned()),
            lakes: PreparedLayer::new(geometry.lakes.iter().flatten().cloned()),
            rivers,
            glaciers: PreparedLayer::new(geometry.glaciers.iter().cloned()),
        }
    }
}

pub fn build_speed_grid(
    geometry: &AuthoritativeGeometry,
    config: &SpeedGridConfig,
) -> Result<GridSpeedField, ClaimConfigError> {
    build_speed_grid_with(geometry, config, None)
}

/// Rows are built in parallel. Each finished row sends one progress event whose
/// `bearing_deg` carries the row latitude.
pub fn build_speed_grid_with(
    geometry: &AuthoritativeGeometry,
    config: &SpeedGridConfig,
    progress: Option<Sender<SweepProgress>>,
) -> Result<GridSpeedField, ClaimConfigError> {
    config.validate()?;
    let layers = GridLayers::new(geometry, config.river_proximity_deg);
    let total = config.row_count();
    let completed = AtomicUsize::new(0);

    let rows: Vec<Vec<(GridKey, f64)>> = (config.lat_min..=config.lat_max)
        .into_par_iter()
        .map_with(progress, |progress, lat| {
            let row = build_row(&layers, config, lat);
            if let Some(sender) = progress {
                sender.on_progress(SweepProgress {
                    bearing_deg: f64::from(lat),
                    completed: completed.fetch_add(1, Ordering::Relaxed) + 1,
                    total,
                });
            }
            row
        })
        .collect();

    let field = GridSpeedField::from_cells(rows.into_iter().flatten());
    tracing::info!(
        target: TARGET,
        rows = total,
        cells = field.len(),
        seed = config.seed,
        "speed_grid.built"
    );
    Ok(field)
}

fn build_row(layers: &GridLayers, config: &SpeedGridConfig, lat: i32) -> Vec<(GridKey, f64)> {
    let row_index = (i64::from(lat) - i64::from(config.lat_min)) as u64;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(row_index));
    let mut cells = Vec::new();

    for lon in config.lon_min..=config.lon_max {
        let node = Coordinate::new(f64::from(lon), f64::from(lat));
        if !layers.land.contains(node) {
            continue;
        }
        // Draw for every land node so water features do not shift the sequence.
        let land_speed = if config.land_speed_max > config.land_speed_min {
            rng.gen_range(config.land_speed_min..config.land_speed_max)
        } else {
            config.land_speed_min
        };
        let speed = if layers.lakes.contains(node) || layers.rivers.contains(node) {
            config.water_feature_speed
        } else if layers.glaciers.contains(node) {
            surface_definition(SurfaceClass::Glacier).speed
        } else {
            land_speed
        };
        cells.push((GridKey::new(lat, lon), speed));
    }
    cells
}

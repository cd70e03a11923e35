use std::path::{Path, PathBuf};

use clap::Args;
use claim_core::{AuthoritativeGeometry, GeometryInput};
use claim_schema::GeoJson;
use color_eyre::{eyre::WrapErr, Result};
use tracing::info;

/// Authoritative geometry layers shared by every subcommand.
#[derive(Args, Debug)]
pub struct GeometryArgs {
    /// GeoJSON land polygons.
    #[arg(long)]
    pub land: PathBuf,
    /// GeoJSON lake polygons.
    #[arg(long)]
    pub lakes: Option<PathBuf>,
    /// GeoJSON river lines.
    #[arg(long)]
    pub rivers: Option<PathBuf>,
    /// GeoJSON glacier polygons.
    #[arg(long)]
    pub glaciers: Option<PathBuf>,
}

impl GeometryArgs {
    pub fn load(&self) -> Result<AuthoritativeGeometry> {
        let land = GeometryInput::polygons_from_geojson(&read_layer(&self.land)?)?;
        let mut geometry = AuthoritativeGeometry::new(land);

        if let Some(path) = &self.lakes {
            geometry = geometry.with_lakes(GeometryInput::polygons_from_geojson(&read_layer(path)?)?);
        }
        if let Some(path) = &self.rivers {
            geometry = geometry.with_rivers(GeometryInput::lines_from_geojson(&read_layer(path)?)?);
        }
        if let Some(path) = &self.glaciers {
            geometry =
                geometry.with_glaciers(GeometryInput::polygons_from_geojson(&read_layer(path)?)?);
        }

        info!(
            target: "territory_claim::cli",
            land = geometry.land.len(),
            lakes = geometry.lakes.as_ref().map_or(0, Vec::len),
            rivers = geometry.rivers.as_ref().map_or(0, Vec::len),
            glaciers = geometry.glaciers.len(),
            "geometry.loaded"
        );
        Ok(geometry)
    }
}

fn read_layer(path: &Path) -> Result<GeoJson> {
    GeoJson::from_file(path).wrap_err_with(|| format!("loading layer {}", path.display()))
}

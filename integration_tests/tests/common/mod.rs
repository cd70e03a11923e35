#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use claim_core::{AuthoritativeGeometry, GeometryInput};
use claim_schema::GeoJson;
use geo::{polygon, Polygon};

static INIT: Once = Once::new();

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = fixture("test_claim_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test claim config at {}",
            config_path.display()
        );

        std::env::set_var("CLAIM_CONFIG_PATH", &config_path);
    });
}

pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
}

/// Square island spanning `[0, 10]` in both axes.
pub fn square_island() -> AuthoritativeGeometry {
    AuthoritativeGeometry::new(GeometryInput::Single(rect(0.0, 0.0, 10.0, 10.0)))
}

/// Island, lake and river layers from the GeoJSON fixtures.
pub fn fixture_geometry() -> anyhow::Result<AuthoritativeGeometry> {
    let land = GeoJson::from_file(&fixture("island.geojson"))?;
    let lakes = GeoJson::from_file(&fixture("lakes.geojson"))?;
    let rivers = GeoJson::from_file(&fixture("rivers.geojson"))?;
    Ok(
        AuthoritativeGeometry::new(GeometryInput::polygons_from_geojson(&land)?)
            .with_lakes(GeometryInput::polygons_from_geojson(&lakes)?)
            .with_rivers(GeometryInput::lines_from_geojson(&rivers)?),
    )
}

//! Claim and speed-grid configuration.
//!
//! Loaded from `claim_config.json` / `speed_grid_config.json` with support for
//! environment variable overrides.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_CLAIM_CONFIG: &str = include_str!("data/claim_config.json");
pub const BUILTIN_SPEED_GRID_CONFIG: &str = include_str!("data/speed_grid_config.json");

/// Parameters of one territory claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// Power budget every ray starts with.
    pub initial_power: f64,
    /// Angular spacing between rays, degrees.
    pub angle_step_deg: f64,
    /// Length of one full march step, kilometres.
    pub distance_step_km: f64,
    /// Snap tolerance of the boundary refiner, degrees. Zero disables snapping.
    pub refiner_snap_deg: f64,
    /// Half-width of river corridors, degrees. Zero ignores rivers.
    pub river_buffer_deg: f64,
    pub coastline_iterations: u32,
    pub max_steps_per_ray: u32,
    /// Rays completed between cooperative yield points.
    pub rays_per_yield: u32,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            initial_power: 200.0,
            angle_step_deg: 1.0,
            distance_step_km: 0.1,
            refiner_snap_deg: 0.1,
            river_buffer_deg: 0.1,
            coastline_iterations: 6,
            max_steps_per_ray: 100_000,
            rays_per_yield: 16,
        }
    }
}

impl ClaimConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_CLAIM_CONFIG).expect("builtin claim config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ClaimConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ClaimConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ClaimConfig::from_json_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClaimConfigError> {
        non_negative("initial_power", self.initial_power)?;
        positive("angle_step_deg", self.angle_step_deg)?;
        if self.angle_step_deg > 360.0 {
            return Err(ClaimConfigError::Invalid {
                field: "angle_step_deg",
                reason: "must not exceed 360",
            });
        }
        positive("distance_step_km", self.distance_step_km)?;
        non_negative("refiner_snap_deg", self.refiner_snap_deg)?;
        non_negative("river_buffer_deg", self.river_buffer_deg)?;
        if self.max_steps_per_ray == 0 {
            return Err(ClaimConfigError::Invalid {
                field: "max_steps_per_ray",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Number of rays in one full sweep.
    pub fn bearing_count(&self) -> usize {
        (360.0 / self.angle_step_deg).ceil() as usize
    }
}

/// Parameters for building a discretised speed grid from geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedGridConfig {
    pub seed: u64,
    pub lat_min: i32,
    pub lat_max: i32,
    pub lon_min: i32,
    pub lon_max: i32,
    pub land_speed_min: f64,
    pub land_speed_max: f64,
    /// Speed of lake interiors and river corridors.
    pub water_feature_speed: f64,
    /// Distance from a river centreline that still counts as "on" the river.
    pub river_proximity_deg: f64,
}

impl Default for SpeedGridConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            lat_min: -90,
            lat_max: 90,
            lon_min: -180,
            lon_max: 180,
            land_speed_min: 0.03,
            land_speed_max: 0.08,
            water_feature_speed: 5.0,
            river_proximity_deg: 0.05,
        }
    }
}

impl SpeedGridConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_SPEED_GRID_CONFIG)
                .expect("builtin speed grid config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ClaimConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ClaimConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config = SpeedGridConfig::from_json_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClaimConfigError> {
        if self.lat_min > self.lat_max || self.lon_min > self.lon_max {
            return Err(ClaimConfigError::Invalid {
                field: "lat_min/lon_min",
                reason: "window minimum exceeds maximum",
            });
        }
        positive("land_speed_min", self.land_speed_min)?;
        if self.land_speed_max < self.land_speed_min {
            return Err(ClaimConfigError::Invalid {
                field: "land_speed_max",
                reason: "must not be below land_speed_min",
            });
        }
        positive("water_feature_speed", self.water_feature_speed)?;
        non_negative("river_proximity_deg", self.river_proximity_deg)
    }

    pub fn row_count(&self) -> usize {
        (self.lat_max - self.lat_min + 1).max(0) as usize
    }
}

#[derive(Debug, Error)]
pub enum ClaimConfigError {
    #[error("failed to parse claim config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read claim config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

fn positive(field: &'static str, value: f64) -> Result<(), ClaimConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ClaimConfigError::Invalid {
            field,
            reason: "must be finite and greater than zero",
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ClaimConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ClaimConfigError::Invalid {
            field,
            reason: "must be finite and not negative",
        })
    }
}

/// Load claim configuration from `CLAIM_CONFIG_PATH`, falling back to the builtin.
pub fn load_claim_config_from_env() -> Arc<ClaimConfig> {
    if let Some(path) = env::var("CLAIM_CONFIG_PATH").ok().map(PathBuf::from) {
        match ClaimConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "territory_claim::config",
                    path = %path.display(),
                    "claim_config.loaded=file"
                );
                return Arc::new(config);
            }
            Err(err) => {
                tracing::warn!(
                    target: "territory_claim::config",
                    path = %path.display(),
                    error = %err,
                    "claim_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "territory_claim::config", "claim_config.loaded=builtin");
    ClaimConfig::builtin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_matches_default() {
        assert_eq!(*ClaimConfig::builtin(), ClaimConfig::default());
        assert_eq!(*SpeedGridConfig::builtin(), SpeedGridConfig::default());
    }

    #[test]
    fn default_serialises_stably() {
        let json = serde_json::to_string(&ClaimConfig::default()).unwrap();
        insta::assert_snapshot!(json, @r#"{"initial_power":200.0,"angle_step_deg":1.0,"distance_step_km":0.1,"refiner_snap_deg":0.1,"river_buffer_deg":0.1,"coastline_iterations":6,"max_steps_per_ray":100000,"rays_per_yield":16}"#);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ClaimConfig::from_json_str(r#"{"initial_power": 50}"#).unwrap();
        assert_eq!(config.initial_power, 50.0);
        assert_eq!(config.angle_step_deg, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_angle_step_is_invalid() {
        let config = ClaimConfig {
            angle_step_deg: 0.0,
            ..ClaimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ClaimConfigError::Invalid {
                field: "angle_step_deg",
                ..
            })
        ));
    }

    #[test]
    fn bearing_count_rounds_up() {
        let config = ClaimConfig {
            angle_step_deg: 7.0,
            ..ClaimConfig::default()
        };
        assert_eq!(config.bearing_count(), 52);
        assert_eq!(ClaimConfig::default().bearing_count(), 360);
    }

    #[test]
    fn inverted_grid_window_is_invalid() {
        let config = SpeedGridConfig {
            lat_min: 10,
            lat_max: -10,
            ..SpeedGridConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(SpeedGridConfig::default().row_count(), 181);
    }
}

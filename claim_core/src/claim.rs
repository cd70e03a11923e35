//! End-to-end claim: sweep the raw boundary, then refine it against land.

use std::thread;

use claim_schema::{Feature, FeatureCollection};
use geo::{MultiPolygon, Polygon};
use thiserror::Error;

use crate::{
    config::{ClaimConfig, ClaimConfigError},
    coordinate::Coordinate,
    geometry::{self, AuthoritativeGeometry},
    progress::{CancelToken, NoopObserver, ProgressObserver},
    refine::TerritoryRefiner,
    speed_field::SpeedField,
    sweep::{RawPolygon, SweepError, SweepStatus, TerritorySweep},
};

const TARGET: &str = "territory_claim::claim";

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("invalid claim config: {0}")]
    InvalidConfig(#[from] ClaimConfigError),
    #[error("claim was cancelled")]
    Cancelled,
    #[error(transparent)]
    Sweep(#[from] SweepError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimOutcome {
    /// Ray-marched ring before refinement.
    pub raw: RawPolygon,
    /// `None` when the claim does not touch land.
    pub territory: Option<MultiPolygon<f64>>,
}

impl ClaimOutcome {
    pub fn is_claimed(&self) -> bool {
        self.territory.is_some()
    }
}

pub fn compute_territory<F>(
    origin: Coordinate,
    field: &F,
    geometry: &AuthoritativeGeometry,
    config: &ClaimConfig,
) -> Result<ClaimOutcome, ClaimError>
where
    F: SpeedField + ?Sized,
{
    compute_territory_with(
        origin,
        field,
        geometry,
        config,
        &mut NoopObserver,
        &CancelToken::default(),
    )
}

/// Runs a claim, yielding the thread every `rays_per_yield` rays. The token is
/// checked before each ray.
pub fn compute_territory_with<F, O>(
    origin: Coordinate,
    field: &F,
    geometry: &AuthoritativeGeometry,
    config: &ClaimConfig,
    observer: &mut O,
    cancel: &CancelToken,
) -> Result<ClaimOutcome, ClaimError>
where
    F: SpeedField + ?Sized,
    O: ProgressObserver + ?Sized,
{
    config.validate()?;
    let budget = config.rays_per_yield.max(1) as usize;

    let mut sweep =
        TerritorySweep::from_config(field, origin, config).with_cancel_token(cancel.clone());
    tracing::debug!(
        target: TARGET,
        lon = origin.lon,
        lat = origin.lat,
        rays = sweep.total(),
        "claim.started"
    );

    loop {
        match sweep.run_for(budget, observer) {
            SweepStatus::Complete => break,
            SweepStatus::Cancelled => return Err(ClaimError::Cancelled),
            SweepStatus::Pending => thread::yield_now(),
        }
    }

    let raw = sweep.finish()?;
    let territory = TerritoryRefiner::from_config(config).refine(&raw.to_multi_polygon(), geometry);
    tracing::debug!(
        target: TARGET,
        vertices = raw.vertex_count(),
        claimed = territory.is_some(),
        "claim.complete"
    );
    Ok(ClaimOutcome { raw, territory })
}

#[derive(Debug, Clone, PartialEq)]
pub struct LandPiece {
    /// Index of the land polygon this piece was cut from.
    pub source: usize,
    pub claimed: bool,
    pub shape: MultiPolygon<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandPartition {
    pub pieces: Vec<LandPiece>,
}

impl LandPartition {
    pub fn claimed(&self) -> impl Iterator<Item = &LandPiece> {
        self.pieces.iter().filter(|piece| piece.claimed)
    }

    pub fn unclaimed(&self) -> impl Iterator<Item = &LandPiece> {
        self.pieces.iter().filter(|piece| !piece.claimed)
    }

    /// One feature per piece, tagged with a boolean `claimed` property.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let features = self
            .pieces
            .iter()
            .map(|piece| {
                Feature::from_multi_polygon(&piece.shape).with_property("claimed", piece.claimed)
            })
            .collect();
        FeatureCollection::new(features)
    }
}

/// Cuts every land polygon into its claimed and unclaimed parts. Empty parts
/// are omitted. A failed cut leaves that polygon whole and unclaimed.
pub fn split_land_by_claim(
    land: &[Polygon<f64>],
    territory: Option<&MultiPolygon<f64>>,
) -> LandPartition {
    let mut pieces = Vec::with_capacity(land.len() * 2);

    for (source, polygon) in land.iter().enumerate() {
        let whole = MultiPolygon::new(vec![polygon.clone()]);
        let Some(territory) = territory else {
            pieces.push(LandPiece {
                source,
                claimed: false,
                shape: whole,
            });
            continue;
        };

        let cut = geometry::intersection(&whole, territory)
            .and_then(|claimed| Ok((claimed, geometry::difference(&whole, territory)?)));
        match cut {
            Ok((claimed, unclaimed)) => {
                for (claimed, shape) in [(true, claimed), (false, unclaimed)] {
                    if !geometry::is_empty(&shape) {
                        pieces.push(LandPiece {
                            source,
                            claimed,
                            shape,
                        });
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    target: TARGET,
                    source,
                    error = %err,
                    fallback = "unclaimed",
                    "split.failed"
                );
                pieces.push(LandPiece {
                    source,
                    claimed: false,
                    shape: whole,
                });
            }
        }
    }

    LandPartition { pieces }
}

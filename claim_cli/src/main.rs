use std::path::PathBuf;
use std::thread;

use clap::{Args, Parser, Subcommand};
use claim_core::{
    build_speed_grid_with, compute_territory_with, load_claim_config_from_env,
    split_land_by_claim, CancelToken, ClaimConfig, ClaimOutcome, ClassifiedSpeedField, Coordinate,
    GeometryClassifier, GridSpeedField, SpeedField, SpeedGridConfig, SweepProgress,
};
use claim_schema::{Feature, FeatureCollection, GeoJson, SpeedMapFile};
use color_eyre::{eyre::WrapErr, Result};
use crossbeam_channel::{bounded, Receiver};
use tracing::{debug, info};

mod inputs;

use inputs::GeometryArgs;

const TARGET: &str = "territory_claim::cli";

#[derive(Parser, Debug)]
#[command(author, version, about = "Territory claim raycaster", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a 1° speed map from land, lake and river layers.
    BuildGrid(BuildGridArgs),
    /// Claim territory around an origin and write it as GeoJSON.
    Claim(ClaimArgs),
}

#[derive(Args, Debug)]
struct BuildGridArgs {
    #[command(flatten)]
    geometry: GeometryArgs,
    /// Speed grid config JSON; defaults to the builtin.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured seed.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct ClaimArgs {
    /// Speed map produced by `build-grid`. Without it the land layers are
    /// classified directly.
    #[arg(long)]
    speed_map: Option<PathBuf>,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[command(flatten)]
    geometry: GeometryArgs,
    /// Claim config JSON; defaults to `CLAIM_CONFIG_PATH` or the builtin.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write every land polygon split into claimed and unclaimed parts.
    #[arg(long)]
    split: bool,
    #[arg(long)]
    out: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::BuildGrid(args) => build_grid(args),
        Command::Claim(args) => claim(args),
    }
}

fn build_grid(args: BuildGridArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SpeedGridConfig::from_file(path)?,
        None => (*SpeedGridConfig::builtin()).clone(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let geometry = args.geometry.load()?;

    let (tx, rx) = bounded(256);
    let logger = spawn_progress_logger(rx, "rows");
    let field = build_speed_grid_with(&geometry, &config, Some(tx))?;
    let _ = logger.join();

    field
        .to_speed_map()
        .write_file(&args.out)
        .wrap_err("writing speed map")?;
    info!(
        target: TARGET,
        cells = field.len(),
        out = %args.out.display(),
        "speed_map.written"
    );
    Ok(())
}

fn claim(args: ClaimArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ClaimConfig::from_file(path)?,
        None => (*load_claim_config_from_env()).clone(),
    };
    let geometry = args.geometry.load()?;
    let origin = Coordinate::new(args.lon, args.lat);

    let field: Box<dyn SpeedField> = match &args.speed_map {
        Some(path) => {
            let file = SpeedMapFile::from_file(path)?;
            Box::new(GridSpeedField::from_speed_map(&file)?)
        }
        None => Box::new(ClassifiedSpeedField::new(GeometryClassifier::new(
            &geometry,
            config.river_buffer_deg,
        ))),
    };
    if !field.is_passable(origin) {
        info!(target: TARGET, lon = origin.lon, lat = origin.lat, "claim.origin_impassable");
    }

    let (tx, rx) = bounded(256);
    let logger = spawn_progress_logger(rx, "rays");
    let mut observer = tx;
    let outcome = compute_territory_with(
        origin,
        field.as_ref(),
        &geometry,
        &config,
        &mut observer,
        &CancelToken::new(),
    );
    drop(observer);
    let _ = logger.join();
    let outcome = outcome?;

    let collection = if args.split {
        split_land_by_claim(&geometry.land, outcome.territory.as_ref()).to_feature_collection()
    } else {
        territory_collection(&outcome)
    };
    GeoJson::FeatureCollection(collection)
        .write_file(&args.out)
        .wrap_err("writing territory")?;
    info!(
        target: TARGET,
        claimed = outcome.is_claimed(),
        out = %args.out.display(),
        "territory.written"
    );
    Ok(())
}

fn territory_collection(outcome: &ClaimOutcome) -> FeatureCollection {
    let features = outcome
        .territory
        .iter()
        .map(|territory| Feature::from_multi_polygon(territory).with_property("claimed", true))
        .collect();
    FeatureCollection::new(features)
}

/// Logs every tenth of the work at info and each event at debug. Ends when all
/// senders are dropped.
fn spawn_progress_logger(rx: Receiver<SweepProgress>, unit: &'static str) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut next_decile = 1;
        for progress in rx {
            debug!(
                target: TARGET,
                bearing = progress.bearing_deg,
                completed = progress.completed,
                total = progress.total,
                "progress"
            );
            let decile = (progress.fraction() * 10.0).floor() as u32;
            if decile >= next_decile {
                info!(
                    target: TARGET,
                    unit,
                    completed = progress.completed,
                    total = progress.total,
                    "progress.{}0%",
                    decile
                );
                next_decile = decile + 1;
            }
        }
    })
}

use claim_core::{
    compute_territory, AuthoritativeGeometry, ClaimConfig, ClassifiedSpeedField, Coordinate,
    GeometryClassifier, GeometryInput, RayMarcher, TerritoryRefiner, TerritorySweep,
};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use geo::{line_string, polygon, MultiPolygon};

fn island(half_width: f64) -> AuthoritativeGeometry {
    AuthoritativeGeometry::new(GeometryInput::Single(polygon![
        (x: -half_width, y: -half_width),
        (x: half_width, y: -half_width),
        (x: half_width, y: half_width),
        (x: -half_width, y: half_width),
    ]))
    .with_rivers(GeometryInput::Single(line_string![
        (x: 0.0, y: -half_width),
        (x: 0.3, y: half_width),
    ]))
}

fn bench_config(angle_step_deg: f64) -> ClaimConfig {
    ClaimConfig {
        angle_step_deg,
        ..ClaimConfig::default()
    }
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("territory_sweep");
    let uniform = |_: Coordinate| 1.0;

    for step in [10.0, 5.0, 1.0] {
        let config = bench_config(step);
        group.bench_with_input(BenchmarkId::new("uniform", step), &config, |b, config| {
            b.iter(|| {
                let mut sweep = TerritorySweep::new(
                    &uniform,
                    Coordinate::new(0.0, 0.0),
                    RayMarcher::from_config(config),
                    config.angle_step_deg,
                );
                sweep.by_ref().for_each(drop);
                black_box(sweep.finish())
            });
        });
    }

    let geometry = island(0.2);
    let classified = ClassifiedSpeedField::new(GeometryClassifier::new(&geometry, 0.01));
    let config = bench_config(5.0);
    group.bench_function("classified_island", |b| {
        b.iter(|| {
            black_box(compute_territory(
                Coordinate::new(0.05, 0.05),
                &classified,
                &geometry,
                &config,
            ))
        });
    });

    group.finish();
}

fn bench_refine(c: &mut Criterion) {
    let geometry = island(1.0);
    let raw: MultiPolygon<f64> = polygon![
        (x: -0.5, y: -0.5),
        (x: 1.5, y: -0.5),
        (x: 1.5, y: 0.95),
        (x: -0.5, y: 0.95),
    ]
    .into();

    c.bench_function("refine_snap", |b| {
        b.iter_batched(
            || TerritoryRefiner::new(0.1, 0.05),
            |refiner| black_box(refiner.refine(&raw, &geometry)),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(sweep_benches, bench_sweep, bench_refine);
criterion_main!(sweep_benches);

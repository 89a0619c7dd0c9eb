use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::DVec3;
use spheretree::{DetectorGeometry, GeometryIndex, IndexConfig, SensorSpec};

/// Lines of storeys on a square grid, 31 sensors per storey like a
/// multi-PMT optical module.
fn detector(lines_per_side: u32, storeys_per_line: u32) -> DetectorGeometry {
    let mut geometry = DetectorGeometry::new();
    for i in 0..lines_per_side {
        for j in 0..lines_per_side {
            for k in 0..storeys_per_line {
                let pos = DVec3::new(
                    f64::from(i) * 90.0,
                    f64::from(j) * 90.0,
                    100.0 + f64::from(k) * 36.0,
                );
                let storey = geometry.add_carrier(pos).unwrap();
                for m in 0..31 {
                    let phi = f64::from(m) * 0.2;
                    let offset = DVec3::new(phi.cos(), phi.sin(), (phi * 0.5).cos()) * 0.2;
                    geometry
                        .add_sensor(storey, SensorSpec::cylindrical(pos + offset, 0.04, 0.001))
                        .unwrap();
                }
            }
        }
    }
    geometry.finalize().unwrap();
    geometry
}

fn bench_build_small(c: &mut Criterion) {
    let geometry = detector(4, 18);
    let config = IndexConfig::default();

    c.bench_function("build_index_288_storeys", |b| {
        b.iter(|| GeometryIndex::build(black_box(&geometry), &config).unwrap())
    });
}

fn bench_build_large(c: &mut Criterion) {
    let geometry = detector(10, 18);
    let config = IndexConfig::default();

    c.bench_function("build_index_1800_storeys", |b| {
        b.iter(|| GeometryIndex::build(black_box(&geometry), &config).unwrap())
    });
}

fn bench_ray_query(c: &mut Criterion) {
    let geometry = detector(10, 18);
    let index = GeometryIndex::build(&geometry, &IndexConfig::default()).unwrap();
    let direction = DVec3::new(1.0, 0.7, 0.2).normalize();

    c.bench_function("candidates_along_ray", |b| {
        b.iter(|| {
            index.candidates_along_ray(
                black_box(DVec3::new(-50.0, -20.0, 300.0)),
                black_box(direction),
                60.0,
            )
        })
    });
}

criterion_group!(benches, bench_build_small, bench_build_large, bench_ray_query);
criterion_main!(benches);

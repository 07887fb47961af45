//! Benchmarks for the per-pixel water mapping kernels

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tidemark_algorithms::imagery::{classify_water, median_composite, mndwi};
use tidemark_algorithms::vector::{polygonize, Connectivity};
use tidemark_core::{GeoTransform, Raster, CRS};

fn create_band(size: usize, base: f64, seed: usize) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(500_000.0, 9_210_000.0, 10.0, -10.0));
    r.set_crs(Some(CRS::utm(49, false)));
    for row in 0..size {
        for col in 0..size {
            let v = base + ((row * 7 + col * 13 + seed * 31) % 900) as f64;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn bench_mndwi(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/mndwi");
    for size in [256, 512, 1024] {
        let green = create_band(size, 600.0, 0);
        let swir = create_band(size, 500.0, 1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| mndwi(black_box(&green), black_box(&swir)).unwrap())
        });
    }
    group.finish();
}

fn bench_median_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/median_composite");
    for scenes in [4, 12, 24] {
        let stack: Vec<Raster<f64>> = (0..scenes).map(|s| create_band(512, 400.0, s)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(scenes), &scenes, |b, _| {
            b.iter(|| median_composite(black_box(&stack)).unwrap())
        });
    }
    group.finish();
}

fn bench_polygonize(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector/polygonize");
    for size in [128, 256, 512] {
        let index = mndwi(&create_band(size, 600.0, 0), &create_band(size, 500.0, 1)).unwrap();
        let classes = classify_water(&index, 0.0).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| polygonize(black_box(&classes), 1, Connectivity::Eight).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_mndwi, bench_median_composite, bench_polygonize);
criterion_main!(benches);

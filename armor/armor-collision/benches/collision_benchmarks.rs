//! Benchmarks for collision detection, resolution and smoothing.
//!
//! Run with: cargo bench -p armor-collision

#![allow(missing_docs, clippy::unwrap_used)]

use armor_collision::{
    CollisionParams, detect_collisions_with_index, resolve_collisions, smooth,
};
use armor_spatial::SpatialIndex;
use armor_types::{Point3, uv_sphere};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn bench_detect(c: &mut Criterion) {
    let body = uv_sphere(Point3::origin(), 1.0, 128, 64);
    let index = SpatialIndex::build(&body).unwrap();
    let params = CollisionParams::default();

    let mut group = c.benchmark_group("collision_detect");
    for &(segments, rings) in &[(32, 16), (64, 32), (128, 64)] {
        let armor = uv_sphere(Point3::origin(), 0.99, segments, rings);
        group.bench_with_input(
            BenchmarkId::from_parameter(armor.vertex_count()),
            &armor,
            |b, armor| {
                b.iter(|| detect_collisions_with_index(&index, black_box(armor), &params).unwrap());
            },
        );
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let body = uv_sphere(Point3::origin(), 1.0, 128, 64);
    let index = SpatialIndex::build(&body).unwrap();
    let params = CollisionParams::default();
    let armor = uv_sphere(Point3::origin(), 0.99, 64, 32);
    let hits = detect_collisions_with_index(&index, &armor, &params).unwrap();

    c.bench_function("collision_resolve", |b| {
        b.iter(|| {
            let mut mesh = armor.clone();
            resolve_collisions(&mut mesh, black_box(&hits), 3, &params).unwrap()
        });
    });
}

fn bench_smooth(c: &mut Criterion) {
    let armor = uv_sphere(Point3::origin(), 1.0, 128, 64);
    c.bench_function("laplacian_smooth", |b| {
        b.iter(|| {
            let mut mesh = armor.clone();
            smooth(&mut mesh, black_box(0.5))
        });
    });
}

criterion_group!(benches, bench_detect, bench_resolve, bench_smooth);
criterion_main!(benches);

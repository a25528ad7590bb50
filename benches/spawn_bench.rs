#![allow(dead_code)]

use archetype_ecs::Space;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[derive(Debug, Clone)]
struct Position(f32, f32, f32);

#[derive(Debug, Clone)]
struct Velocity(f32, f32, f32);

#[derive(Debug, Clone)]
struct Health(u32);

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_bench");

    group.bench_function("emplace_2_components", |b| {
        let mut space = Space::new();
        b.iter(|| {
            for _ in 0..1000 {
                let e = space.create_entity();
                space.emplace(e, Position(1.0, 2.0, 3.0)).unwrap();
                black_box(space.emplace(e, Velocity(1.0, 0.0, 0.0)).unwrap());
            }
        });
    });

    group.bench_function("emplace_3_components", |b| {
        let mut space = Space::new();
        b.iter(|| {
            for _ in 0..1000 {
                let e = space.create_entity();
                space.emplace(e, Position(1.0, 2.0, 3.0)).unwrap();
                space.emplace(e, Velocity(1.0, 0.0, 0.0)).unwrap();
                black_box(space.emplace(e, Health(100)).unwrap());
            }
        });
    });

    group.bench_function("update_iteration", |b| {
        let mut space = Space::new();
        for _ in 0..10_000 {
            let e = space.create_entity();
            space.emplace(e, Position(1.0, 2.0, 3.0)).unwrap();
            space.emplace(e, Velocity(1.0, 0.0, 0.0)).unwrap();
        }
        b.iter(|| {
            space.update::<(Position, Velocity), _>(|_, (pos, vel)| {
                pos.0 += vel.0;
                pos.1 += vel.1;
                pos.2 += vel.2;
            });
        });
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);

//! Benchmarks for cloth substeps and frame output.

use std::time::Duration;

use cloth_core::{Config, Simulation, SurfaceSource};
use criterion::{Criterion, criterion_group, criterion_main};

fn bench_substeps(c: &mut Criterion) {
    c.bench_function("cloth_32x32_100_substeps_serial", |b| {
        b.iter(|| {
            let mut sim = Simulation::new(Config::default().with_size(32)).unwrap();
            sim.step_substeps(100).unwrap();
            sim.kinetic_energy()
        });
    });
}

fn bench_substeps_parallel(c: &mut Criterion) {
    c.bench_function("cloth_64x64_100_substeps_chunk_4096", |b| {
        b.iter(|| {
            let cfg = Config::default().with_size(64).with_parallel_chunk_len(4096);
            let mut sim = Simulation::new(cfg).unwrap();
            sim.step_substeps(100).unwrap();
            sim.kinetic_energy()
        });
    });
}

fn bench_frame(c: &mut Criterion) {
    let mut sim = Simulation::new(Config::default().with_size(48)).unwrap();
    c.bench_function("cloth_48x48_frame_16ms", |b| {
        b.iter(|| {
            if sim.advance(Duration::from_millis(16)).is_err() {
                sim.reset().unwrap();
            }
            sim.normals()[0]
        });
    });
}

criterion_group!(benches, bench_substeps, bench_substeps_parallel, bench_frame);
criterion_main!(benches);

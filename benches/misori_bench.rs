//! Benchmarks for misorientation analysis

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use misori::prelude::*;
use nalgebra::DMatrix;

fn create_polycrystal(num_grains: usize, per_grain: usize, num_frames: usize) -> PolycrystalModel {
    let element_grain = (0..num_grains * per_grain).map(|e| e / per_grain + 1).collect();
    let mut model = PolycrystalModel::new(element_grain, num_grains, num_frames).unwrap();

    let ops = symmetry_operators(SymmetryFamily::Cubic);
    let oris = DMatrix::from_fn(num_grains * per_grain, num_frames + 1, |e, f| {
        let g = (e / per_grain) as f64;
        let scatter = 0.001 * f as f64 * (e % per_grain) as f64;
        ops[e % ops.len()].multiply(&Orientation::from_euler(0.3 * g + scatter, 0.7, 0.1 * g - scatter))
    });
    model.set_orientations(oris).unwrap();
    model
}

fn benchmark_average(c: &mut Criterion) {
    let oris: Vec<Orientation> = (0..50)
        .map(|i| Orientation::from_euler(0.4 + 0.001 * i as f64, 0.9, 1.3))
        .collect();
    let options = MisorientationOptions::cubic();
    c.bench_function("average_50_cubic", |b| {
        b.iter(|| black_box(average_of(&oris, SymmetryFamily::Cubic, &options).unwrap()))
    });
}

fn benchmark_small_mesh(c: &mut Criterion) {
    let model = create_polycrystal(20, 50, 5);
    c.bench_function("misori_20grains_50el_6frames", |b| {
        b.iter(|| {
            let mut model = model.clone();
            model
                .calc_misorientation(&FrameSelection::All, &MisorientationOptions::cubic(), &ProgressHandle::new())
                .unwrap();
            black_box(&model);
        })
    });
}

fn benchmark_sequential(c: &mut Criterion) {
    let model = create_polycrystal(20, 50, 5);
    let options = MisorientationOptions::cubic().sequential();
    c.bench_function("misori_20grains_50el_6frames_sequential", |b| {
        b.iter(|| {
            let mut model = model.clone();
            model
                .calc_misorientation(&FrameSelection::All, &options, &ProgressHandle::new())
                .unwrap();
            black_box(&model);
        })
    });
}

criterion_group!(benches, benchmark_average, benchmark_small_mesh, benchmark_sequential);

criterion_main!(benches);

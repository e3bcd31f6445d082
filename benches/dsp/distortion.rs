//! Benchmarks for the atan distortion unit.

use std::hint::black_box;

use adjsynth_dsp::dsp::distortion::{Distortion, DistortionParam};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sine-like values)
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        for (name, drive, range) in [("mild", 30, 10), ("hot", 100, 100)] {
            let mut dist = Distortion::new();
            dist.apply(DistortionParam::Enabled(true));
            dist.apply(DistortionParam::Drive(drive));
            dist.apply(DistortionParam::Range(range));
            dist.apply(DistortionParam::AutoGain(true));
            let mut buffer = input.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    dist.render(black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}

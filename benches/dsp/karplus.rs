//! Benchmarks for the plucked string.

use std::hint::black_box;

use adjsynth_dsp::dsp::karplus::{KarplusString, KsExcitation, KsParam};
use criterion::{BenchmarkId, Criterion};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_karplus(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/karplus");

    // Pluck cost alone: fills one period of excitation.
    for freq in [55.0, 440.0] {
        let mut string = KarplusString::new(SAMPLE_RATE);
        string.apply(KsParam::Excitation(KsExcitation::PinkNoise));
        string.set_frequency(freq);
        group.bench_with_input(BenchmarkId::new("pluck", freq as u32), &freq, |b, _| {
            b.iter(|| string.pluck())
        });
    }

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        let mut string = KarplusString::new(SAMPLE_RATE);
        string.set_frequency(110.0);
        string.pluck();
        group.bench_with_input(BenchmarkId::new("render", size), &size, |b, _| {
            b.iter(|| {
                string.render(black_box(&mut buffer));
                black_box(string.energy())
            })
        });
    }

    group.finish();
}

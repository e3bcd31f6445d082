//! Benchmarks for the MSO and PAD wavetables: offline generation and
//! per-voice playback.

use std::hint::black_box;
use std::sync::Arc;

use adjsynth_dsp::dsp::{
    mso::{MorphedSineOsc, MsoParam, MsoTable},
    pad::{generate, PadParams, PadQuality, PadReader},
};
use criterion::{BenchmarkId, Criterion};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_mso(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/mso");

    let points = [200, 600, 1024, 1100, 1500, 1900];
    group.bench_function("build_table", |b| {
        b.iter(|| MsoTable::new(black_box(points), black_box(0.4)))
    });

    let table = Arc::new(MsoTable::new(points, 0.4).expect("valid breakpoints"));
    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        let mut osc = MorphedSineOsc::new(SAMPLE_RATE, Arc::clone(&table));
        osc.set_frequency(220.0);
        osc.apply(MsoParam::Pwm(30));
        group.bench_with_input(BenchmarkId::new("render", size), &size, |b, _| {
            b.iter(|| osc.render(black_box(&mut buffer)))
        });
    }

    group.finish();
}

pub fn bench_pad(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/pad");
    group.sample_size(10);

    for quality in [PadQuality::K32, PadQuality::K256] {
        let params = PadParams {
            quality,
            ..PadParams::default()
        };
        group.bench_with_input(
            BenchmarkId::new("generate", quality.table_len()),
            &params,
            |b, params| b.iter(|| generate(black_box(params), SAMPLE_RATE)),
        );
    }

    let table = generate(&PadParams::default(), SAMPLE_RATE);
    for &size in BLOCK_SIZES {
        let mut reader = PadReader::new(SAMPLE_RATE, Arc::clone(&table));
        reader.set_frequency(330.0);
        group.bench_with_input(BenchmarkId::new("read", size), &size, |b, &size| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for _ in 0..size {
                    let (tap_a, tap_b) = reader.next_sample();
                    sum += tap_a + tap_b;
                }
                black_box(sum)
            })
        });
    }

    group.finish();
}

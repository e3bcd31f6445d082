//! Benchmarks for oscillator waveform generation.

use std::hint::black_box;

use adjsynth_dsp::dsp::oscillator::{OscParam, Oscillator, UnisonMode, Waveform};
use criterion::{BenchmarkId, Criterion};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn oscillator(waveform: Waveform) -> Oscillator {
    let mut osc = Oscillator::new(SAMPLE_RATE).with_waveform(waveform);
    osc.set_frequency(440.0);
    osc
}

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Asymmetric sine - two sin() branches
        let mut osc = oscillator(Waveform::Sine);
        group.bench_with_input(BenchmarkId::new("sine", size), &size, |b, _| {
            b.iter(|| osc.render(black_box(&mut buffer)))
        });

        // Pulse - branch per sample
        let mut osc = oscillator(Waveform::Pulse);
        osc.apply(OscParam::Pwm(30));
        group.bench_with_input(BenchmarkId::new("pulse", size), &size, |b, _| {
            b.iter(|| osc.render(black_box(&mut buffer)))
        });

        let mut osc = oscillator(Waveform::Triangle);
        group.bench_with_input(BenchmarkId::new("triangle", size), &size, |b, _| {
            b.iter(|| osc.render(black_box(&mut buffer)))
        });

        // Nine layers with drive: the worst case per voice
        let mut osc = oscillator(Waveform::Triangle);
        osc.apply(OscParam::UnisonMode(UnisonMode::Detune));
        for layer in 0..9 {
            osc.apply(OscParam::UnisonLevel { layer, level: 100 });
        }
        osc.apply(OscParam::UnisonDetune(40));
        osc.apply(OscParam::UnisonDistortion(50));
        group.bench_with_input(BenchmarkId::new("unison_9", size), &size, |b, _| {
            b.iter(|| osc.render(black_box(&mut buffer)))
        });
    }

    group.finish();
}

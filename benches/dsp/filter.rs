//! Benchmarks for state-variable filter.

use std::hint::black_box;

use adjsynth_dsp::dsp::filter::{FilterBand, FilterParam, SVFilter};
use criterion::{BenchmarkId, Criterion};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        for (name, band) in [
            ("lowpass", FilterBand::LowPass),
            ("highpass", FilterBand::HighPass),
            ("bandpass", FilterBand::BandPass),
        ] {
            let mut filter = SVFilter::new(SAMPLE_RATE).with_band(band);
            filter.apply(FilterParam::Frequency(50));
            filter.apply(FilterParam::Q(50));
            let mut buffer = input.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    filter.render(black_box(&mut buffer), black_box(0.0));
                })
            });
        }

        // Cutoff moves every sample: tan() is recomputed each time
        let mut filter = SVFilter::new(SAMPLE_RATE);
        filter.apply(FilterParam::Frequency(50));
        filter.apply(FilterParam::Octave(50));
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("swept", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let sweep = (i as f32 / size as f32) * 2.0 - 1.0;
                    *sample = filter.process(black_box(*sample), sweep);
                }
            })
        });
    }

    group.finish();
}

//! Benchmarks for ADSR envelope generator.
//!
//! Envelopes run at the control rate, so one block costs size / 8 ticks.

use std::hint::black_box;

use adjsynth_dsp::{dsp::envelope::Adsr, CONTROL_SUB_SAMPLING};
use criterion::{BenchmarkId, Criterion};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn run(env: &mut Adsr, ticks: usize) -> f32 {
    let mut last = 0.0;
    for _ in 0..ticks {
        last = env.tick();
    }
    last
}

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    let interval = CONTROL_SUB_SAMPLING as f32 / SAMPLE_RATE;

    for &size in BLOCK_SIZES {
        let ticks = size / CONTROL_SUB_SAMPLING;

        // Attack phase (ramping up)
        let mut env = Adsr::adsr(interval, 5.0, 0.1, 0.7, 0.3);
        env.note_on();
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| black_box(run(&mut env, ticks)))
        });

        // Sustain phase (holding steady)
        let mut env = Adsr::adsr(interval, 0.005, 0.005, 0.7, 0.3);
        env.note_on();
        run(&mut env, 200);
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| black_box(run(&mut env, ticks)))
        });

        // Five envelopes per voice
        let mut envs: Vec<Adsr> = (0..5).map(|_| Adsr::new(interval)).collect();
        envs.iter_mut().for_each(Adsr::note_on);
        group.bench_with_input(BenchmarkId::new("voice_set", size), &size, |b, _| {
            b.iter(|| {
                for env in envs.iter_mut() {
                    black_box(run(env, ticks));
                }
            })
        });
    }

    group.finish();
}

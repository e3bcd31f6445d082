//! Benchmarks for complete voices.
//!
//! From the single-oscillator default patch up to every source enabled with
//! modulation on every target.

use std::hint::black_box;
use std::sync::Arc;

use adjsynth_dsp::{
    dsp::{
        distortion::DistortionParam,
        lfo::LfoParam,
        mso::MsoTable,
        oscillator::{OscParam, UnisonMode},
        pad::{generate, PadParams},
    },
    synth::{
        default_patch,
        modulation::{EnvSelector, LfoDelay, LfoSelector, ModParam, ModTarget},
        Source, SourceParam, Voice, VoiceParam,
    },
    EngineConfig,
};
use criterion::{BenchmarkId, Criterion};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn voice(config: &EngineConfig, patch: &[VoiceParam]) -> Voice {
    let mut voice = Voice::new(
        0,
        config,
        Arc::new(MsoTable::sine()),
        generate(&PadParams::default(), config.sample_rate),
    );
    for &param in patch {
        voice.apply(param);
    }
    voice.set_frequency(110.0);
    voice.note_on();
    voice
}

/// Every source on, unison, both distortions and every modulation slot busy.
fn full_patch() -> Vec<VoiceParam> {
    let mut patch = default_patch();
    for source in Source::ALL {
        patch.push(VoiceParam::Source {
            source,
            param: SourceParam::Enabled(true),
        });
        patch.push(VoiceParam::Source {
            source,
            param: SourceParam::Send2(60),
        });
    }
    patch.push(VoiceParam::Osc2(OscParam::UnisonMode(UnisonMode::Detune)));
    for number in 1..=5 {
        patch.push(VoiceParam::Lfo {
            number,
            param: LfoParam::Rate(20 * number),
        });
    }
    for (i, target) in ModTarget::ALL.into_iter().enumerate() {
        let number = (i % 5) as u8 + 1;
        patch.push(VoiceParam::Modulation {
            target,
            param: ModParam::Lfo(LfoSelector::Lfo {
                number,
                delay: LfoDelay::None,
            }),
        });
        patch.push(VoiceParam::Modulation {
            target,
            param: ModParam::LfoDepth(30),
        });
        patch.push(VoiceParam::Modulation {
            target,
            param: ModParam::Env(EnvSelector::Adsr(number)),
        });
        patch.push(VoiceParam::Modulation {
            target,
            param: ModParam::EnvDepth(50),
        });
    }
    for param in [DistortionParam::Enabled(true), DistortionParam::Drive(40)] {
        patch.push(VoiceParam::Distortion1(param));
        patch.push(VoiceParam::Distortion2(param));
    }
    patch
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        let config = EngineConfig::new(SAMPLE_RATE, size);
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        // Baseline: oscillator 1 through filter 1 on ADSR 1
        let mut basic = voice(&config, &default_patch());
        group.bench_with_input(BenchmarkId::new("default_patch", size), &size, |b, _| {
            b.iter(|| black_box(basic.process(black_box(&mut left), black_box(&mut right))))
        });

        // Plucked string alone
        let string_patch = [
            VoiceParam::Source {
                source: Source::Osc1,
                param: SourceParam::Enabled(false),
            },
            VoiceParam::Source {
                source: Source::Karplus,
                param: SourceParam::Enabled(true),
            },
            VoiceParam::Source {
                source: Source::Karplus,
                param: SourceParam::Send1(100),
            },
        ];
        let mut string = voice(&config, &string_patch);
        group.bench_with_input(BenchmarkId::new("string", size), &size, |b, _| {
            b.iter(|| black_box(string.process(black_box(&mut left), black_box(&mut right))))
        });

        // Worst case
        let mut full = voice(&config, &full_patch());
        group.bench_with_input(BenchmarkId::new("full", size), &size, |b, _| {
            b.iter(|| black_box(full.process(black_box(&mut left), black_box(&mut right))))
        });
    }

    group.finish();
}

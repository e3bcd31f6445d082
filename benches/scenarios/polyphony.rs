//! Benchmarks for a whole synth rendering many held notes.

use std::collections::VecDeque;
use std::hint::black_box;
use std::sync::Arc;

use adjsynth_dsp::{
    dsp::{
        mso::MsoTable,
        pad::{generate, PadParams},
    },
    synth::{Synth, SynthMessage, VoiceEvent},
    EngineConfig,
};
use criterion::{BenchmarkId, Criterion};

use crate::SAMPLE_RATE;

const BLOCK: usize = 256;

pub fn bench_polyphony(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/polyphony");
    let pad = generate(&PadParams::default(), SAMPLE_RATE);

    for voices in [1usize, 8, 16, 32] {
        let config = EngineConfig::new(SAMPLE_RATE, BLOCK).with_polyphony(voices);
        let notes: VecDeque<SynthMessage> = (0..voices)
            .map(|i| SynthMessage::NoteOn {
                program: 0,
                note: 36 + i as u8,
            })
            .collect();
        let mut synth = Synth::with_tables(
            config,
            notes,
            Vec::<VoiceEvent>::new(),
            Arc::new(MsoTable::sine()),
            Arc::clone(&pad),
        );

        let mut left = vec![0.0f32; BLOCK];
        let mut right = vec![0.0f32; BLOCK];
        group.bench_with_input(BenchmarkId::new("held_notes", voices), &voices, |b, _| {
            b.iter(|| synth.render_block(black_box(&mut left), black_box(&mut right)))
        });
    }

    group.finish();
}

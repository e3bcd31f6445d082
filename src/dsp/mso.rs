use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::{pwm_to_symmetry, SYMMETRY_MAX, SYMMETRY_MIN};
use crate::dsp::pitch::Detune;
use crate::error::{Result, SynthError};

/*
Morphed-Sine Oscillator (MSO)
=============================

A single-cycle wavetable built from a sine that has been cut into quarters
and pulled apart. Six breakpoints a..f split the table into seven segments:

    0 ── a ── b ── c ── d ── e ── f ── len
      ↗    ──   ↘   ──   ↘    ──   ↗
     0→1  hold  1→0 hold 0→-1 hold -1→0

Odd segments (1st, 3rd, 5th, 7th) are quarter sines, even segments hold the
last value. Moving the breakpoints morphs the sine towards a square (long
holds at ±1), a pulse train (long holds at 0) or anything in between.

With the default points (512, 513, 1024, 1025, 1536, 1537) on 2048 samples
the holds are one sample long and the table is a plain sine.

Symmetry
--------

The table-level symmetry squeezes the first three points into the first
`symmetry * len` samples and stretches the last three over the rest. At 0.5
nothing moves.

The table is built once per program, off the audio thread, and shared by all
voices of that program through an Arc. Each voice reads it with its own
phase. Per-voice PWM warps the read phase instead of rebuilding the table:

    p < s:   read at 0.5 * p / s
    p >= s:  read at 0.5 + 0.5 * (p - s) / (1 - s)
*/

pub const MSO_TABLE_LENGTH: usize = 2048;
pub const MSO_DEFAULT_POINTS: [usize; 6] = [512, 513, 1024, 1025, 1536, 1537];

#[derive(Debug, Clone, PartialEq)]
pub struct MsoTable {
    samples: Vec<f32>,
    points: [usize; 6],
    symmetry: f32,
}

impl Default for MsoTable {
    fn default() -> Self {
        Self::sine()
    }
}

impl MsoTable {
    /// Build the table from six breakpoints and a symmetry in 0.05..0.95.
    pub fn new(points: [usize; 6], symmetry: f32) -> Result<Self> {
        let len = MSO_TABLE_LENGTH;
        let ordered = points.windows(2).all(|w| w[0] <= w[1]);
        if !ordered || points[5] > len - 1 {
            return Err(SynthError::InvalidBreakpoints { points, len });
        }

        let points = apply_symmetry(points, symmetry.clamp(SYMMETRY_MIN, SYMMETRY_MAX), len);
        let mut samples = vec![0.0; len];
        let edges = [
            0, points[0], points[1], points[2], points[3], points[4], points[5], len,
        ];

        for segment in 0..7 {
            let (start, end) = (edges[segment], edges[segment + 1]);
            let span = (end - start).max(1) as f32;
            for (i, sample) in samples[start..end].iter_mut().enumerate() {
                let quarter = FRAC_PI_2 * i as f32 / span;
                *sample = match segment {
                    0 => quarter.sin(),
                    1 => 1.0,
                    2 => quarter.cos(),
                    3 => 0.0,
                    4 => -quarter.sin(),
                    5 => -1.0,
                    _ => -quarter.cos(),
                };
            }
        }

        Ok(Self {
            samples,
            points,
            symmetry,
        })
    }

    /// The unmorphed sine table.
    pub fn sine() -> Self {
        let samples = (0..MSO_TABLE_LENGTH)
            .map(|i| (std::f32::consts::TAU * i as f32 / MSO_TABLE_LENGTH as f32).sin())
            .collect();
        Self {
            samples,
            points: MSO_DEFAULT_POINTS,
            symmetry: 0.5,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Breakpoints after symmetry.
    pub fn points(&self) -> [usize; 6] {
        self.points
    }

    pub fn symmetry(&self) -> f32 {
        self.symmetry
    }

    /// Lengths of the seven segments. They always sum to the table length.
    pub fn segment_lengths(&self) -> [usize; 7] {
        let p = self.points;
        [
            p[0],
            p[1] - p[0],
            p[2] - p[1],
            p[3] - p[2],
            p[4] - p[3],
            p[5] - p[4],
            self.samples.len() - p[5],
        ]
    }

    #[inline]
    fn read(&self, position: f32) -> f32 {
        let len = self.samples.len();
        let idx = position.floor();
        let frac = position - idx;
        let a = idx as usize % len;
        let b = (a + 1) % len;
        self.samples[a] + (self.samples[b] - self.samples[a]) * frac
    }
}

fn apply_symmetry(points: [usize; 6], symmetry: f32, len: usize) -> [usize; 6] {
    let half = len as f32 * 0.5;
    let split = symmetry * len as f32;
    let first = split / half;
    let second = (len as f32 - split) / half;
    let mut out = points;
    for (i, point) in out.iter_mut().enumerate() {
        let p = points[i] as f32;
        let moved = if i < 3 {
            p * first
        } else {
            split + (p - half) * second
        };
        *point = (moved.round().max(0.0) as usize).min(len - 1);
    }
    // Rounding must not reorder neighbours.
    for i in 1..6 {
        out[i] = out[i].max(out[i - 1]);
    }
    out
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MsoParam {
    Pwm(u8),
    Octave(i8),
    Semitone(i8),
    FineDetune(u8),
}

/// Per-voice reader of the program's shared MSO table.
#[derive(Debug, Clone)]
pub struct MorphedSineOsc {
    table: Arc<MsoTable>,
    sample_rate: f32,
    frequency: f32,
    phase: f32,
    pwm_percent: u8,
    symmetry: f32,
    detune: Detune,
}

impl MorphedSineOsc {
    pub fn new(sample_rate: f32, table: Arc<MsoTable>) -> Self {
        Self {
            table,
            sample_rate,
            frequency: 440.0,
            phase: 0.0,
            pwm_percent: 50,
            symmetry: 0.5,
            detune: Detune::default(),
        }
    }

    pub fn apply(&mut self, param: MsoParam) {
        match param {
            MsoParam::Pwm(value) => {
                self.pwm_percent = value.min(100);
                self.symmetry = pwm_to_symmetry(self.pwm_percent as f32 / 100.0);
            }
            MsoParam::Octave(octave) => self.detune.set_octave(octave),
            MsoParam::Semitone(semitone) => self.detune.set_semitone(semitone),
            MsoParam::FineDetune(value) => self.detune.set_fine(value),
        }
    }

    /// Swap in a new shared table. The old one is returned so the caller can
    /// hand it off for dropping elsewhere.
    pub fn set_table(&mut self, table: Arc<MsoTable>) -> Arc<MsoTable> {
        std::mem::replace(&mut self.table, table)
    }

    pub fn table(&self) -> &Arc<MsoTable> {
        &self.table
    }

    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency = hz.clamp(0.0, self.sample_rate * 0.5);
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn detune(&self) -> &Detune {
        &self.detune
    }

    pub fn pwm_percent(&self) -> u8 {
        self.pwm_percent
    }

    pub fn set_symmetry(&mut self, symmetry: f32) {
        self.symmetry = symmetry.clamp(SYMMETRY_MIN, SYMMETRY_MAX);
    }

    pub fn symmetry(&self) -> f32 {
        self.symmetry
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let s = self.symmetry;
        let warped = if self.phase < s {
            0.5 * self.phase / s
        } else {
            0.5 + 0.5 * (self.phase - s) / (1.0 - s)
        };
        let len = self.table.samples.len() as f32;
        let out = self.table.read(warped * len);

        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        out
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

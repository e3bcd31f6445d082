use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Instant;

use rustfft::{num_complex::Complex, FftPlanner};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::{
    pitch::{clamp_frequency, Detune},
    rng::Rng,
};
use crate::error::{Result, SynthError};
use crate::DEFAULT_SAMPLE_RATE;

/*
PAD Synthesizer
===============

PADsynth builds a long, seamlessly looping wavetable whose harmonics are not
single frequencies but bands of frequencies. Played back, it sounds like an
ensemble of slightly detuned instruments: a choir, strings, a pad.

Generation (offline, never on the audio thread)
-----------------------------------------------

1. Start with an empty amplitude spectrum of len/2 bins.
2. For each of the ten harmonics, add a bump (the "profile") centred on
   `base * n`. The bump width is the bandwidth in cents, widened for upper
   harmonics by the bandwidth scale:

       bw_hz = (2^(cents/1200) - 1) * base * n^scale

3. Give every bin a random phase. The phases come from a seeded PRNG so the
   same parameters always give the same table.
4. Inverse FFT, keep the real part, normalise the peak to 1.

Because the spectrum has no energy between bins, the result loops without a
click at the table boundary.

Profiles
--------

  Rectangular   flat across the bandwidth, hard edges
  Gaussian      classic bell curve
  DoubleExp     sharp peak, long tails

`cut_lower_half` drops the part of each bump below the harmonic, which gives
a brighter, more focused sound.

Playback
--------

The table holds its fundamental at `base_frequency`. A voice plays it back
faster or slower by stepping `frequency / base_frequency` samples per sample.
Two read taps half a table apart feed the two filter busses, and since the
phases are random they are decorrelated: free stereo width.
*/

pub const PAD_HARMONICS: usize = 10;
pub const PAD_MIN_LENGTH: usize = 1 << 15;
pub const PAD_MAX_LENGTH: usize = 1 << 20;
pub const PAD_MAX_BANDWIDTH_CENTS: f32 = 200.0;
const PAD_MIN_BANDWIDTH_CENTS: f32 = 1.0;
const PAD_MAX_BANDWIDTH_SCALE: f32 = 2.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadQuality {
    #[default]
    K32,
    K64,
    K128,
    K256,
    K512,
    K1024,
}

impl PadQuality {
    pub fn table_len(self) -> usize {
        match self {
            PadQuality::K32 => 1 << 15,
            PadQuality::K64 => 1 << 16,
            PadQuality::K128 => 1 << 17,
            PadQuality::K256 => 1 << 18,
            PadQuality::K512 => 1 << 19,
            PadQuality::K1024 => 1 << 20,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadShape {
    Rectangular,
    #[default]
    Gaussian,
    DoubleExp,
}

/// Everything that goes into one generated table.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PadParams {
    /// Pitch the table plays at without transposition. Clamped into the
    /// oscillator range when the table is built.
    pub base_frequency: f32,
    /// Harmonic levels, 0-100.
    pub harmonics: [u8; PAD_HARMONICS],
    pub shape: PadShape,
    pub cut_lower_half: bool,
    /// 0-100, mapped onto 1..PAD_MAX_BANDWIDTH_CENTS.
    pub bandwidth: u8,
    /// 0-100, mapped onto an exponent 0..2 on the harmonic number.
    pub bandwidth_scale: u8,
    pub quality: PadQuality,
    pub seed: u64,
}

impl Default for PadParams {
    fn default() -> Self {
        Self {
            base_frequency: 261.63,
            harmonics: [100, 70, 50, 35, 25, 18, 12, 8, 5, 3],
            shape: PadShape::Gaussian,
            cut_lower_half: false,
            bandwidth: 20,
            bandwidth_scale: 50,
            quality: PadQuality::K32,
            seed: 1,
        }
    }
}

impl PadParams {
    pub fn bandwidth_cents(&self) -> f32 {
        let t = self.bandwidth.min(100) as f32 / 100.0;
        PAD_MIN_BANDWIDTH_CENTS + (PAD_MAX_BANDWIDTH_CENTS - PAD_MIN_BANDWIDTH_CENTS) * t
    }

    pub fn bandwidth_exponent(&self) -> f32 {
        self.bandwidth_scale.min(100) as f32 / 100.0 * PAD_MAX_BANDWIDTH_SCALE
    }
}

/// An immutable PAD wavetable, shared between voices.
#[derive(Debug, Clone, PartialEq)]
pub struct PadTable {
    samples: Vec<f32>,
    base_frequency: f32,
    sample_rate: f32,
}

impl PadTable {
    /// Wrap precomputed samples. The length must be a power of two between
    /// 2^15 and 2^20. The base frequency is clamped into the oscillator
    /// range.
    pub fn from_samples(samples: Vec<f32>, base_frequency: f32, sample_rate: f32) -> Result<Self> {
        let len = samples.len();
        if !len.is_power_of_two() || !(PAD_MIN_LENGTH..=PAD_MAX_LENGTH).contains(&len) {
            return Err(SynthError::InvalidTableLength(len));
        }
        Ok(Self {
            samples,
            base_frequency: clamp_frequency(base_frequency),
            sample_rate: sanitize_rate(sample_rate),
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn base_frequency(&self) -> f32 {
        self.base_frequency
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[inline]
    fn read(&self, position: f64) -> f32 {
        // Length is a power of two.
        let mask = self.samples.len() - 1;
        let idx = position.floor();
        let frac = (position - idx) as f32;
        let a = idx as usize & mask;
        let b = (a + 1) & mask;
        self.samples[a] + (self.samples[b] - self.samples[a]) * frac
    }
}

fn sanitize_rate(sample_rate: f32) -> f32 {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        sample_rate
    } else {
        DEFAULT_SAMPLE_RATE
    }
}

/// Height of the profile `x` away from the harmonic centre, both in
/// normalised frequency.
fn profile(shape: PadShape, x: f32, bandwidth: f32, cut_lower_half: bool) -> f32 {
    if cut_lower_half && x < 0.0 {
        return 0.0;
    }
    let t = x / bandwidth;
    match shape {
        PadShape::Rectangular => {
            if t.abs() <= 0.5 {
                1.0 / bandwidth
            } else {
                0.0
            }
        }
        PadShape::Gaussian => (-t * t).exp() / bandwidth,
        PadShape::DoubleExp => (-2.0 * t.abs()).exp() / bandwidth,
    }
}

/// Profiles are negligible this many bandwidths away from their centre.
const PROFILE_REACH: f32 = 6.0;

/// Generate a PAD table. Heavy: run it on a worker thread.
pub fn generate(params: &PadParams, sample_rate: f32) -> Arc<PadTable> {
    let started = Instant::now();
    let base_frequency = clamp_frequency(params.base_frequency);
    let sample_rate = sanitize_rate(sample_rate);
    let len = params.quality.table_len();
    let half = len / 2;

    let mut amplitudes = vec![0.0f32; half];
    let cents = params.bandwidth_cents();
    let exponent = params.bandwidth_exponent();

    for (n, &level) in params.harmonics.iter().enumerate() {
        if level == 0 {
            continue;
        }
        let number = (n + 1) as f32;
        let level = level.min(100) as f32 / 100.0;
        let bandwidth_hz =
            (2.0_f32.powf(cents / 1200.0) - 1.0) * base_frequency * number.powf(exponent);
        let bandwidth = bandwidth_hz / (2.0 * sample_rate);
        let centre = base_frequency * number / sample_rate;

        let reach = (PROFILE_REACH * bandwidth * len as f32).ceil() as isize + 1;
        let centre_bin = (centre * len as f32).round() as isize;
        let first = (centre_bin - reach).max(1);
        let last = (centre_bin + reach).min(half as isize - 1);
        for bin in first..=last {
            let x = bin as f32 / len as f32 - centre;
            amplitudes[bin as usize] +=
                profile(params.shape, x, bandwidth, params.cut_lower_half) * level;
        }
    }

    let mut rng = Rng::with_seed(params.seed);
    let mut spectrum = vec![Complex::new(0.0f32, 0.0); len];
    for bin in 1..half {
        let phase = TAU * rng.unipolar();
        let value = Complex::from_polar(amplitudes[bin], phase);
        spectrum[bin] = value;
        spectrum[len - bin] = value.conj();
    }

    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(len);
    ifft.process(&mut spectrum);

    let mut samples: Vec<f32> = spectrum.iter().map(|c| c.re).collect();
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > 0.0 {
        for s in samples.iter_mut() {
            *s /= peak;
        }
    }

    log::debug!(
        "generated {} sample PAD table at {} Hz in {:?}",
        len,
        base_frequency,
        started.elapsed()
    );

    Arc::new(PadTable {
        samples,
        base_frequency,
        sample_rate,
    })
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadParam {
    Octave(i8),
    Semitone(i8),
    FineDetune(u8),
}

/// Per-voice player of the program's shared PAD table.
#[derive(Debug, Clone)]
pub struct PadReader {
    table: Arc<PadTable>,
    sample_rate: f32,
    frequency: f32,
    phase: f64,
    step: f64,
    detune: Detune,
}

impl PadReader {
    pub fn new(sample_rate: f32, table: Arc<PadTable>) -> Self {
        let mut reader = Self {
            table,
            sample_rate,
            frequency: 440.0,
            phase: 0.0,
            step: 0.0,
            detune: Detune::default(),
        };
        reader.update_step();
        reader
    }

    pub fn apply(&mut self, param: PadParam) {
        match param {
            PadParam::Octave(octave) => self.detune.set_octave(octave),
            PadParam::Semitone(semitone) => self.detune.set_semitone(semitone),
            PadParam::FineDetune(value) => self.detune.set_fine(value),
        }
    }

    pub fn detune(&self) -> &Detune {
        &self.detune
    }

    fn update_step(&mut self) {
        let table = &self.table;
        let step = (self.frequency / table.base_frequency) as f64
            * (table.sample_rate / self.sample_rate) as f64;
        // Stay on the current sample rather than let a bad ratio into the phase.
        self.step = if step.is_finite() { step } else { 0.0 };
    }

    pub fn set_frequency(&mut self, hz: f32) {
        if hz != self.frequency {
            self.frequency = hz;
            self.update_step();
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Swap in a new shared table, returning the previous one.
    pub fn set_table(&mut self, table: Arc<PadTable>) -> Arc<PadTable> {
        let old = std::mem::replace(&mut self.table, table);
        self.phase %= self.table.len() as f64;
        self.update_step();
        old
    }

    pub fn table(&self) -> &Arc<PadTable> {
        &self.table
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Two taps half a table apart.
    #[inline]
    pub fn next_sample(&mut self) -> (f32, f32) {
        let len = self.table.len() as f64;
        let a = self.table.read(self.phase);
        let b = self.table.read(self.phase + len * 0.5);
        self.phase += self.step;
        if self.phase >= len {
            self.phase -= len;
        }
        (a, b)
    }
}

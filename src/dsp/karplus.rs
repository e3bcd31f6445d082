use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::{noise::Noise, rng::Rng};
use crate::OSC_MIN_FREQUENCY;

/*
Karplus-Strong String
=====================

A plucked string from a delay line and a low-pass filter in a loop:

    excitation ──► [ delay L samples ] ──► out
                        ▲                   │
                        └── gain ◄─ lpf ◄───┘

On pluck, one period of an excitation signal (noise, a chirp, a saw ...) is
added to the delay line, on top of anything still ringing. Every pass around the loop the content is
smoothed by the two-tap filter and scaled by the loop gain, so the high
harmonics die first, just like on a real string.

  L = sample_rate / frequency - s

where s is the group delay of the loop filter. L is fractional and read with
linear interpolation, so the string stays in tune at high notes.

Loop filter
-----------

    y = (1 - s) * x[n - L] + s * x[n - L - 1]       s in [0, 0.5]

s = 0 keeps all harmonics, s = 0.5 is the classic averaging filter.

  Direct   s follows the damping setting.
  Magic    s is scaled by pitch so every note sounds equally damped:
               s = (1 - (1 - 2d)^(ref / freq)) / 2

Pluck damping is a one-pole low-pass over the excitation itself (a soft
finger versus a pick). Each damping value carries a variation that randomises
it per pluck.

Decay
-----

The loop gain g is picked so the content falls by 60 dB after the decay
time T:

    g = 0.001 ^ (1 / (T * frequency))        (one factor per pass)

Note-on uses the on-decay, note-off switches to the (usually shorter)
off-decay. `energy()` is the mean square of one loop period, tracked
incrementally and re-summed once per pass to stop rounding drift.
*/

const MAGIC_REFERENCE_HZ: f32 = 440.0;
const MAX_STRING_DAMPING: f32 = 0.5;
const MAX_PLUCK_DAMPING: f32 = 0.99;
const ON_DECAY_MIN: f32 = 0.05;
const ON_DECAY_MAX: f32 = 10.0;
const OFF_DECAY_MIN: f32 = 0.02;
const OFF_DECAY_MAX: f32 = 5.0;
const MINUS_60_DB: f32 = 0.001;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KsExcitation {
    #[default]
    WhiteNoise,
    PinkNoise,
    BrownNoise,
    Chirp,
    DecayedSine,
    Sawtooth,
    Square,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KsDampingMode {
    #[default]
    Direct,
    Magic,
}

/// Karplus-Strong parameters, percentages are 0-100.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KsParam {
    Excitation(KsExcitation),
    ExcitationVariation(u8),
    PluckDamping(u8),
    PluckDampingVariation(u8),
    StringDamping(u8),
    StringDampingVariation(u8),
    DampingMode(KsDampingMode),
    OnDecay(u8),
    OffDecay(u8),
}

fn percent(value: u8) -> f32 {
    value.min(100) as f32 / 100.0
}

fn decay_time(value: u8, min: f32, max: f32) -> f32 {
    min + (max - min) * percent(value)
}

fn loop_gain(decay_s: f32, frequency: f32) -> f32 {
    MINUS_60_DB.powf(1.0 / (decay_s * frequency).max(1e-3))
}

#[derive(Debug, Clone)]
pub struct KarplusString {
    sample_rate: f32,
    buffer: Vec<f32>,
    write_pos: usize,

    frequency: f32,
    delay: f32,
    period: usize,

    excitation: KsExcitation,
    excitation_variation: f32,
    pluck_damping: f32,
    pluck_damping_variation: f32,
    string_damping: f32,
    string_damping_variation: f32,
    damping_mode: KsDampingMode,
    on_decay_s: f32,
    off_decay_s: f32,

    loop_coeff: f32,
    gain: f32,
    off_gain: f32,

    energy_sum: f32,
    samples_since_resum: usize,
    /// Excitation of the current pluck, kept to avoid reallocating.
    scratch: Vec<f32>,

    rng: Rng,
    noise: Noise,
}

impl KarplusString {
    pub fn new(sample_rate: f32) -> Self {
        // The longest period plus the extra filter tap and interpolation.
        let capacity = (sample_rate / OSC_MIN_FREQUENCY).ceil() as usize + 4;
        Self {
            sample_rate,
            buffer: vec![0.0; capacity],
            write_pos: 0,
            frequency: 440.0,
            delay: sample_rate / 440.0,
            period: (sample_rate / 440.0).ceil() as usize,
            excitation: KsExcitation::WhiteNoise,
            excitation_variation: 0.0,
            pluck_damping: 0.0,
            pluck_damping_variation: 0.0,
            string_damping: MAX_STRING_DAMPING,
            string_damping_variation: 0.0,
            damping_mode: KsDampingMode::Direct,
            on_decay_s: decay_time(50, ON_DECAY_MIN, ON_DECAY_MAX),
            off_decay_s: decay_time(20, OFF_DECAY_MIN, OFF_DECAY_MAX),
            loop_coeff: MAX_STRING_DAMPING,
            gain: 0.0,
            off_gain: 0.0,
            energy_sum: 0.0,
            samples_since_resum: 0,
            scratch: Vec::with_capacity(capacity),
            rng: Rng::new(),
            noise: Noise::new(),
        }
    }

    pub fn apply(&mut self, param: KsParam) {
        match param {
            KsParam::Excitation(excitation) => self.excitation = excitation,
            KsParam::ExcitationVariation(v) => self.excitation_variation = percent(v),
            KsParam::PluckDamping(v) => self.pluck_damping = percent(v) * MAX_PLUCK_DAMPING,
            KsParam::PluckDampingVariation(v) => self.pluck_damping_variation = percent(v),
            KsParam::StringDamping(v) => self.string_damping = percent(v) * MAX_STRING_DAMPING,
            KsParam::StringDampingVariation(v) => self.string_damping_variation = percent(v),
            KsParam::DampingMode(mode) => self.damping_mode = mode,
            KsParam::OnDecay(v) => self.on_decay_s = decay_time(v, ON_DECAY_MIN, ON_DECAY_MAX),
            KsParam::OffDecay(v) => self.off_decay_s = decay_time(v, OFF_DECAY_MIN, OFF_DECAY_MAX),
        }
    }

    /// Takes effect at the next pluck.
    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency = hz.clamp(OSC_MIN_FREQUENCY, self.sample_rate * 0.5);
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn damping_mode(&self) -> KsDampingMode {
        self.damping_mode
    }

    /// Loop filter coefficient in use since the last pluck.
    pub fn loop_coefficient(&self) -> f32 {
        self.loop_coeff
    }

    fn varied(&mut self, value: f32, variation: f32, max: f32) -> f32 {
        (value * (1.0 + variation * self.rng.bipolar())).clamp(0.0, max)
    }

    fn excitation_sample(&mut self, index: usize, length: usize) -> f32 {
        let t = index as f32 / length as f32;
        match self.excitation {
            KsExcitation::WhiteNoise => self.rng.bipolar(),
            KsExcitation::PinkNoise => self.noise.get_next_pink_noise_val(),
            KsExcitation::BrownNoise => self.noise.get_next_brown_noise_val(),
            // Falling sweep, eight cycles per period down to one.
            KsExcitation::Chirp => (TAU * t * (8.0 - 3.5 * t)).sin(),
            KsExcitation::DecayedSine => (TAU * t).sin() * (-4.0 * t).exp(),
            KsExcitation::Sawtooth => 1.0 - 2.0 * t,
            KsExcitation::Square => {
                if t < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    /// Excite the loop at the current frequency. The excitation is added to
    /// whatever the string still holds, so a retrigger does not cut off a
    /// ringing note.
    pub fn pluck(&mut self) {
        let damping = self.varied(
            self.string_damping,
            self.string_damping_variation,
            MAX_STRING_DAMPING,
        );
        self.loop_coeff = match self.damping_mode {
            KsDampingMode::Direct => damping,
            KsDampingMode::Magic => {
                let base = (1.0 - 2.0 * damping).max(0.0);
                (1.0 - base.powf(MAGIC_REFERENCE_HZ / self.frequency)) * 0.5
            }
        };

        let max_delay = (self.buffer.len() - 3) as f32;
        self.delay = (self.sample_rate / self.frequency - self.loop_coeff).clamp(1.0, max_delay);
        self.period = (self.delay.ceil() as usize).max(1);
        self.gain = loop_gain(self.on_decay_s, self.frequency);
        self.off_gain = loop_gain(self.off_decay_s, self.frequency);

        let pluck_damping = self.varied(
            self.pluck_damping,
            self.pluck_damping_variation,
            MAX_PLUCK_DAMPING,
        );
        let noise_blend = self.excitation_variation * self.rng.unipolar();
        self.noise.reset();

        let mut excitation = std::mem::take(&mut self.scratch);
        excitation.clear();
        let mut smoothed = 0.0;
        let mut peak = 0.0f32;
        for i in 0..self.period {
            let shape = self.excitation_sample(i, self.period);
            let raw = shape * (1.0 - noise_blend) + self.rng.bipolar() * noise_blend;
            smoothed += (1.0 - pluck_damping) * (raw - smoothed);
            excitation.push(smoothed);
            peak = peak.max(smoothed.abs());
        }
        let scale = if peak > 0.0 { peak.recip() } else { 0.0 };

        // The period just written is what the read taps see next.
        let len = self.buffer.len();
        let start = self.write_pos + len - self.period;
        let mut combined_peak = 0.0f32;
        for (i, sample) in excitation.iter().enumerate() {
            let slot = &mut self.buffer[(start + i) % len];
            *slot += sample * scale;
            combined_peak = combined_peak.max(slot.abs());
        }
        if combined_peak > 1.0 {
            for i in 0..self.period {
                self.buffer[(start + i) % len] /= combined_peak;
            }
        }
        self.scratch = excitation;

        self.resum_energy();
    }

    /// Switch to the off-decay.
    pub fn release(&mut self) {
        self.gain = self.off_gain;
    }

    pub fn silence(&mut self) {
        self.buffer.fill(0.0);
        self.energy_sum = 0.0;
        self.gain = 0.0;
    }

    #[inline]
    fn read(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let whole = delay.floor();
        let frac = delay - whole;
        let idx_a = (self.write_pos + len - whole as usize) % len;
        let idx_b = (idx_a + len - 1) % len;
        self.buffer[idx_a] * (1.0 - frac) + self.buffer[idx_b] * frac
    }

    fn resum_energy(&mut self) {
        let len = self.buffer.len();
        self.energy_sum = (1..=self.period)
            .map(|back| {
                let v = self.buffer[(self.write_pos + len - back) % len];
                v * v
            })
            .sum();
        self.samples_since_resum = 0;
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let s = self.loop_coeff;
        let out = self.gain * ((1.0 - s) * self.read(self.delay) + s * self.read(self.delay + 1.0));

        let len = self.buffer.len();
        let leaving = self.buffer[(self.write_pos + len - self.period) % len];
        self.buffer[self.write_pos] = out;
        self.write_pos = (self.write_pos + 1) % len;

        self.energy_sum += out * out - leaving * leaving;
        self.samples_since_resum += 1;
        if self.samples_since_resum >= self.period {
            self.resum_energy();
        }

        out
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Mean square of one period of loop content.
    pub fn energy(&self) -> f32 {
        (self.energy_sum / self.period as f32).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn plucked(freq: f32) -> KarplusString {
        let mut string = KarplusString::new(SAMPLE_RATE);
        string.set_frequency(freq);
        string.pluck();
        string
    }

    #[test]
    fn pluck_fills_loop_with_energy() {
        let string = plucked(220.0);
        assert!(string.energy() > 0.01);
    }

    #[test]
    fn unplucked_string_is_silent() {
        let mut string = KarplusString::new(SAMPLE_RATE);
        for _ in 0..1_000 {
            assert_eq!(string.next_sample(), 0.0);
        }
        assert_eq!(string.energy(), 0.0);
    }

    #[test]
    fn energy_decays_after_pluck() {
        let mut string = plucked(220.0);
        let start = string.energy();
        for _ in 0..(SAMPLE_RATE as usize) {
            string.next_sample();
        }
        assert!(string.energy() < start * 0.5);
    }

    #[test]
    fn release_decays_faster() {
        let mut held = plucked(330.0);
        let mut released = plucked(330.0);
        released.release();
        for _ in 0..(SAMPLE_RATE as usize / 4) {
            held.next_sample();
            released.next_sample();
        }
        assert!(released.energy() < held.energy());
    }

    #[test]
    fn released_string_falls_below_silence_threshold() {
        let mut string = plucked(440.0);
        string.apply(KsParam::OffDecay(0));
        string.pluck();
        string.release();
        for _ in 0..(SAMPLE_RATE as usize) {
            string.next_sample();
        }
        assert!(string.energy() < 5e-6, "energy {}", string.energy());
    }

    #[test]
    fn incremental_energy_matches_resum() {
        let mut string = plucked(97.0);
        for _ in 0..123 {
            string.next_sample();
        }
        let tracked = string.energy();
        string.resum_energy();
        assert!((tracked - string.energy()).abs() < 1e-4);
    }

    #[test]
    fn output_is_bounded_for_every_excitation() {
        for excitation in [
            KsExcitation::WhiteNoise,
            KsExcitation::PinkNoise,
            KsExcitation::BrownNoise,
            KsExcitation::Chirp,
            KsExcitation::DecayedSine,
            KsExcitation::Sawtooth,
            KsExcitation::Square,
        ] {
            let mut string = KarplusString::new(SAMPLE_RATE);
            string.apply(KsParam::Excitation(excitation));
            string.apply(KsParam::ExcitationVariation(50));
            string.apply(KsParam::PluckDamping(30));
            string.set_frequency(110.0);
            string.pluck();
            for _ in 0..10_000 {
                let s = string.next_sample();
                assert!(s.is_finite() && s.abs() <= 1.0 + 1e-4, "{excitation:?}: {s}");
            }
        }
    }

    #[test]
    fn retrigger_adds_to_a_ringing_string() {
        let mut string = plucked(220.0);
        for _ in 0..2_000 {
            string.next_sample();
        }
        let len = string.buffer.len();
        // History older than the new excitation must survive the pluck.
        let older = (string.write_pos + len - string.period - 1) % len;
        let before = string.buffer[older];
        let tail = string.buffer.clone();
        assert!(before != 0.0);

        string.pluck();
        assert_eq!(string.buffer[older], before);
        let start = string.write_pos + len - string.period;
        let changed = (0..string.period)
            .filter(|i| string.buffer[(start + i) % len] != tail[(start + i) % len])
            .count();
        assert!(changed > string.period / 2);
        assert!(string.buffer.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn rapid_retriggers_stay_bounded() {
        let mut string = plucked(110.0);
        for _ in 0..50 {
            string.pluck();
            for _ in 0..64 {
                let s = string.next_sample();
                assert!(s.is_finite() && s.abs() <= 1.0 + 1e-4, "{s}");
            }
        }
    }

    #[test]
    fn magic_damping_is_lighter_for_high_notes() {
        let mut low = KarplusString::new(SAMPLE_RATE);
        low.apply(KsParam::DampingMode(KsDampingMode::Magic));
        low.apply(KsParam::StringDamping(40));
        low.set_frequency(110.0);
        low.pluck();

        let mut high = KarplusString::new(SAMPLE_RATE);
        high.apply(KsParam::DampingMode(KsDampingMode::Magic));
        high.apply(KsParam::StringDamping(40));
        high.set_frequency(1_760.0);
        high.pluck();

        assert!(high.loop_coefficient() < low.loop_coefficient());
    }

    #[test]
    fn loop_period_matches_pitch() {
        // Zero damping keeps the waveform intact, so the output repeats
        // once per period.
        let mut string = KarplusString::new(SAMPLE_RATE);
        string.apply(KsParam::StringDamping(0));
        string.apply(KsParam::OnDecay(100));
        string.apply(KsParam::Excitation(KsExcitation::Sawtooth));
        string.set_frequency(480.0);
        string.pluck();

        let out: Vec<f32> = (0..400).map(|_| string.next_sample()).collect();
        let period = 100;
        for i in 0..100 {
            assert!((out[i + period] - out[i] * string.gain).abs() < 1e-3);
        }
    }
}

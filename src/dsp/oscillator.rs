use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::{pitch::Detune, rng::Rng};

/*
Oscillator (VCO)
================

The oscillator is the primary pitched source of a voice. It produces one of
five waveforms, lets the waveform symmetry move (pulse-width modulation), can
be hard-synced to another oscillator and can stack up to nine layers of
itself (unison).

Waveforms
---------

Sine:        Pure tone. With symmetry != 0.5 the positive and negative half
             cycles get different lengths.
Square:      Fixed 50% duty cycle, odd harmonics only. Ignores symmetry.
Pulse:       Duty cycle follows the symmetry (5% .. 95%).
Triangle:    Peak position follows the symmetry.
Sample&Hold: A new random value at the start of every cycle, held until the
             next one. At LFO rates this is the classic "computer bleep".

The waveforms are naive (no band limiting). High notes alias.

Symmetry
--------

Phase runs 0 → 1 over one cycle. Symmetry `s` splits it in two parts:

    0 ────── s ────────────── 1
    first half   second half

Each half of the waveform is squeezed into its part. s = 0.5 is the textbook
waveform.

Hard Sync
---------

`cycle_restarted()` reports whether the last sample wrapped the phase. The
voice feeds that into `sync()` of a second oscillator, which restarts its
cycle immediately.

Unison
------

Nine layers, each at `frequency * ratio[layer]`, summed with per-layer levels
and normalised by the level sum. The ratio table depends on the mode:

    Detune    all layers at the fundamental, spread by the detune amount
    Octaves   0, +12, -12, +24, -24, ... semitones
    Major7    1 3 5 7 chord tones over two octaves
    Minor7    minor version of the above
    Hammond   organ drawbar footages 8' 16' 5⅓' 4' 2⅔' 2' 1⅗' 1⅓' 1'

The detune amount is spread over the non-fundamental layers in every mode.
An optional atan drive thickens the sum.
*/

pub const UNISON_LAYERS: usize = 9;
pub const SYMMETRY_MIN: f32 = 0.05;
pub const SYMMETRY_MAX: f32 = 0.95;
pub const UNISON_MAX_DETUNE_CENTS: f32 = 50.0;
const UNISON_MAX_DRIVE: f32 = 20.0;

// Layer 0 is always the fundamental.
const DETUNE_SPREAD: [f32; UNISON_LAYERS] = [0.0, -1.0, 1.0, -2.0, 2.0, -3.0, 3.0, -4.0, 4.0];
const OCTAVE_SEMITONES: [f32; UNISON_LAYERS] =
    [0.0, 12.0, -12.0, 24.0, -24.0, 36.0, -36.0, 48.0, -48.0];
const MAJOR7_SEMITONES: [f32; UNISON_LAYERS] = [0.0, 4.0, 7.0, 11.0, 12.0, 16.0, 19.0, 23.0, 24.0];
const MINOR7_SEMITONES: [f32; UNISON_LAYERS] = [0.0, 3.0, 7.0, 10.0, 12.0, 15.0, 19.0, 22.0, 24.0];
const HAMMOND_RATIOS: [f32; UNISON_LAYERS] = [1.0, 0.5, 1.5, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0];

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Pulse,
    Triangle,
    SampleHold,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnisonMode {
    #[default]
    Off,
    Detune,
    Octaves,
    Major7,
    Minor7,
    Hammond,
}

/// Settable oscillator parameters. Percentages are 0-100.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OscParam {
    Waveform(Waveform),
    Pwm(u8),
    Octave(i8),
    Semitone(i8),
    FineDetune(u8),
    UnisonMode(UnisonMode),
    UnisonLevel { layer: u8, level: u8 },
    UnisonDetune(u8),
    UnisonDistortion(u8),
    HardSync(bool),
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    sample_rate: f32,
    waveform: Waveform,
    frequency: f32,

    pwm_percent: u8,
    symmetry: f32,

    phases: [f32; UNISON_LAYERS],
    held: [f32; UNISON_LAYERS],
    ratios: [f32; UNISON_LAYERS],
    levels: [f32; UNISON_LAYERS],
    unison_mode: UnisonMode,
    unison_detune_cents: f32,
    unison_drive: f32,

    detune: Detune,
    hard_sync: bool,
    cycle_restarted: bool,
    rng: Rng,
}

fn percent(value: u8) -> f32 {
    value.min(100) as f32 / 100.0
}

/// Static symmetry for a 0-100 PWM setting, ±45% around the center.
#[inline]
pub fn pwm_to_symmetry(value: f32) -> f32 {
    SYMMETRY_MIN + (SYMMETRY_MAX - SYMMETRY_MIN) * value.clamp(0.0, 1.0)
}

impl Oscillator {
    pub fn new(sample_rate: f32) -> Self {
        let mut osc = Self {
            sample_rate,
            waveform: Waveform::Sine,
            frequency: 440.0,
            pwm_percent: 50,
            symmetry: 0.5,
            phases: [0.0; UNISON_LAYERS],
            held: [0.0; UNISON_LAYERS],
            ratios: [1.0; UNISON_LAYERS],
            levels: [1.0; UNISON_LAYERS],
            unison_mode: UnisonMode::Off,
            unison_detune_cents: 0.0,
            unison_drive: 0.0,
            detune: Detune::default(),
            hard_sync: false,
            cycle_restarted: false,
            rng: Rng::new(),
        };
        osc.update_ratios();
        osc
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn apply(&mut self, param: OscParam) {
        match param {
            OscParam::Waveform(waveform) => self.waveform = waveform,
            OscParam::Pwm(value) => self.set_pwm_percent(value),
            OscParam::Octave(octave) => self.detune.set_octave(octave),
            OscParam::Semitone(semitone) => self.detune.set_semitone(semitone),
            OscParam::FineDetune(value) => self.detune.set_fine(value),
            OscParam::UnisonMode(mode) => {
                self.unison_mode = mode;
                self.update_ratios();
            }
            OscParam::UnisonLevel { layer, level } => {
                if let Some(slot) = self.levels.get_mut(layer as usize) {
                    *slot = percent(level);
                }
            }
            OscParam::UnisonDetune(value) => {
                self.unison_detune_cents = percent(value) * UNISON_MAX_DETUNE_CENTS;
                self.update_ratios();
            }
            OscParam::UnisonDistortion(value) => {
                self.unison_drive = percent(value) * UNISON_MAX_DRIVE;
            }
            OscParam::HardSync(on) => self.hard_sync = on,
        }
    }

    fn update_ratios(&mut self) {
        for layer in 0..UNISON_LAYERS {
            let base = match self.unison_mode {
                UnisonMode::Off | UnisonMode::Detune => 1.0,
                UnisonMode::Octaves => semitones_to_ratio(OCTAVE_SEMITONES[layer]),
                UnisonMode::Major7 => semitones_to_ratio(MAJOR7_SEMITONES[layer]),
                UnisonMode::Minor7 => semitones_to_ratio(MINOR7_SEMITONES[layer]),
                UnisonMode::Hammond => HAMMOND_RATIOS[layer],
            };
            let spread_cents = DETUNE_SPREAD[layer] / 4.0 * self.unison_detune_cents;
            self.ratios[layer] = base * 2.0_f32.powf(spread_cents / 1200.0);
        }
    }

    /// Set the playing frequency in Hz. Must stay below Nyquist.
    #[inline]
    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency = hz.clamp(0.0, self.sample_rate * 0.5);
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_pwm_percent(&mut self, value: u8) {
        self.pwm_percent = value.min(100);
        self.symmetry = pwm_to_symmetry(percent(value));
    }

    pub fn pwm_percent(&self) -> u8 {
        self.pwm_percent
    }

    /// Current (possibly modulated) symmetry, 0.05 .. 0.95.
    #[inline]
    pub fn set_symmetry(&mut self, symmetry: f32) {
        self.symmetry = symmetry.clamp(SYMMETRY_MIN, SYMMETRY_MAX);
    }

    pub fn symmetry(&self) -> f32 {
        self.symmetry
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn detune(&self) -> &Detune {
        &self.detune
    }

    pub fn unison_mode(&self) -> UnisonMode {
        self.unison_mode
    }

    pub fn unison_ratio(&self, layer: usize) -> Option<f32> {
        self.ratios.get(layer).copied()
    }

    pub fn hard_sync(&self) -> bool {
        self.hard_sync
    }

    /// True if the last generated sample wrapped the fundamental's phase.
    pub fn cycle_restarted(&self) -> bool {
        self.cycle_restarted
    }

    /// Restart the cycle of every layer.
    pub fn sync(&mut self) {
        self.phases = [0.0; UNISON_LAYERS];
    }

    pub fn reset(&mut self) {
        self.sync();
        self.held = [0.0; UNISON_LAYERS];
        self.cycle_restarted = false;
    }

    #[inline]
    fn shape(&self, phase: f32, held: f32) -> f32 {
        let s = self.symmetry;
        match self.waveform {
            Waveform::Sine => {
                if phase < s {
                    (PI * phase / s).sin()
                } else {
                    -(PI * (phase - s) / (1.0 - s)).sin()
                }
            }
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Pulse => {
                if phase < s {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                if phase < s {
                    triangle_half(phase / s)
                } else {
                    -triangle_half((phase - s) / (1.0 - s))
                }
            }
            Waveform::SampleHold => held,
        }
    }

    /// Generate one sample in [-1, 1].
    pub fn next_sample(&mut self) -> f32 {
        self.cycle_restarted = false;

        let layers = if matches!(self.unison_mode, UnisonMode::Off) {
            1
        } else {
            UNISON_LAYERS
        };

        let nyquist_increment = 0.5;
        let mut sum = 0.0;
        let mut norm = 0.0;

        for layer in 0..layers {
            let increment = self.frequency * self.ratios[layer] / self.sample_rate;
            let level = if layers == 1 { 1.0 } else { self.levels[layer] };

            if level > 0.0 && increment < nyquist_increment {
                sum += self.shape(self.phases[layer], self.held[layer]) * level;
                norm += level;
            }

            let phase = &mut self.phases[layer];
            *phase += increment;
            if *phase >= 1.0 {
                *phase -= phase.floor();
                if layer == 0 {
                    self.cycle_restarted = true;
                }
                if matches!(self.waveform, Waveform::SampleHold) {
                    self.held[layer] = self.rng.bipolar();
                }
            }
        }

        if norm <= 0.0 {
            return 0.0;
        }
        let out = sum / norm;

        if self.unison_drive > 0.0 && layers > 1 {
            let drive = 1.0 + self.unison_drive;
            (out * drive).atan() / drive.atan()
        } else {
            out
        }
    }

    /// Fill the buffer with oscillator output.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

#[inline]
fn semitones_to_ratio(semitones: f32) -> f32 {
    2.0_f32.powf(semitones / 12.0)
}

// 0 → 1 → 0 over t in [0, 1)
#[inline]
fn triangle_half(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t
    } else {
        2.0 - 2.0 * t
    }
}

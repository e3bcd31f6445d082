//! Engine-wide configuration.
//!
//! Every value is sanitised on the way in: an unsupported sample rate or block
//! size falls back to the default instead of failing, and the fallback is
//! reported through `log`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CONTROL_SUB_SAMPLING, DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, MAX_BLOCK_SIZE};

pub const SUPPORTED_SAMPLE_RATES: [f32; 6] =
    [22_050.0, 44_100.0, 48_000.0, 88_200.0, 96_000.0, 192_000.0];

pub const DEFAULT_POLYPHONY: usize = 16;
pub const MAX_POLYPHONY: usize = 64;
pub const DEFAULT_PROGRAMS: usize = 1;
pub const MAX_PROGRAMS: usize = 16;

/// How PWM modulation reaches the oscillator symmetry.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PwmModulationMode {
    /// Only a positive combined modulation moves the symmetry; zero or
    /// negative modulation leaves the static value in place. Matches the
    /// audio output of earlier releases.
    #[default]
    Legacy,
    /// Modulation moves the symmetry in both directions.
    Symmetric,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub block_size: usize,
    pub polyphony: usize,
    pub programs: usize,
    pub pwm_modulation: PwmModulationMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            polyphony: DEFAULT_POLYPHONY,
            programs: DEFAULT_PROGRAMS,
            pwm_modulation: PwmModulationMode::Legacy,
        }
    }
}

impl EngineConfig {
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self::default()
            .with_sample_rate(sample_rate)
            .with_block_size(block_size)
    }

    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        if SUPPORTED_SAMPLE_RATES.contains(&sample_rate) {
            self.sample_rate = sample_rate;
        } else {
            log::warn!(
                "unsupported sample rate {sample_rate} Hz, falling back to {DEFAULT_SAMPLE_RATE} Hz"
            );
            self.sample_rate = DEFAULT_SAMPLE_RATE;
        }
        self
    }

    /// Block size must be a power of two, a multiple of the control
    /// sub-sampling factor and at most `MAX_BLOCK_SIZE`.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        if block_size.is_power_of_two()
            && block_size >= CONTROL_SUB_SAMPLING
            && block_size <= MAX_BLOCK_SIZE
        {
            self.block_size = block_size;
        } else {
            log::warn!(
                "unsupported block size {block_size}, falling back to {DEFAULT_BLOCK_SIZE}"
            );
            self.block_size = DEFAULT_BLOCK_SIZE;
        }
        self
    }

    pub fn with_polyphony(mut self, voices: usize) -> Self {
        self.polyphony = voices.clamp(1, MAX_POLYPHONY);
        self
    }

    pub fn with_programs(mut self, programs: usize) -> Self {
        self.programs = programs.clamp(1, MAX_PROGRAMS);
        self
    }

    pub fn with_pwm_modulation(mut self, mode: PwmModulationMode) -> Self {
        self.pwm_modulation = mode;
        self
    }

    /// Rate at which LFOs and envelopes are advanced.
    pub fn control_rate(&self) -> f32 {
        self.sample_rate / CONTROL_SUB_SAMPLING as f32
    }

    /// Seconds between two control ticks.
    pub fn control_interval(&self) -> f32 {
        CONTROL_SUB_SAMPLING as f32 / self.sample_rate
    }
}

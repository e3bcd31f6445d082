//! Distortion / Waveshaping
//!
//! Distortion adds harmonics by reshaping the waveform. The "drive" parameter
//! controls how aggressively the signal is pushed into the nonlinear region.
//!
//! # How Waveshaping Works
//!
//! A waveshaper applies a transfer function to each sample:
//!   output = f(input * gain)
//!
//! When the gain is low the signal stays in the linear region of f() and
//! passes through mostly unchanged. As the gain increases, the signal hits
//! the nonlinear parts of f(), creating harmonic distortion.
//!
//! # The Transfer Function
//!
//! This unit uses a scaled arctangent:
//!   f(x) = (2 / π) * atan(x)
//!   - Smooth, warm saturation
//!   - Output never leaves -1..1
//!   - Tends to a square wave as the gain grows
//!
//! The gain is `drive * range`. Drive (0..1) also sets the dry/wet blend, so
//! turning it up both pushes harder and brings in more of the shaped signal:
//!
//!   out = drive * f(in * drive * range) + (1 - drive) * in
//!
//! # Auto Gain
//!
//! A heavily driven atan sits near ±1 almost all the time and sounds much
//! louder than the clean input. With auto gain on, the wet term is divided
//! by 4 once `drive * range` exceeds 4.

use std::f32::consts::FRAC_2_PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DISTORTION_MIN_RANGE: f32 = 1.0;
pub const DISTORTION_MAX_RANGE: f32 = 100.0;
const AUTO_GAIN_THRESHOLD: f32 = 4.0;
const AUTO_GAIN_DIVISOR: f32 = 4.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistortionParam {
    Enabled(bool),
    Drive(u8),
    Range(u8),
    AutoGain(bool),
}

/// Arctangent soft clip, output in -1..1.
#[inline]
pub fn atan_clip(sample: f32, gain: f32) -> f32 {
    FRAC_2_PI * (sample * gain).atan()
}

#[derive(Debug, Clone)]
pub struct Distortion {
    enabled: bool,
    drive: f32,
    range: f32,
    auto_gain: bool,
}

impl Default for Distortion {
    fn default() -> Self {
        Self {
            enabled: false,
            drive: 0.0,
            range: DISTORTION_MIN_RANGE,
            auto_gain: false,
        }
    }
}

impl Distortion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, param: DistortionParam) {
        match param {
            DistortionParam::Enabled(on) => self.enabled = on,
            DistortionParam::Drive(value) => self.drive = value.min(100) as f32 / 100.0,
            DistortionParam::Range(value) => {
                let t = value.min(100) as f32 / 100.0;
                self.range =
                    DISTORTION_MIN_RANGE + (DISTORTION_MAX_RANGE - DISTORTION_MIN_RANGE) * t;
            }
            DistortionParam::AutoGain(on) => self.auto_gain = on,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    /// Shape one sample. Disabled units pass the input through.
    #[inline]
    pub fn process(&self, sample: f32) -> f32 {
        if !self.enabled {
            return sample;
        }
        let gain = self.drive * self.range;
        let mut wet = self.drive * atan_clip(sample, gain);
        if self.auto_gain && gain > AUTO_GAIN_THRESHOLD {
            wet /= AUTO_GAIN_DIVISOR;
        }
        wet + (1.0 - self.drive) * sample
    }

    /// Apply distortion to an entire buffer in place.
    pub fn render(&self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}

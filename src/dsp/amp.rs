//! Stereo output amplifier.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Stereo Amplifier
================

The last stage of a voice. It takes the two filter channels, scales each by
its own gain and places each in the stereo field with its own pan.

Vocabulary
----------

  gain    A multiplier applied to amplitude.
            gain = 1.0  →  unchanged (unity gain)
            gain < 1.0  →  quieter (attenuation)
            gain = 0.0  →  silence

  pan     Position in the stereo field, -1.0 (hard left) .. +1.0 (hard
          right). 0.0 is centre.


The Math
--------

    L = (in1 × g1 × (1 - pan1) + in2 × g2 × (1 - pan2)) × 0.2
    R = (in1 × g1 × (1 + pan1) + in2 × g2 × (1 + pan2)) × 0.2

A hard-panned channel lands at twice the level on one side and nothing on
the other. The fixed 0.2 leaves headroom for many voices summed on the bus:
×0.2 is about -14 dB.

Pan modulation (LFO or envelope) is added to the static pan and the sum is
clamped back into -1..1, so an LFO sweeping a hard-panned channel sits at the
edge for half its cycle.
*/

pub const AMP_OUTPUT_SCALE: f32 = 0.2;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmpParam {
    /// 0-100.
    Gain1(u8),
    /// 0-100, 50 is centre.
    Pan1(u8),
    Gain2(u8),
    Pan2(u8),
}

fn pan_from_percent(value: u8) -> f32 {
    (value.min(100) as f32 - 50.0) / 50.0
}

#[derive(Debug, Clone)]
pub struct Amp {
    gain: [f32; 2],
    pan: [f32; 2],
}

impl Default for Amp {
    fn default() -> Self {
        Self {
            gain: [0.5, 0.5],
            pan: [0.0, 0.0],
        }
    }
}

impl Amp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, param: AmpParam) {
        match param {
            AmpParam::Gain1(value) => self.gain[0] = value.min(100) as f32 / 100.0,
            AmpParam::Pan1(value) => self.pan[0] = pan_from_percent(value),
            AmpParam::Gain2(value) => self.gain[1] = value.min(100) as f32 / 100.0,
            AmpParam::Pan2(value) => self.pan[1] = pan_from_percent(value),
        }
    }

    pub fn gain(&self, channel: usize) -> f32 {
        self.gain.get(channel).copied().unwrap_or_default()
    }

    /// Static pan of a channel, -1..1.
    pub fn pan(&self, channel: usize) -> f32 {
        self.pan.get(channel).copied().unwrap_or_default()
    }

    /// Static pan plus modulation, clamped.
    #[inline]
    pub fn modulated_pan(&self, channel: usize, modulation: f32) -> f32 {
        (self.pan(channel) + modulation).clamp(-1.0, 1.0)
    }

    /// Mix the two filter channels into a stereo pair.
    #[inline]
    pub fn process(&self, in1: f32, in2: f32, pan_mod1: f32, pan_mod2: f32) -> (f32, f32) {
        let pan1 = self.modulated_pan(0, pan_mod1);
        let pan2 = self.modulated_pan(1, pan_mod2);
        let a = in1 * self.gain[0];
        let b = in2 * self.gain[1];

        let left = (a * (1.0 - pan1) + b * (1.0 - pan2)) * AMP_OUTPUT_SCALE;
        let right = (a * (1.0 + pan1) + b * (1.0 + pan2)) * AMP_OUTPUT_SCALE;
        (left, right)
    }
}

//! Typed parameter changes delivered to a voice.
//!
//! Values arrive already range-checked in their 0-100 (or enum) domain; each
//! component scales them into physical units itself.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::{
    amp::AmpParam, distortion::DistortionParam, envelope::AdsrParam, filter::FilterParam,
    karplus::KsParam, lfo::LfoParam, mso::MsoParam, noise::NoiseParam, oscillator::OscParam,
    pad::PadParam,
};
use crate::synth::modulation::{EnvSelector, ModParam, ModTarget};

/// Sound sources that feed the two filter busses.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Osc1,
    Osc2,
    Noise,
    Karplus,
    Mso,
    Pad,
}

impl Source {
    pub const COUNT: usize = 6;

    pub const ALL: [Source; Self::COUNT] = [
        Source::Osc1,
        Source::Osc2,
        Source::Noise,
        Source::Karplus,
        Source::Mso,
        Source::Pad,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Modulation target scaling this source's amplitude, if any.
    pub fn amp_target(self) -> Option<ModTarget> {
        match self {
            Source::Osc1 => Some(ModTarget::Osc1Amp),
            Source::Osc2 => Some(ModTarget::Osc2Amp),
            Source::Noise => Some(ModTarget::NoiseAmp),
            Source::Karplus => None,
            Source::Mso => Some(ModTarget::MsoAmp),
            Source::Pad => Some(ModTarget::PadAmp),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceParam {
    Enabled(bool),
    Send1(u8),
    Send2(u8),
}

/// Enable flag and filter-bus send levels of one source.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SourceBus {
    pub enabled: bool,
    pub send_1: f32,
    pub send_2: f32,
}

impl SourceBus {
    pub fn apply(&mut self, param: SourceParam) {
        match param {
            SourceParam::Enabled(on) => self.enabled = on,
            SourceParam::Send1(value) => self.send_1 = value.min(100) as f32 / 100.0,
            SourceParam::Send2(value) => self.send_2 = value.min(100) as f32 / 100.0,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceParam {
    Source { source: Source, param: SourceParam },
    Osc1(OscParam),
    Osc2(OscParam),
    Noise(NoiseParam),
    Karplus(KsParam),
    Mso(MsoParam),
    Pad(PadParam),
    Filter1(FilterParam),
    Filter2(FilterParam),
    Distortion1(DistortionParam),
    Distortion2(DistortionParam),
    Amp(AmpParam),
    /// `number` is 1..=5.
    Lfo { number: u8, param: LfoParam },
    /// `number` is 1..=5.
    Adsr { number: u8, param: AdsrParam },
    Modulation { target: ModTarget, param: ModParam },
}

/// A playable starting point: oscillator 1 through an open low-pass filter,
/// amplitude on ADSR 1.
pub fn default_patch() -> Vec<VoiceParam> {
    vec![
        VoiceParam::Source {
            source: Source::Osc1,
            param: SourceParam::Enabled(true),
        },
        VoiceParam::Source {
            source: Source::Osc1,
            param: SourceParam::Send1(100),
        },
        VoiceParam::Filter1(FilterParam::Frequency(100)),
        VoiceParam::Amp(AmpParam::Gain1(100)),
        VoiceParam::Amp(AmpParam::Pan1(50)),
        VoiceParam::Adsr {
            number: 1,
            param: AdsrParam::Attack(1),
        },
        VoiceParam::Adsr {
            number: 1,
            param: AdsrParam::Decay(20),
        },
        VoiceParam::Adsr {
            number: 1,
            param: AdsrParam::Sustain(70),
        },
        VoiceParam::Adsr {
            number: 1,
            param: AdsrParam::Release(5),
        },
        VoiceParam::Modulation {
            target: ModTarget::Osc1Amp,
            param: ModParam::Env(EnvSelector::Adsr(1)),
        },
        VoiceParam::Modulation {
            target: ModTarget::Osc1Amp,
            param: ModParam::EnvDepth(100),
        },
    ]
}

//! Modulation routing: which LFO and envelope drive which target, and how
//! their values combine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::PwmModulationMode;
use crate::dsp::lfo::bipolar_to_unipolar;
use crate::dsp::oscillator::pwm_to_symmetry;
use crate::{NUM_OF_ADSRS, NUM_OF_LFOS};

/*
Modulation Routing
==================

Every modulation target of a voice owns one slot. A slot picks at most one
LFO and at most one ADSR, each with its own depth:

    slot ─┬─ LFO n  × lfo_depth ──┐
          └─ ADSR m × env_depth ──┴─→ combine ─→ target

How the two contributions combine depends on the kind of target.

Additive (frequency, PWM, filter cutoff, pan)
---------------------------------------------

    value = clamp(lfo * lfo_depth + adsr * env_depth, -1, 1)

Frequency targets turn the value into octaves (1.4 per octave), filters into
their octave range, pan adds it to the static pan.

Multiplicative (amplitude)
--------------------------

Amplitude can only be attenuated, never inverted, so each contribution is a
factor in 0..1 where 1 means "leave alone":

    lfo_mod = 1 - lfo_depth * (1 - (lfo + 1) / 2)
    env_mod = 1 - env_depth * (1 - adsr)
    amp     = lfo_mod * env_mod

An unselected source contributes 1.

LFO Delay
---------

An LFO can be selected with a delay of 0, 500, 1000, 1500 or 2000 ms. Until
the delay has elapsed the LFO contributes nothing. The clock is the slot's
own ADSR (ADSR 1 if the slot selects none), counted in control ticks since
its last note-on, so the delay restarts with every note.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModTarget {
    Osc1Freq,
    Osc1Pwm,
    Osc1Amp,
    Osc2Freq,
    Osc2Pwm,
    Osc2Amp,
    MsoFreq,
    MsoPwm,
    MsoAmp,
    PadFreq,
    PadAmp,
    NoiseAmp,
    Filter1Freq,
    Filter2Freq,
    Amp1Pan,
    Amp2Pan,
}

impl ModTarget {
    pub const COUNT: usize = 16;

    pub const ALL: [ModTarget; Self::COUNT] = [
        ModTarget::Osc1Freq,
        ModTarget::Osc1Pwm,
        ModTarget::Osc1Amp,
        ModTarget::Osc2Freq,
        ModTarget::Osc2Pwm,
        ModTarget::Osc2Amp,
        ModTarget::MsoFreq,
        ModTarget::MsoPwm,
        ModTarget::MsoAmp,
        ModTarget::PadFreq,
        ModTarget::PadAmp,
        ModTarget::NoiseAmp,
        ModTarget::Filter1Freq,
        ModTarget::Filter2Freq,
        ModTarget::Amp1Pan,
        ModTarget::Amp2Pan,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_amplitude(self) -> bool {
        matches!(
            self,
            ModTarget::Osc1Amp
                | ModTarget::Osc2Amp
                | ModTarget::MsoAmp
                | ModTarget::PadAmp
                | ModTarget::NoiseAmp
        )
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoDelay {
    #[default]
    None,
    Ms500,
    Ms1000,
    Ms1500,
    Ms2000,
}

impl LfoDelay {
    pub fn millis(self) -> u32 {
        match self {
            LfoDelay::None => 0,
            LfoDelay::Ms500 => 500,
            LfoDelay::Ms1000 => 1000,
            LfoDelay::Ms1500 => 1500,
            LfoDelay::Ms2000 => 2000,
        }
    }

    /// Delay in control ticks at `control_rate` ticks per second.
    pub fn ticks(self, control_rate: f32) -> u32 {
        (self.millis() as f32 / 1000.0 * control_rate).round() as u32
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoSelector {
    #[default]
    None,
    /// LFO 1..=5.
    Lfo { number: u8, delay: LfoDelay },
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvSelector {
    #[default]
    None,
    /// ADSR 1..=5.
    Adsr(u8),
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModParam {
    Lfo(LfoSelector),
    LfoDepth(u8),
    Env(EnvSelector),
    EnvDepth(u8),
}

/// Modulation source values of one voice, sampled once per control tick.
#[derive(Debug, Clone, Copy)]
pub struct ModSources {
    pub lfo: [f32; NUM_OF_LFOS],
    pub adsr: [f32; NUM_OF_ADSRS],
    pub adsr_ticks: [u32; NUM_OF_ADSRS],
    pub control_rate: f32,
}

impl Default for ModSources {
    fn default() -> Self {
        Self {
            lfo: [0.0; NUM_OF_LFOS],
            adsr: [0.0; NUM_OF_ADSRS],
            adsr_ticks: [0; NUM_OF_ADSRS],
            control_rate: 0.0,
        }
    }
}

/// The two factors of an amplitude target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmpMod {
    pub lfo: f32,
    pub env: f32,
}

impl AmpMod {
    pub const UNITY: AmpMod = AmpMod { lfo: 1.0, env: 1.0 };

    #[inline]
    pub fn factor(self) -> f32 {
        self.lfo * self.env
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModSlot {
    pub lfo: LfoSelector,
    pub lfo_depth: f32,
    pub env: EnvSelector,
    pub env_depth: f32,
}

impl ModSlot {
    pub fn apply(&mut self, param: ModParam) {
        match param {
            ModParam::Lfo(selector) => self.lfo = selector,
            ModParam::LfoDepth(value) => self.lfo_depth = value.min(100) as f32 / 100.0,
            ModParam::Env(selector) => self.env = selector,
            ModParam::EnvDepth(value) => self.env_depth = value.min(100) as f32 / 100.0,
        }
    }

    /// Index of the ADSR whose note-on clock gates the LFO delay.
    fn delay_clock(&self) -> usize {
        match self.env {
            EnvSelector::Adsr(number) => number_to_index(number, NUM_OF_ADSRS).unwrap_or(0),
            EnvSelector::None => 0,
        }
    }

    /// Bipolar LFO value, or `None` if no LFO is selected or its delay has
    /// not elapsed yet.
    #[inline]
    pub fn lfo_value(&self, sources: &ModSources) -> Option<f32> {
        match self.lfo {
            LfoSelector::None => None,
            LfoSelector::Lfo { number, delay } => {
                let elapsed = sources.adsr_ticks[self.delay_clock()];
                if elapsed < delay.ticks(sources.control_rate) {
                    return None;
                }
                number_to_index(number, NUM_OF_LFOS).map(|index| sources.lfo[index])
            }
        }
    }

    /// Envelope value 0..1, or `None` if no ADSR is selected.
    #[inline]
    pub fn env_value(&self, sources: &ModSources) -> Option<f32> {
        match self.env {
            EnvSelector::None => None,
            EnvSelector::Adsr(number) => {
                number_to_index(number, NUM_OF_ADSRS).map(|index| sources.adsr[index])
            }
        }
    }

    /// Combined value for frequency, PWM, filter and pan targets.
    #[inline]
    pub fn additive(&self, sources: &ModSources) -> f32 {
        let lfo = self.lfo_value(sources).unwrap_or(0.0) * self.lfo_depth;
        let env = self.env_value(sources).unwrap_or(0.0) * self.env_depth;
        (lfo + env).clamp(-1.0, 1.0)
    }

    /// Factors for amplitude targets.
    #[inline]
    pub fn amplitude(&self, sources: &ModSources) -> AmpMod {
        let lfo = self
            .lfo_value(sources)
            .map_or(1.0, |v| 1.0 - self.lfo_depth * (1.0 - bipolar_to_unipolar(v)));
        let env = self
            .env_value(sources)
            .map_or(1.0, |v| 1.0 - self.env_depth * (1.0 - v));
        AmpMod { lfo, env }
    }
}

/// LFO and ADSR numbers are 1-based. Numbers outside 1..=count select
/// nothing.
#[inline]
pub(crate) fn number_to_index(number: u8, count: usize) -> Option<usize> {
    let index = (number as usize).checked_sub(1)?;
    (index < count).then_some(index)
}

/// Oscillator symmetry for a static PWM setting plus combined modulation.
#[inline]
pub fn modulated_symmetry(pwm_percent: u8, modulation: f32, mode: PwmModulationMode) -> f32 {
    let base = pwm_percent.min(100) as f32 / 100.0;
    match mode {
        PwmModulationMode::Legacy if modulation > 0.0 => pwm_to_symmetry(base + modulation),
        PwmModulationMode::Legacy => pwm_to_symmetry(base),
        PwmModulationMode::Symmetric => pwm_to_symmetry(base + modulation),
    }
}

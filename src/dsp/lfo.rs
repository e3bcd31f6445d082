//! Low Frequency Oscillators.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::{OscParam, Oscillator, Waveform};

/*
Low Frequency Oscillators
=========================

An LFO is simply an oscillator running at sub-audio frequencies. The same
waveform math applies, so `Lfo` wraps the audio `Oscillator` and runs it at
the control rate (sample_rate / CONTROL_SUB_SAMPLING) instead of the audio
rate. One LFO sample is produced per control tick.

Vocabulary
----------

  control-rate    The rate modulation is recomputed at. Much cheaper than
                  audio rate and plenty for movements below ~20 Hz.

  bipolar         Output swings positive AND negative: -1.0 to +1.0. This is
                  what the LFO produces and what pitch, PWM, filter and pan
                  modulation consume.

  unipolar        Output is only positive: 0.0 to 1.0. Amplitude modulation
                  needs this (a tremolo attenuates, it never inverts).
                  Convert: unipolar = (bipolar + 1.0) / 2.0


Rate Mapping
------------

The 0-100 rate slider maps exponentially onto LFO_MIN_FREQUENCY ..
LFO_MAX_FREQUENCY, so each step of the slider is the same musical ratio:

    0    0.1 Hz   (10 second cycle)
    50   ~1.4 Hz
    100  20 Hz    (edge of audio rate)


Free-running
------------

Voice LFOs are free-running: a note-on does not reset their phase. Two notes
played in a row catch the LFO at different points of its cycle.
*/

pub const LFO_MIN_FREQUENCY: f32 = 0.1;
pub const LFO_MAX_FREQUENCY: f32 = 20.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LfoParam {
    Waveform(Waveform),
    Rate(u8),
    Pwm(u8),
}

/// Convert bipolar signal (-1.0 to +1.0) to unipolar (0.0 to 1.0).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

/// Exponential 0-100 → Hz mapping.
pub fn rate_to_frequency(value: u8) -> f32 {
    let t = value.min(100) as f32 / 100.0;
    LFO_MIN_FREQUENCY * (LFO_MAX_FREQUENCY / LFO_MIN_FREQUENCY).powf(t)
}

#[derive(Debug, Clone)]
pub struct Lfo {
    osc: Oscillator,
    output: f32,
}

impl Lfo {
    /// `control_rate` is the rate `tick()` is called at.
    pub fn new(control_rate: f32) -> Self {
        let mut osc = Oscillator::new(control_rate);
        osc.set_frequency(rate_to_frequency(30));
        Self { osc, output: 0.0 }
    }

    pub fn apply(&mut self, param: LfoParam) {
        match param {
            LfoParam::Waveform(waveform) => self.osc.apply(OscParam::Waveform(waveform)),
            LfoParam::Rate(value) => self.osc.set_frequency(rate_to_frequency(value)),
            LfoParam::Pwm(value) => self.osc.set_pwm_percent(value),
        }
    }

    pub fn frequency(&self) -> f32 {
        self.osc.frequency()
    }

    pub fn waveform(&self) -> Waveform {
        self.osc.waveform()
    }

    /// Advance one control tick, returns the bipolar output.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        self.output = self.osc.next_sample();
        self.output
    }

    /// Last output, -1.0 .. 1.0.
    pub fn output(&self) -> f32 {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROL_RATE: f32 = 6_000.0;

    #[test]
    fn bipolar_maps_onto_unipolar() {
        assert!((bipolar_to_unipolar(-1.0) - 0.0).abs() < 1e-6);
        assert!((bipolar_to_unipolar(0.0) - 0.5).abs() < 1e-6);
        assert!((bipolar_to_unipolar(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rate_mapping_covers_range() {
        assert!((rate_to_frequency(0) - LFO_MIN_FREQUENCY).abs() < 1e-6);
        assert!((rate_to_frequency(100) - LFO_MAX_FREQUENCY).abs() < 1e-3);
        assert!(rate_to_frequency(40) < rate_to_frequency(41));
    }

    #[test]
    fn lfo_output_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Pulse,
            Waveform::Triangle,
            Waveform::SampleHold,
        ] {
            let mut lfo = Lfo::new(CONTROL_RATE);
            lfo.apply(LfoParam::Waveform(waveform));
            lfo.apply(LfoParam::Rate(100));
            for _ in 0..10_000 {
                let sample = lfo.tick();
                assert!(
                    (-1.0..=1.0).contains(&sample),
                    "LFO {waveform:?} sample {sample} out of range"
                );
            }
        }
    }

    #[test]
    fn lfo_completes_cycles_at_control_rate() {
        let mut lfo = Lfo::new(CONTROL_RATE);
        lfo.apply(LfoParam::Waveform(Waveform::Square));
        lfo.apply(LfoParam::Rate(100)); // 20 Hz

        // One second of control ticks holds 20 cycles, 40 sign changes.
        let mut previous = lfo.tick();
        let mut changes = 0;
        for _ in 1..CONTROL_RATE as usize {
            let value = lfo.tick();
            if value.signum() != previous.signum() {
                changes += 1;
            }
            previous = value;
        }
        assert!((changes as i32 - 40).abs() <= 1, "changes = {changes}");
    }
}

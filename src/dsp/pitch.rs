//! Pitch helpers shared by every pitched source.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{OSC_MAX_FREQUENCY, OSC_MIN_FREQUENCY};

pub const OCTAVE_MIN: i8 = -2;
pub const OCTAVE_MAX: i8 = 5;
pub const SEMITONE_MIN: i8 = 0;
pub const SEMITONE_MAX: i8 = 11;

/// Fine detune span at either end of the 0-100 slider, in percent of the
/// frequency. 6% is roughly one semitone.
pub const FINE_DETUNE_RANGE_PERCENT: f32 = 6.0;

/// One octave of frequency modulation needs this much modulation value.
pub const FREQ_MOD_PER_OCTAVE: f32 = 1.4;

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Clamp a frequency to the range a voice can play.
#[inline]
pub fn clamp_frequency(hz: f32) -> f32 {
    if hz.is_nan() {
        return OSC_MIN_FREQUENCY;
    }
    hz.clamp(OSC_MIN_FREQUENCY, OSC_MAX_FREQUENCY)
}

/// Octave, semitone and fine tuning of a source relative to the voice pitch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detune {
    octave: i8,
    semitone: i8,
    fine_percent: f32,
}

impl Default for Detune {
    fn default() -> Self {
        Self {
            octave: 0,
            semitone: 0,
            fine_percent: 0.0,
        }
    }
}

impl Detune {
    pub fn set_octave(&mut self, octave: i8) {
        self.octave = octave.clamp(OCTAVE_MIN, OCTAVE_MAX);
    }

    pub fn set_semitone(&mut self, semitone: i8) {
        self.semitone = semitone.clamp(SEMITONE_MIN, SEMITONE_MAX);
    }

    /// 0-100 slider, 50 is in tune.
    pub fn set_fine(&mut self, value: u8) {
        let centered = (value.min(100) as f32 - 50.0) / 50.0;
        self.fine_percent = centered * FINE_DETUNE_RANGE_PERCENT;
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    pub fn semitone(&self) -> i8 {
        self.semitone
    }

    pub fn fine_percent(&self) -> f32 {
        self.fine_percent
    }

    /// `2^(octave + semitone/12 + freq_mod/1.4) * (1 + fine%/100)`
    #[inline]
    pub fn factor(&self, freq_mod: f32) -> f32 {
        let exponent =
            self.octave as f32 + self.semitone as f32 / 12.0 + freq_mod / FREQ_MOD_PER_OCTAVE;
        2.0_f32.powf(exponent) * (1.0 + self.fine_percent / 100.0)
    }

    /// Detuned and modulated frequency, clamped to the playable range.
    #[inline]
    pub fn apply(&self, base_hz: f32, freq_mod: f32) -> f32 {
        clamp_frequency(base_hz * self.factor(freq_mod))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_detune_is_unity() {
        let detune = Detune::default();
        assert!((detune.factor(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn octave_and_semitone_compose() {
        let mut detune = Detune::default();
        detune.set_octave(1);
        detune.set_semitone(7);
        let expected = 2.0_f32.powf(1.0 + 7.0 / 12.0);
        assert!((detune.factor(0.0) - expected).abs() < 1e-5);
    }

    #[test]
    fn fine_detune_centered_at_fifty() {
        let mut detune = Detune::default();
        detune.set_fine(50);
        assert_eq!(detune.fine_percent(), 0.0);
        detune.set_fine(100);
        assert!((detune.factor(0.0) - 1.06).abs() < 1e-6);
    }

    #[test]
    fn modulation_of_one_point_four_is_one_octave() {
        let detune = Detune::default();
        assert!((detune.factor(1.4) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn apply_clamps_to_playable_range() {
        let mut detune = Detune::default();
        detune.set_octave(OCTAVE_MAX);
        assert_eq!(detune.apply(8_000.0, 1.0), OSC_MAX_FREQUENCY);
        assert_eq!(clamp_frequency(1.0), OSC_MIN_FREQUENCY);
    }

    #[test]
    fn midi_note_69_is_a440() {
        assert!((midi_note_to_freq(69) - 440.0).abs() < 1e-3);
        assert!((midi_note_to_freq(81) - 880.0).abs() < 1e-2);
    }
}

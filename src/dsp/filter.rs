use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| band      | passes          | rejects      |
| --------- | --------------- | ------------ |
| low-pass  | below cutoff    | above cutoff |
| high-pass | above cutoff    | below cutoff |
| band-pass | around cutoff   | both sides   |
| all       | everything      | nothing      |

"All" hands the input through untouched but still runs the integrators, so
switching back to a real band mid-note picks up from live state.

Cutoff
------

The 0-100 frequency control maps exponentially from 20 Hz up to
min(0.45 * sample_rate, 20 kHz). Every sample the voice can push the cutoff
up or down by `modulation * octave_range` octaves (modulation in -1..1,
octave range 0..6), and keyboard tracking scales it by how far the note is
from middle C:

    cutoff = base * 2^(mod * octaves) * (note / middle_c)^tracking

The TPT coefficient needs a tan(), so it is only recomputed when the cutoff
actually changes.
*/

pub const FILTER_MIN_CUTOFF: f32 = 20.0;
pub const FILTER_MAX_CUTOFF: f32 = 20_000.0;
pub const FILTER_MAX_OCTAVES: f32 = 6.0;
pub const FILTER_MAX_RESONANCE: f32 = 0.98;
const MIDDLE_C: f32 = 261.63;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterBand {
    #[default]
    LowPass,
    HighPass,
    BandPass,
    All,
}

/// Settable filter parameters, percentages are 0-100.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterParam {
    Frequency(u8),
    Octave(u8),
    Q(u8),
    Band(FilterBand),
    KeyboardTracking(u8),
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
}

#[derive(Debug, Clone)]
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    sample_rate: f32,
    max_cutoff: f32,

    base_cutoff_hz: f32,
    octave_range: f32,
    resonance: f32,
    band: FilterBand,
    keyboard_tracking: f32,
    note_frequency: f32,

    cached_cutoff: f32,
    g: f32,
}

fn percent(value: u8) -> f32 {
    value.min(100) as f32 / 100.0
}

impl SVFilter {
    pub fn new(sample_rate: f32) -> Self {
        let max_cutoff = (0.45 * sample_rate).min(FILTER_MAX_CUTOFF);
        let mut filter = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            sample_rate,
            max_cutoff,
            base_cutoff_hz: max_cutoff,
            octave_range: 0.0,
            resonance: 0.0,
            band: FilterBand::LowPass,
            keyboard_tracking: 0.0,
            note_frequency: MIDDLE_C,
            cached_cutoff: 0.0,
            g: 0.0,
        };
        filter.update_coefficient(max_cutoff);
        filter
    }

    pub fn with_band(mut self, band: FilterBand) -> Self {
        self.band = band;
        self
    }

    pub fn apply(&mut self, param: FilterParam) {
        match param {
            FilterParam::Frequency(value) => self.base_cutoff_hz = self.cutoff_from_percent(value),
            FilterParam::Octave(value) => self.octave_range = percent(value) * FILTER_MAX_OCTAVES,
            FilterParam::Q(value) => self.resonance = percent(value) * FILTER_MAX_RESONANCE,
            FilterParam::Band(band) => self.band = band,
            FilterParam::KeyboardTracking(value) => self.keyboard_tracking = percent(value),
        }
    }

    /// Exponential 0-100 → Hz map.
    pub fn cutoff_from_percent(&self, value: u8) -> f32 {
        FILTER_MIN_CUTOFF * (self.max_cutoff / FILTER_MIN_CUTOFF).powf(percent(value))
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.base_cutoff_hz = cutoff_hz.clamp(FILTER_MIN_CUTOFF, self.max_cutoff);
    }

    pub fn cutoff(&self) -> f32 {
        self.base_cutoff_hz
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance.clamp(0.0, FILTER_MAX_RESONANCE);
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    pub fn band(&self) -> FilterBand {
        self.band
    }

    /// Frequency of the note being played, for keyboard tracking.
    pub fn set_note_frequency(&mut self, hz: f32) {
        self.note_frequency = hz.max(FILTER_MIN_CUTOFF);
    }

    /// Cutoff in Hz after modulation and keyboard tracking.
    #[inline]
    pub fn effective_cutoff(&self, freq_mod: f32) -> f32 {
        let mut cutoff = self.base_cutoff_hz;
        if self.octave_range > 0.0 && freq_mod != 0.0 {
            cutoff *= 2.0_f32.powf(freq_mod * self.octave_range);
        }
        if self.keyboard_tracking > 0.0 {
            cutoff *= (self.note_frequency / MIDDLE_C).powf(self.keyboard_tracking);
        }
        cutoff.clamp(FILTER_MIN_CUTOFF, self.max_cutoff)
    }

    #[inline]
    fn update_coefficient(&mut self, cutoff: f32) {
        if cutoff != self.cached_cutoff {
            self.cached_cutoff = cutoff;
            self.g = (PI * cutoff / self.sample_rate).tan();
        }
    }

    pub fn next_sample(&mut self, sample: f32, k: f32, g: f32) -> FilterOutputs {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
        }
    }

    /// Filter one sample, `freq_mod` in -1..1.
    #[inline]
    pub fn process(&mut self, sample: f32, freq_mod: f32) -> f32 {
        let cutoff = self.effective_cutoff(freq_mod);
        self.update_coefficient(cutoff);
        let k = 2.0 - (2.0 * self.resonance);
        let outputs = self.next_sample(sample, k, self.g);

        match self.band {
            FilterBand::LowPass => outputs.lowpass,
            FilterBand::HighPass => outputs.highpass,
            FilterBand::BandPass => outputs.bandpass,
            FilterBand::All => sample,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], freq_mod: f32) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample, freq_mod);
        }
    }

    /// Both integrators hold less than `floor`.
    pub fn is_settled(&self, floor: f32) -> bool {
        self.ic1eq.abs() < floor && self.ic2eq.abs() < floor
    }

    pub fn clear(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::Oscillator;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        let skip = buffer.len().min(32);
        buffer
            .get(skip..)
            .unwrap_or(buffer)
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set_frequency(freq);
        let mut buffer = vec![0.0f32; len];
        osc.render(&mut buffer);
        buffer
    }

    fn filter(band: FilterBand, cutoff: f32) -> SVFilter {
        let mut filter = SVFilter::new(SAMPLE_RATE).with_band(band);
        filter.set_cutoff(cutoff);
        filter
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut filter = filter(FilterBand::LowPass, 500.0);
        let mut buffer = vec![1.0; 128];

        filter.render(&mut buffer, 0.0);

        assert!(buffer[127] > 0.99);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut filter = filter(FilterBand::HighPass, 500.0);
        let mut buffer = vec![1.0; 128];

        filter.render(&mut buffer, 0.0);

        assert!(buffer[127] < 0.001);
    }

    #[test]
    fn lowpass_attenuates_high_frequencies() {
        let mut filter = filter(FilterBand::LowPass, 500.0);
        let mut buffer = sine(5_000.0, 128); // 10x cutoff

        filter.render(&mut buffer, 0.0);

        // After filtering, high freq should be attenuated by ~12dB/octave (≈3.3x reduction)
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        assert!(
            peak < 0.3,
            "Expected high freq attenuation, got peak: {}",
            peak
        );
    }

    #[test]
    fn bandpass_emphasizes_cutoff_frequency() {
        let mut filter = filter(FilterBand::BandPass, 1_000.0);
        filter.set_resonance(0.5);

        let mut pass_buffer = sine(1_000.0, 512);
        filter.render(&mut pass_buffer, 0.0);
        let pass_peak = peak_after_transient(&pass_buffer);

        filter.clear();
        let mut off_buffer = sine(200.0, 512);
        filter.render(&mut off_buffer, 0.0);
        let off_peak = peak_after_transient(&off_buffer);

        assert!(
            pass_peak > off_peak * 2.0,
            "expected bandpass to emphasize cutoff freq, got pass_peak={}, off_peak={}",
            pass_peak,
            off_peak
        );
    }

    #[test]
    fn all_band_passes_input_through() {
        let mut filter = filter(FilterBand::All, 200.0);
        let input = sine(3_000.0, 256);
        let mut buffer = input.clone();
        filter.render(&mut buffer, 0.7);
        assert_eq!(buffer, input);
    }

    #[test]
    fn raising_cutoff_passes_more_signal() {
        let mut filter = filter(FilterBand::LowPass, 200.0);
        let mut buffer1 = sine(1_000.0, 256);
        filter.render(&mut buffer1, 0.0);
        let peak_low_cutoff = peak_after_transient(&buffer1);

        // Raise cutoff to well above test frequency (should pass 1kHz)
        filter.clear();
        filter.set_cutoff(5_000.0);
        let mut buffer2 = sine(1_000.0, 256);
        filter.render(&mut buffer2, 0.0);
        let peak_high_cutoff = peak_after_transient(&buffer2);

        assert!(
            peak_high_cutoff > peak_low_cutoff * 2.0,
            "High cutoff should pass more signal: high={}, low={}",
            peak_high_cutoff,
            peak_low_cutoff
        );
    }

    #[test]
    fn resonance_boosts_the_cutoff_peak() {
        let mut filter = filter(FilterBand::LowPass, 1_000.0);
        filter.apply(FilterParam::Q(10));
        let mut buffer1 = sine(1_000.0, 512);
        filter.render(&mut buffer1, 0.0);
        let peak_low_res = peak_after_transient(&buffer1);

        filter.clear();
        filter.apply(FilterParam::Q(80));
        let mut buffer2 = sine(1_000.0, 512);
        filter.render(&mut buffer2, 0.0);
        let peak_high_res = peak_after_transient(&buffer2);

        assert!(
            peak_high_res > peak_low_res * 1.2,
            "High resonance should boost signal: high_res={}, low_res={}",
            peak_high_res,
            peak_low_res
        );
    }

    #[test]
    fn resonant_ring_settles_and_clears() {
        let mut filter = filter(FilterBand::LowPass, 150.0);
        filter.apply(FilterParam::Q(100));
        let mut buffer = sine(150.0, 2_048);
        filter.render(&mut buffer, 0.0);
        assert!(!filter.is_settled(1.0e-5));

        // No input: the ring decays on its own.
        let mut silence = vec![0.0f32; SAMPLE_RATE as usize * 3];
        filter.render(&mut silence, 0.0);
        assert!(filter.is_settled(1.0e-5));

        filter.process(1.0, 0.0);
        filter.clear();
        assert!(filter.is_settled(f32::MIN_POSITIVE));
    }

    #[test]
    fn frequency_control_is_exponential() {
        let filter = SVFilter::new(SAMPLE_RATE);
        assert!((filter.cutoff_from_percent(0) - FILTER_MIN_CUTOFF).abs() < 1e-3);
        assert!((filter.cutoff_from_percent(100) - FILTER_MAX_CUTOFF).abs() < 1.0);
        let mid = filter.cutoff_from_percent(50);
        assert!((mid - (20.0f32 * 20_000.0).sqrt()).abs() < 1.0);
    }

    #[test]
    fn max_cutoff_stays_below_nyquist() {
        let filter = SVFilter::new(22_050.0);
        assert!(filter.cutoff_from_percent(100) <= 0.45 * 22_050.0 + 1e-3);
    }

    #[test]
    fn modulation_moves_cutoff_by_octaves() {
        let mut filter = filter(FilterBand::LowPass, 1_000.0);
        filter.apply(FilterParam::Octave(50)); // 3 octaves
        assert!((filter.effective_cutoff(1.0) - 8_000.0).abs() < 1.0);
        assert!((filter.effective_cutoff(-1.0) - 125.0).abs() < 0.1);
        assert!((filter.effective_cutoff(0.0) - 1_000.0).abs() < 1e-3);
    }

    #[test]
    fn keyboard_tracking_follows_the_note() {
        let mut filter = filter(FilterBand::LowPass, 1_000.0);
        filter.apply(FilterParam::KeyboardTracking(100));
        filter.set_note_frequency(MIDDLE_C * 2.0);
        assert!((filter.effective_cutoff(0.0) - 2_000.0).abs() < 0.1);
    }

    #[test]
    fn coefficient_only_recomputed_on_change() {
        let mut filter = filter(FilterBand::LowPass, 1_000.0);
        filter.process(0.5, 0.0);
        let g = filter.g;
        assert_eq!(filter.cached_cutoff, 1_000.0);
        filter.process(0.5, 0.0);
        assert_eq!(filter.g, g);
        filter.set_cutoff(2_000.0);
        filter.process(0.5, 0.0);
        assert!(filter.g > g);
    }
}

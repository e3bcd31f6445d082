#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::rng::Rng;

/*
Noise
=====

Three colours of noise, all derived from one white source.

  white   Uniform values in [-1, 1). Equal energy per Hz: bright hiss.

  pink    -3 dB per octave. Equal energy per octave, which is how the ear
          hears "even" noise. Built with Paul Kellet's refined filter: seven
          one-pole sections (b0..b6) summed. The coefficients below are the
          published ones, do not round them.

  brown   -6 dB per octave. A leaky integrator of white noise:

              out = (last + 0.02 * white) / 1.02

          The leak keeps it from drifting off to infinity.

Both coloured outputs get a fixed make-up gain (pink × 0.11, brown × 3.5) so
the three colours play at similar loudness.
*/

const PINK_GAIN: f32 = 0.11;
const BROWN_GAIN: f32 = 3.5;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseColor {
    #[default]
    White,
    Pink,
    Brown,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseParam {
    Color(NoiseColor),
}

#[derive(Debug, Clone, Default)]
struct PinkState {
    b: [f32; 7],
}

impl PinkState {
    #[inline]
    fn next(&mut self, white: f32) -> f32 {
        let b = &mut self.b;
        b[0] = 0.99886 * b[0] + white * 0.0555179;
        b[1] = 0.99332 * b[1] + white * 0.0750759;
        b[2] = 0.96900 * b[2] + white * 0.1538520;
        b[3] = 0.86650 * b[3] + white * 0.3104856;
        b[4] = 0.55000 * b[4] + white * 0.5329522;
        b[5] = -0.7616 * b[5] - white * 0.0168980;
        let pink = b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362;
        b[6] = white * 0.115926;
        pink
    }
}

#[derive(Debug, Clone)]
pub struct Noise {
    color: NoiseColor,
    rng: Rng,
    pink: PinkState,
    brown_last: f32,
}

impl Default for Noise {
    fn default() -> Self {
        Self::new()
    }
}

impl Noise {
    pub fn new() -> Self {
        Self::with_rng(Rng::new())
    }

    pub fn with_rng(rng: Rng) -> Self {
        Self {
            color: NoiseColor::White,
            rng,
            pink: PinkState::default(),
            brown_last: 0.0,
        }
    }

    pub fn with_color(mut self, color: NoiseColor) -> Self {
        self.color = color;
        self
    }

    pub fn apply(&mut self, param: NoiseParam) {
        match param {
            NoiseParam::Color(color) => self.color = color,
        }
    }

    pub fn color(&self) -> NoiseColor {
        self.color
    }

    #[inline]
    pub fn get_next_white_noise_val(&mut self) -> f32 {
        self.rng.bipolar()
    }

    #[inline]
    pub fn get_next_pink_noise_val(&mut self) -> f32 {
        let white = self.rng.bipolar();
        self.pink.next(white) * PINK_GAIN
    }

    #[inline]
    pub fn get_next_brown_noise_val(&mut self) -> f32 {
        let white = self.rng.bipolar();
        self.brown_last = (self.brown_last + 0.02 * white) / 1.02;
        self.brown_last * BROWN_GAIN
    }

    /// Next sample of the selected colour.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.color {
            NoiseColor::White => self.get_next_white_noise_val(),
            NoiseColor::Pink => self.get_next_pink_noise_val(),
            NoiseColor::Brown => self.get_next_brown_noise_val(),
        }
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    pub fn reset(&mut self) {
        self.pink = PinkState::default();
        self.brown_last = 0.0;
    }
}

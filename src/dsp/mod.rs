//! Low-level DSP primitives owned by a voice.
//!
//! These components are allocation-free after construction and realtime-safe,
//! making them safe to embed directly inside voice structs. They stay focused
//! on the signal-processing math; routing and modulation live in the voice.

/// Stereo output amplifier with per-channel gain and pan.
pub mod amp;
/// Arctangent soft-clip distortion.
pub mod distortion;
/// Seven-stage ADSR envelope generator.
pub mod envelope;
/// State-variable filter with modulated, key-tracked cutoff.
pub mod filter;
/// Plucked-string model.
pub mod karplus;
/// Control-rate oscillators.
pub mod lfo;
/// Morphed-sine wavetable and its per-voice reader.
pub mod mso;
/// White, pink and brown noise.
pub mod noise;
/// Audio-rate oscillator with PWM, sync and unison.
pub mod oscillator;
/// PADsynth table generation and playback.
pub mod pad;
pub mod pitch;
pub mod rng;

pub use envelope::EnvelopeState;

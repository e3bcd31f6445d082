pub mod config;
pub mod dsp; // Generators, filters, modulation sources
pub mod error;
pub mod synth; // Voice, programs and polyphony

pub use config::{EngineConfig, PwmModulationMode};
pub use error::SynthError;

pub const MAX_BLOCK_SIZE: usize = 2048;
pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Audio samples per control tick. LFOs, envelopes and modulation routing run
/// at `sample_rate / CONTROL_SUB_SAMPLING`.
pub const CONTROL_SUB_SAMPLING: usize = 8;

pub const OSC_MIN_FREQUENCY: f32 = 20.0;
pub const OSC_MAX_FREQUENCY: f32 = 10_000.0;

pub const NUM_OF_LFOS: usize = 5;
pub const NUM_OF_ADSRS: usize = 5;

//! Real-world scenario benchmarks.
//!
//! These benchmarks render complete voices and a polyphonic program the way
//! the audio callback does.

mod polyphony;
mod voices;

pub use polyphony::bench_polyphony;
pub use voices::bench_voices;

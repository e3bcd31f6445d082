//! Benchmarks for low-level DSP primitives.

mod distortion;
mod envelope;
mod filter;
mod karplus;
mod noise;
mod oscillator;
mod wavetable;

pub use distortion::bench_distortion;
pub use envelope::bench_envelope;
pub use filter::bench_filter;
pub use karplus::bench_karplus;
pub use noise::bench_noise;
pub use oscillator::bench_oscillator;
pub use wavetable::{bench_mso, bench_pad};

//! Benchmarks for low-level DSP primitives.

mod biquad;
mod compressor;
mod panner;
mod spectrum;

pub use biquad::bench_biquad;
pub use compressor::bench_compressor;
pub use panner::bench_panner;
pub use spectrum::bench_spectrum;

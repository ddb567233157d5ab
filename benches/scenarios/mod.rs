//! Real-world scenario benchmarks.
//!
//! These render the processing chain the way the output callback does,
//! from bare playback up to every stage enabled.

mod chain;

pub use chain::bench_chain;

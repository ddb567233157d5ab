//! Low-level DSP primitives used by the higher level graph nodes.
//!
//! These components are allocation-free once constructed and realtime-safe,
//! making them safe to run inside the output callback. They stay focused on
//! the signal-processing math so the graph layer can handle orchestration and
//! parameter scheduling.

/// RBJ shelf and peaking filters.
pub mod biquad;
/// Stereo-linked feed-forward compressor with soft knee.
pub mod compressor;
/// Equal-power 3D positioning with distance and head-shadow cues.
pub mod panner;
/// Smoothed parameters with set-target semantics.
pub mod param;
/// Windowed FFT magnitudes for visualization.
pub mod spectrum;

pub use biquad::FilterShape;
pub use param::AudioParam;

pub mod config; // Serde-backed settings for the whole pipeline
pub mod context; // Context lifecycle and output backends
pub mod dsp;
pub mod enhancer; // Per-player enhancement session
pub mod equalizer;
pub mod error;
pub mod graph; // Block-rendered processing chain
pub mod platform; // Host collaborators: clock, network, identity, storage
pub mod playback;
pub mod spatial;
pub mod sync; // Debounced settings persistence
pub mod visualizer;

pub use config::EnhancerConfig;
pub use context::{AudioContext, ContextState};
pub use enhancer::{Capabilities, Enhancer};
pub use sync::{SyncDeps, SyncStatus};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;

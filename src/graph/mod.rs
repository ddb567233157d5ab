//! Block-rendered processing graph.
//!
//! Graph nodes wrap the low-level DSP primitives with what a live chain
//! needs: stereo block rendering, smoothed parameters that can be scheduled
//! while audio is running, and a fixed stage order assembled by the
//! [`builder`].

/// Analysis tap feeding the visualizer.
pub mod analyser;
/// Filter Graph Builder and stage configuration.
pub mod builder;
/// Render-side chain and the control ring that feeds it.
pub mod chain;
/// Dynamics stage.
pub mod compressor;
/// Graphic equalizer bank.
pub mod equalizer;
/// Stage handles handed to the control side.
pub mod handles;
/// Core traits shared by all graph nodes.
pub mod node;
/// 3D positioning stage.
pub mod panner;
/// Playable sources.
pub mod source;

pub use builder::{GraphBuilder, GraphConfig, GraphHandles, SmoothingConfig};
pub use chain::{ControlSender, ProcessingChain, StageKind};
pub use node::{GraphNode, Param, RenderCtx};
pub use source::{BufferSource, MediaSource, SourceId, StereoBuffer};

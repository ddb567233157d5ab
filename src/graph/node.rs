/// Context passed to graph nodes during rendering
///
/// Contains information about what to render:
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - time: Playback time in seconds at the first sample of the block
pub struct RenderCtx {
    pub sample_rate: f32,
    pub time: f64,
}

impl RenderCtx {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            time: 0.0,
        }
    }

    /// Move the clock forward by a rendered block
    pub fn advance(&mut self, frames: usize) {
        self.time += frames as f64 / self.sample_rate as f64;
    }
}

/// Live parameters that can be scheduled on a running chain.
///
/// Every node answers only to the parameters it owns and ignores the rest,
/// so the chain can broadcast a change without knowing its topology.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Param {
    /// Gain of one equalizer band in dB
    BandGain(usize),
    /// Compressor threshold in dBFS
    Threshold,
    /// Compressor ratio (n:1)
    Ratio,
    PositionX,
    PositionY,
    PositionZ,
    /// Output gain, linear 0.0-1.0
    MasterGain,
}

/// Core trait for audio processing graph nodes
///
/// Nodes process a stereo block in place.
pub trait GraphNode: Send {
    fn render_block(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx);

    /// Schedule a transition of `param` towards `value`, starting at the next
    /// rendered sample.
    ///
    /// Returns `false` when the node does not own the parameter.
    fn schedule(&mut self, _param: Param, _value: f32) -> bool {
        false
    }

    /// Current target of a parameter owned by this node
    fn param(&self, _param: Param) -> Option<f32> {
        None
    }

    /// Clear filter memories and snap parameters to their targets
    fn reset(&mut self) {}
}

/// Allow boxed graph nodes to be used as graph nodes (for dynamic dispatch)
impl GraphNode for Box<dyn GraphNode> {
    fn render_block(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx) {
        (**self).render_block(left, right, ctx)
    }

    fn schedule(&mut self, param: Param, value: f32) -> bool {
        (**self).schedule(param, value)
    }

    fn param(&self, param: Param) -> Option<f32> {
        (**self).param(param)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

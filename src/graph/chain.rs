//! Render-side processing chain
//!
//! The chain owns the attached source and every processing stage. It lives
//! behind the context's shared render slot and is driven block by block by
//! the output backend. The control side never touches it directly: parameter
//! writes and transport commands are pushed into a lock-free ring and drained
//! at the start of the next block, so a write always takes effect "now" and
//! never retroactively.

use std::sync::Arc;

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::{
    dsp::param::AudioParam,
    error::GraphError,
    graph::{
        node::{GraphNode, Param, RenderCtx},
        source::{MediaSource, SourceCommand},
    },
    MAX_BLOCK_SIZE,
};

pub const DEFAULT_CONTROL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMessage {
    Schedule { param: Param, value: f32 },
    Source(SourceCommand),
}

/// Producer side of the control ring, shared by all stage handles
#[derive(Clone)]
pub struct ControlSender {
    tx: Arc<Mutex<Producer<ControlMessage>>>,
}

impl ControlSender {
    pub fn send(&self, message: ControlMessage) -> Result<(), GraphError> {
        self.tx
            .lock()
            .push(message)
            .map_err(|_| GraphError::ControlQueueFull)
    }

    pub fn schedule(&self, param: Param, value: f32) -> Result<(), GraphError> {
        self.send(ControlMessage::Schedule { param, value })
    }
}

/// Processing stages, in the only order the chain accepts them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageKind {
    Compression,
    Equalizer,
    Spatial,
    Analysis,
}

struct Stage {
    kind: StageKind,
    node: Box<dyn GraphNode>,
}

pub struct ProcessingChain {
    source: Box<dyn MediaSource>,
    stages: Vec<Stage>,
    master: AudioParam,
    control: Consumer<ControlMessage>,
    ctx: RenderCtx,
    scratch_left: Vec<f32>,
    scratch_right: Vec<f32>,
}

impl ProcessingChain {
    pub fn new(
        source: Box<dyn MediaSource>,
        sample_rate: f32,
        master_gain: f32,
        gain_time_constant: f32,
        control_capacity: usize,
    ) -> (Self, ControlSender) {
        let (tx, rx) = RingBuffer::<ControlMessage>::new(control_capacity.max(1));
        let chain = Self {
            source,
            stages: Vec::new(),
            master: AudioParam::new(master_gain, 0.0, 1.0, gain_time_constant),
            control: rx,
            ctx: RenderCtx::new(sample_rate),
            scratch_left: vec![0.0; MAX_BLOCK_SIZE],
            scratch_right: vec![0.0; MAX_BLOCK_SIZE],
        };
        let sender = ControlSender {
            tx: Arc::new(Mutex::new(tx)),
        };
        (chain, sender)
    }

    /// Append a stage. Stages must arrive in [`StageKind`] order and each
    /// kind may appear once.
    pub fn push_stage(&mut self, kind: StageKind, node: Box<dyn GraphNode>) -> Result<(), GraphError> {
        if self.stages.last().is_some_and(|last| last.kind >= kind) {
            return Err(GraphError::StageOrder(kind));
        }
        self.stages.push(Stage { kind, node });
        Ok(())
    }

    pub fn stage_order(&self) -> Vec<StageKind> {
        self.stages.iter().map(|stage| stage.kind).collect()
    }

    pub fn sample_rate(&self) -> f32 {
        self.ctx.sample_rate
    }

    /// Seconds rendered since the chain was built
    pub fn time(&self) -> f64 {
        self.ctx.time
    }

    pub fn source(&self) -> &dyn MediaSource {
        self.source.as_ref()
    }

    /// Current target of a live parameter, if some stage owns it
    pub fn param(&self, param: Param) -> Option<f32> {
        if param == Param::MasterGain {
            return Some(self.master.target());
        }
        self.stages.iter().find_map(|stage| stage.node.param(param))
    }

    fn drain_control(&mut self) {
        while let Ok(message) = self.control.pop() {
            match message {
                ControlMessage::Schedule {
                    param: Param::MasterGain,
                    value,
                } => self.master.set_target(value),
                ControlMessage::Schedule { param, value } => {
                    for stage in self.stages.iter_mut() {
                        if stage.node.schedule(param, value) {
                            break;
                        }
                    }
                }
                ControlMessage::Source(command) => self.source.apply(command),
            }
        }
    }

    /// Render the next stereo block; longer buffers are split internally
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let mut offset = 0;
        while offset < frames {
            let len = (frames - offset).min(MAX_BLOCK_SIZE);
            let l = &mut left[offset..offset + len];
            let r = &mut right[offset..offset + len];

            self.drain_control();
            self.source.read(l, r, &self.ctx);
            for stage in self.stages.iter_mut() {
                stage.node.render_block(l, r, &self.ctx);
            }

            let coeff = self.master.coefficient(self.ctx.sample_rate);
            for (sl, sr) in l.iter_mut().zip(r.iter_mut()) {
                let gain = self.master.next_value(coeff);
                *sl *= gain;
                *sr *= gain;
            }

            self.ctx.advance(len);
            offset += len;
        }
    }

    /// Render into an interleaved device buffer. Mono outputs get the
    /// average of both channels; channels past the second are silent.
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let mut left = std::mem::take(&mut self.scratch_left);
        let mut right = std::mem::take(&mut self.scratch_right);

        for chunk in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
            let frames = chunk.len() / channels;
            let (l, r) = (&mut left[..frames], &mut right[..frames]);
            self.process_block(l, r);

            for (i, frame) in chunk.chunks_exact_mut(channels).enumerate() {
                if channels == 1 {
                    frame[0] = 0.5 * (l[i] + r[i]);
                    continue;
                }
                frame[0] = l[i];
                frame[1] = r[i];
                frame[2..].fill(0.0);
            }
        }

        self.scratch_left = left;
        self.scratch_right = right;
    }

    /// Clear stage memories and snap every parameter onto its target
    pub fn reset(&mut self) {
        self.drain_control();
        self.master.set_immediate(self.master.target());
        for stage in self.stages.iter_mut() {
            stage.node.reset();
        }
    }
}

//! Opaque handles to live stages.
//!
//! A handle only knows how to post parameter changes for its own stage; the
//! topology of the chain stays hidden behind the control ring.

use crate::{
    error::GraphError,
    graph::{
        chain::{ControlMessage, ControlSender},
        node::Param,
        panner::Position,
        source::SourceCommand,
    },
};

#[derive(Clone)]
pub struct EqualizerHandle {
    control: ControlSender,
    bands: usize,
}

impl EqualizerHandle {
    pub(crate) fn new(control: ControlSender, bands: usize) -> Self {
        Self { control, bands }
    }

    pub fn band_count(&self) -> usize {
        self.bands
    }

    pub fn set_band_gain(&self, index: usize, gain_db: f32) -> Result<(), GraphError> {
        if index >= self.bands {
            return Err(GraphError::BandOutOfRange {
                index,
                bands: self.bands,
            });
        }
        self.control.schedule(Param::BandGain(index), gain_db)
    }

    /// Schedule every band at once, e.g. when a preset is applied
    pub fn set_gains(&self, gains: &[f32]) -> Result<(), GraphError> {
        for (index, &gain) in gains.iter().enumerate().take(self.bands) {
            self.set_band_gain(index, gain)?;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct CompressorHandle {
    control: ControlSender,
}

impl CompressorHandle {
    pub(crate) fn new(control: ControlSender) -> Self {
        Self { control }
    }

    pub fn set_threshold(&self, threshold_db: f32) -> Result<(), GraphError> {
        self.control.schedule(Param::Threshold, threshold_db)
    }

    pub fn set_ratio(&self, ratio: f32) -> Result<(), GraphError> {
        self.control.schedule(Param::Ratio, ratio)
    }
}

#[derive(Clone)]
pub struct PannerHandle {
    control: ControlSender,
}

impl PannerHandle {
    pub(crate) fn new(control: ControlSender) -> Self {
        Self { control }
    }

    pub fn set_position(&self, position: Position) -> Result<(), GraphError> {
        self.control.schedule(Param::PositionX, position.x)?;
        self.control.schedule(Param::PositionY, position.y)?;
        self.control.schedule(Param::PositionZ, position.z)
    }
}

/// Transport and output level of the attached source
#[derive(Clone)]
pub struct TransportHandle {
    control: ControlSender,
}

impl TransportHandle {
    pub(crate) fn new(control: ControlSender) -> Self {
        Self { control }
    }

    pub fn play(&self) -> Result<(), GraphError> {
        self.control.send(ControlMessage::Source(SourceCommand::Play))
    }

    pub fn pause(&self) -> Result<(), GraphError> {
        self.control.send(ControlMessage::Source(SourceCommand::Pause))
    }

    pub fn seek(&self, seconds: f64) -> Result<(), GraphError> {
        self.control
            .send(ControlMessage::Source(SourceCommand::Seek { seconds }))
    }

    pub fn select(&self, track: usize) -> Result<(), GraphError> {
        self.control
            .send(ControlMessage::Source(SourceCommand::Select { track }))
    }

    /// Output gain, linear 0.0-1.0
    pub fn set_master_gain(&self, gain: f32) -> Result<(), GraphError> {
        self.control.schedule(Param::MasterGain, gain)
    }
}

/// Connection of a control-side engine to its stage.
///
/// Engines are constructed before the graph exists, so a stage starts out
/// pending; it becomes ready once built or unavailable if building failed.
#[derive(Clone)]
pub enum StageLink<H> {
    Pending,
    Ready(H),
    Unavailable,
}

impl<H> Default for StageLink<H> {
    fn default() -> Self {
        StageLink::Pending
    }
}

impl<H> StageLink<H> {
    pub fn is_ready(&self) -> bool {
        matches!(self, StageLink::Ready(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StageLink::Unavailable)
    }

    /// Run `f` against a ready stage. Pending stages buffer by doing
    /// nothing; the owning engine replays its state on attach.
    pub fn apply(
        &self,
        stage: &'static str,
        f: impl FnOnce(&H) -> Result<(), GraphError>,
    ) -> Result<(), GraphError> {
        match self {
            StageLink::Pending => Ok(()),
            StageLink::Ready(handle) => f(handle),
            StageLink::Unavailable => Err(GraphError::Unavailable(stage)),
        }
    }
}

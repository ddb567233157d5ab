//! Error taxonomy.
//!
//! Graph and context errors are converted into capability flags at the
//! [`Enhancer`](crate::enhancer::Enhancer) boundary. Store errors travel
//! through the sync status channel and never reach the parameter call path.

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::{chain::StageKind, source::SourceId};

/// Failures of the processing context lifecycle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    #[error("context already bound to source {attached}, cannot attach {requested}")]
    AttachmentConflict {
        attached: SourceId,
        requested: SourceId,
    },
    #[error("context is closed and cannot be reused")]
    Closed,
    #[error("no source attached to the context")]
    NoSource,
    #[error("audio backend failure: {0}")]
    Backend(String),
}

/// Failures building or driving the processing graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("{0} is unavailable")]
    Unavailable(&'static str),
    #[error("graph already built for this context")]
    AlreadyBuilt,
    #[error("{0:?} stage is out of order or duplicated")]
    StageOrder(StageKind),
    #[error("band {index} out of range ({bands} bands)")]
    BandOutOfRange { index: usize, bands: usize },
    #[error("control queue is full, change dropped")]
    ControlQueueFull,
    #[error(transparent)]
    Context(#[from] ContextError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
}

/// Failures of a preset or parameter change on a live stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error(transparent)]
    Preset(#[from] PresetError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Failures of the remote settings store or local durable storage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("network unavailable: {0}")]
    Network(String),
    #[error("invalid settings: {0}")]
    Validation(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn is_network(&self) -> bool {
        matches!(self, StoreError::Network(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

//! Analysis tap
//!
//! The analyser node sits after every processing stage and forwards a mono
//! mix of what is about to be played to the control side over a ring buffer.
//! It never alters the signal. The consumer end ([`AnalysisTap`]) keeps a
//! rolling window and turns it into frequency and time-domain snapshots on
//! demand.

use rtrb::{Consumer, Producer, RingBuffer};
use serde::{Deserialize, Serialize};

use crate::{
    dsp::spectrum::SpectrumAnalyzer,
    graph::node::{GraphNode, RenderCtx},
};

/// Windows of audio buffered between the render side and the tap
const QUEUE_WINDOWS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Samples per analysis window (power of two)
    pub fft_size: usize,
    /// Level mapped to byte 0
    pub min_db: f32,
    /// Level mapped to byte 255
    pub max_db: f32,
    /// Averaging between successive spectra, 0.0-1.0
    pub smoothing: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            min_db: -100.0,
            max_db: -30.0,
            smoothing: 0.8,
        }
    }
}

pub struct AnalyserNode {
    tx: Producer<f32>,
    dropped: u64,
}

impl AnalyserNode {
    /// Create the node and the tap that reads from it
    pub fn new(config: &AnalysisConfig, sample_rate: f32) -> (Self, AnalysisTap) {
        let fft_size = config.fft_size.max(32).next_power_of_two();
        let (tx, rx) = RingBuffer::<f32>::new(fft_size * QUEUE_WINDOWS);

        let tap = AnalysisTap {
            rx,
            window: vec![0.0; fft_size],
            analyzer: SpectrumAnalyzer::new(fft_size, config.min_db, config.max_db, config.smoothing),
            snapshot: AnalysisSnapshot {
                frequency: vec![0; fft_size / 2],
                time_domain: vec![0.0; fft_size],
                sample_rate,
            },
        };

        (Self { tx, dropped: 0 }, tap)
    }

    /// Samples discarded because the tap was not keeping up
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl GraphNode for AnalyserNode {
    fn render_block(&mut self, left: &mut [f32], right: &mut [f32], _ctx: &RenderCtx) {
        for (&l, &r) in left.iter().zip(right.iter()) {
            // Nobody reading, nothing to keep
            if self.tx.push(0.5 * (l + r)).is_err() {
                self.dropped += 1;
            }
        }
    }
}

/// Latest view of the signal at the end of the chain
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSnapshot {
    /// Byte-scaled magnitude per FFT bin, up to Nyquist
    pub frequency: Vec<u8>,
    /// Most recent window of samples, -1.0 to 1.0
    pub time_domain: Vec<f32>,
    pub sample_rate: f32,
}

impl AnalysisSnapshot {
    /// Center frequency of bin `index` in Hz
    pub fn bin_frequency(&self, index: usize) -> f32 {
        index as f32 * self.sample_rate / self.time_domain.len().max(1) as f32
    }
}

pub struct AnalysisTap {
    rx: Consumer<f32>,
    window: Vec<f32>,
    analyzer: SpectrumAnalyzer,
    snapshot: AnalysisSnapshot,
}

impl AnalysisTap {
    /// Pull everything the render side produced and refresh the snapshot
    pub fn poll(&mut self) -> &AnalysisSnapshot {
        let available = self.rx.slots();
        if available == 0 {
            return &self.snapshot;
        }

        let size = self.window.len();
        let keep = available.min(size);
        let skip = available - keep;

        // Only the newest window matters
        for _ in 0..skip {
            let _ = self.rx.pop();
        }

        self.window.rotate_left(keep);
        let start = size - keep;
        for slot in self.window[start..].iter_mut() {
            *slot = self.rx.pop().unwrap_or(0.0);
        }

        self.analyzer.update(&self.window);
        self.snapshot.frequency.copy_from_slice(self.analyzer.data());
        self.snapshot.time_domain.copy_from_slice(&self.window);
        &self.snapshot
    }

    /// Snapshot from the last poll without reading new audio
    pub fn snapshot(&self) -> &AnalysisSnapshot {
        &self.snapshot
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }
}

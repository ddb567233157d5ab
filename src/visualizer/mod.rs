//! Visualizer
//!
//! A restartable animation loop that reads the analysis tap once per frame,
//! turns the snapshot into a [`Scene`] for the selected mode and hands it to
//! a [`Canvas`]. It only ever reads from the graph.
//!
//! The loop runs on its own thread. [`StopHandle::stop`] signals it and joins,
//! so once `stop` returns nothing is drawn anymore; the canvas and the tap
//! come back to the caller so the loop can be started again.

pub mod modes;
pub mod terminal;

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

pub use modes::{Rgb, Scene, Shape};

use crate::graph::analyser::{AnalysisSnapshot, AnalysisTap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualMode {
    #[default]
    Bars,
    Waveform,
    Circular,
}

impl VisualMode {
    pub fn scene(self, snapshot: &AnalysisSnapshot, width: f32, height: f32) -> Scene {
        match self {
            VisualMode::Bars => modes::bars(snapshot, width, height),
            VisualMode::Waveform => modes::waveform(snapshot, width, height),
            VisualMode::Circular => modes::circular(snapshot, width, height),
        }
    }

    pub fn next(self) -> Self {
        match self {
            VisualMode::Bars => VisualMode::Waveform,
            VisualMode::Waveform => VisualMode::Circular,
            VisualMode::Circular => VisualMode::Bars,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    /// Delay between frames in milliseconds
    pub frame_interval_ms: u64,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
        }
    }
}

pub trait Canvas: Send + 'static {
    /// Drawable area in scene units
    fn size(&self) -> (f32, f32);

    fn draw(&mut self, scene: &Scene);
}

type LoopParts<C> = (C, Option<AnalysisTap>);

pub struct StopHandle<C: Canvas> {
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<LoopParts<C>>>,
    interval: Duration,
}

/// Start drawing `mode` onto `canvas`. Without a tap the loop runs but draws
/// nothing.
pub fn render<C: Canvas>(
    mut canvas: C,
    mut tap: Option<AnalysisTap>,
    mode: VisualMode,
    interval: Duration,
) -> StopHandle<C> {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();

    let thread = thread::spawn(move || {
        debug!("visualizer started in {:?} mode", mode);
        loop {
            if let Some(tap) = tap.as_mut() {
                let (width, height) = canvas.size();
                let scene = mode.scene(tap.poll(), width, height);
                canvas.draw(&scene);
            }

            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                // stop requested or handle dropped
                _ => break,
            }
        }
        debug!("visualizer stopped");
        (canvas, tap)
    });

    StopHandle {
        stop_tx,
        thread: Some(thread),
        interval,
    }
}

impl<C: Canvas> StopHandle<C> {
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait for it. Returns the canvas and tap, or `None`
    /// if the loop thread panicked.
    pub fn stop(mut self) -> Option<LoopParts<C>> {
        self.shutdown()
    }

    /// Stop and start again in another mode with the same canvas and tap
    pub fn restart(mut self, mode: VisualMode) -> Option<StopHandle<C>> {
        let interval = self.interval;
        let (canvas, tap) = self.shutdown()?;
        Some(render(canvas, tap, mode, interval))
    }

    fn shutdown(&mut self) -> Option<LoopParts<C>> {
        let thread = self.thread.take()?;
        let _ = self.stop_tx.send(());
        thread.join().ok()
    }
}

impl<C: Canvas> Drop for StopHandle<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

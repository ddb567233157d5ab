//! Output backends.
//!
//! A backend pulls rendered audio out of the context's [`Renderer`]. The
//! device backend does so from the cpal callback thread; the offline backend
//! renders on demand, which is what tests and benchmarks drive.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error};
use parking_lot::Mutex;

use crate::{context::Renderer, error::ContextError};

pub trait AudioBackend {
    fn sample_rate(&self) -> f32;

    /// Begin pulling audio. Called once, on the first resume.
    fn start(&mut self, renderer: Renderer) -> Result<(), ContextError>;

    fn suspend(&mut self) -> Result<(), ContextError>;

    fn resume(&mut self) -> Result<(), ContextError>;

    /// Stop for good and release the device
    fn close(&mut self);
}

/// Default output device through cpal
pub struct CpalBackend {
    device: cpal::Device,
    config: cpal::StreamConfig,
    stream: Option<cpal::Stream>,
}

impl CpalBackend {
    pub fn new() -> Result<Self, ContextError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| ContextError::Backend("no default output device available".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| ContextError::Backend(format!("failed to fetch default output config: {}", e)))?;

        Ok(Self {
            device,
            config: config.into(),
            stream: None,
        })
    }

    pub fn channels(&self) -> usize {
        self.config.channels as usize
    }
}

impl AudioBackend for CpalBackend {
    fn sample_rate(&self) -> f32 {
        self.config.sample_rate.0 as f32
    }

    fn start(&mut self, renderer: Renderer) -> Result<(), ContextError> {
        let channels = self.channels();
        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    renderer.render_interleaved(data, channels);
                },
                |err| error!("audio output error: {}", err),
                None,
            )
            .map_err(|e| ContextError::Backend(e.to_string()))?;

        stream
            .play()
            .map_err(|e| ContextError::Backend(e.to_string()))?;
        debug!(
            "output stream started: {} Hz, {} channels",
            self.config.sample_rate.0, channels
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), ContextError> {
        match &self.stream {
            Some(stream) => stream
                .pause()
                .map_err(|e| ContextError::Backend(e.to_string())),
            None => Ok(()),
        }
    }

    fn resume(&mut self) -> Result<(), ContextError> {
        match &self.stream {
            Some(stream) => stream
                .play()
                .map_err(|e| ContextError::Backend(e.to_string())),
            None => Ok(()),
        }
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

#[derive(Default)]
struct OfflineShared {
    renderer: Option<Renderer>,
    running: bool,
}

/// Backend without a device; audio is pulled through [`OfflineOutput`]
pub struct OfflineBackend {
    sample_rate: f32,
    shared: Arc<Mutex<OfflineShared>>,
}

impl OfflineBackend {
    pub fn new(sample_rate: f32) -> (Self, OfflineOutput) {
        let shared = Arc::new(Mutex::new(OfflineShared::default()));
        let output = OfflineOutput {
            shared: shared.clone(),
        };
        (
            Self {
                sample_rate,
                shared,
            },
            output,
        )
    }
}

impl AudioBackend for OfflineBackend {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn start(&mut self, renderer: Renderer) -> Result<(), ContextError> {
        let mut shared = self.shared.lock();
        shared.renderer = Some(renderer);
        shared.running = true;
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), ContextError> {
        self.shared.lock().running = false;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), ContextError> {
        self.shared.lock().running = true;
        Ok(())
    }

    fn close(&mut self) {
        let mut shared = self.shared.lock();
        shared.running = false;
        shared.renderer = None;
    }
}

/// Pull side of an [`OfflineBackend`]. A suspended or closed context
/// produces silence and does not advance.
#[derive(Clone)]
pub struct OfflineOutput {
    shared: Arc<Mutex<OfflineShared>>,
}

impl OfflineOutput {
    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Render `frames` stereo frames
    pub fn render(&self, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0; frames];
        let mut right = vec![0.0; frames];
        let shared = self.shared.lock();
        if let (true, Some(renderer)) = (shared.running, &shared.renderer) {
            renderer.render_stereo(&mut left, &mut right);
        }
        (left, right)
    }

    /// Render into an interleaved buffer the way a device callback would
    pub fn render_interleaved(&self, data: &mut [f32], channels: usize) {
        let shared = self.shared.lock();
        match (shared.running, &shared.renderer) {
            (true, Some(renderer)) => renderer.render_interleaved(data, channels),
            _ => data.fill(0.0),
        }
    }
}

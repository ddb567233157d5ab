//! Context Lifecycle Manager
//!
//! An [`AudioContext`] is one live processing context bound to at most one
//! playable source for its whole life. It is created idle, starts its output
//! backend lazily on the first [`resume`](AudioContext::resume) (the first
//! user intent to play), can be suspended and resumed any number of times,
//! and is closed for good by [`teardown`](AudioContext::teardown).
//!
//! ```text
//!   Uninitialized ──resume──► Active ◄──resume──┐
//!         │                     │               │
//!         │                     └──suspend──► Suspended
//!         │                                     │
//!         └──────────── teardown ───────────────┴──► Closed
//! ```

pub mod backend;

use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;

pub use backend::{AudioBackend, CpalBackend, OfflineBackend, OfflineOutput};

use crate::{
    error::ContextError,
    graph::{
        chain::{ControlSender, ProcessingChain, DEFAULT_CONTROL_CAPACITY},
        handles::TransportHandle,
        source::{MediaSource, SourceId},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Uninitialized,
    Active,
    Suspended,
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    /// Slots in the control ring between handles and the render side
    pub control_capacity: usize,
    /// Time constant of the output gain in seconds
    pub master_time_constant: f32,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            control_capacity: DEFAULT_CONTROL_CAPACITY,
            master_time_constant: 0.01,
        }
    }
}

type ChainSlot = Arc<Mutex<Option<ProcessingChain>>>;

/// Render entry point handed to the backend
#[derive(Clone)]
pub struct Renderer {
    slot: ChainSlot,
}

impl Renderer {
    pub fn render_interleaved(&self, data: &mut [f32], channels: usize) {
        match self.slot.lock().as_mut() {
            Some(chain) => chain.render_interleaved(data, channels),
            None => data.fill(0.0),
        }
    }

    pub fn render_stereo(&self, left: &mut [f32], right: &mut [f32]) {
        match self.slot.lock().as_mut() {
            Some(chain) => chain.process_block(left, right),
            None => {
                left.fill(0.0);
                right.fill(0.0);
            }
        }
    }
}

pub struct AudioContext {
    backend: Box<dyn AudioBackend>,
    options: ContextOptions,
    state: ContextState,
    started: bool,
    slot: ChainSlot,
    attached: Option<SourceId>,
    control: Option<ControlSender>,
}

impl AudioContext {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self::with_options(backend, ContextOptions::default())
    }

    pub fn with_options(backend: Box<dyn AudioBackend>, options: ContextOptions) -> Self {
        Self {
            backend,
            options,
            state: ContextState::Uninitialized,
            started: false,
            slot: Arc::new(Mutex::new(None)),
            attached: None,
            control: None,
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn sample_rate(&self) -> f32 {
        self.backend.sample_rate()
    }

    pub fn attached_source(&self) -> Option<SourceId> {
        self.attached
    }

    /// Bind `source` to this context.
    ///
    /// Attaching the source that is already bound is a no-op. Any other
    /// source fails with [`ContextError::AttachmentConflict`] and the
    /// existing binding keeps playing untouched.
    pub fn attach(&mut self, source: Box<dyn MediaSource>) -> Result<SourceId, ContextError> {
        if self.state == ContextState::Closed {
            return Err(ContextError::Closed);
        }

        let requested = source.id();
        if let Some(attached) = self.attached {
            if attached == requested {
                return Ok(attached);
            }
            warn!("refusing to attach {}: context bound to {}", requested, attached);
            return Err(ContextError::AttachmentConflict {
                attached,
                requested,
            });
        }

        let (chain, control) = ProcessingChain::new(
            source,
            self.sample_rate(),
            1.0,
            self.options.master_time_constant,
            self.options.control_capacity,
        );
        *self.slot.lock() = Some(chain);
        self.attached = Some(requested);
        self.control = Some(control);
        debug!("attached {}", requested);
        Ok(requested)
    }

    /// Start or resume output. Safe to call when already active.
    pub fn resume(&mut self) -> Result<(), ContextError> {
        match self.state {
            ContextState::Closed => return Err(ContextError::Closed),
            ContextState::Active => return Ok(()),
            ContextState::Uninitialized | ContextState::Suspended => {}
        }

        if self.started {
            self.backend.resume()?;
        } else {
            self.backend.start(self.renderer())?;
            self.started = true;
        }
        self.transition(ContextState::Active);
        Ok(())
    }

    pub fn suspend(&mut self) -> Result<(), ContextError> {
        match self.state {
            ContextState::Closed => Err(ContextError::Closed),
            ContextState::Active => {
                self.backend.suspend()?;
                self.transition(ContextState::Suspended);
                Ok(())
            }
            ContextState::Uninitialized | ContextState::Suspended => Ok(()),
        }
    }

    /// Release the backend and every node. The context cannot be reused.
    pub fn teardown(&mut self) {
        if self.state == ContextState::Closed {
            return;
        }
        self.backend.close();
        self.slot.lock().take();
        self.control = None;
        self.attached = None;
        self.transition(ContextState::Closed);
    }

    pub fn renderer(&self) -> Renderer {
        Renderer {
            slot: self.slot.clone(),
        }
    }

    /// Transport of the attached source
    pub fn transport(&self) -> Option<TransportHandle> {
        self.control.clone().map(TransportHandle::new)
    }

    /// Read-only view of the render chain
    pub fn inspect<R>(&self, f: impl FnOnce(&ProcessingChain) -> R) -> Option<R> {
        self.slot.lock().as_ref().map(f)
    }

    pub(crate) fn with_chain<R>(
        &self,
        f: impl FnOnce(&mut ProcessingChain, &ControlSender) -> R,
    ) -> Result<R, ContextError> {
        if self.state == ContextState::Closed {
            return Err(ContextError::Closed);
        }
        let control = self.control.as_ref().ok_or(ContextError::NoSource)?;
        let mut slot = self.slot.lock();
        let chain = slot.as_mut().ok_or(ContextError::NoSource)?;
        Ok(f(chain, control))
    }

    fn transition(&mut self, next: ContextState) {
        debug!("context {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

impl Drop for AudioContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::source::{BufferSource, StereoBuffer};

    const SR: f32 = 48_000.0;

    fn source(level: f32) -> BufferSource {
        let buffer = StereoBuffer::new(vec![level; 4_800], vec![level; 4_800], SR);
        BufferSource::new(buffer).looping(true)
    }

    fn context() -> (AudioContext, OfflineOutput) {
        let (backend, output) = OfflineBackend::new(SR);
        (AudioContext::new(Box::new(backend)), output)
    }

    #[test]
    fn starts_uninitialized_and_silent() {
        let (mut ctx, output) = context();
        assert_eq!(ctx.state(), ContextState::Uninitialized);
        ctx.attach(Box::new(source(0.5))).unwrap();

        let (l, _) = output.render(64);
        assert!(l.iter().all(|&s| s == 0.0));
        assert!(!output.is_running());
    }

    #[test]
    fn resume_is_idempotent() {
        let (mut ctx, output) = context();
        ctx.resume().unwrap();
        ctx.resume().unwrap();
        assert_eq!(ctx.state(), ContextState::Active);
        assert!(output.is_running());
    }

    #[test]
    fn plays_after_resume() {
        let (mut ctx, output) = context();
        ctx.attach(Box::new(source(0.5))).unwrap();
        ctx.transport().unwrap().play().unwrap();
        ctx.resume().unwrap();

        let (l, r) = output.render(64);
        assert!(l.iter().chain(r.iter()).all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn suspend_silences_output() {
        let (mut ctx, output) = context();
        ctx.attach(Box::new(source(0.5))).unwrap();
        ctx.transport().unwrap().play().unwrap();
        ctx.resume().unwrap();
        ctx.suspend().unwrap();
        assert_eq!(ctx.state(), ContextState::Suspended);

        let (l, _) = output.render(64);
        assert!(l.iter().all(|&s| s == 0.0));

        ctx.resume().unwrap();
        let (l, _) = output.render(64);
        assert!(l.iter().all(|&s| s > 0.4));
    }

    #[test]
    fn second_source_conflicts() {
        let (mut ctx, _output) = context();
        let first = ctx.attach(Box::new(source(0.5))).unwrap();
        let other = source(0.1);
        let requested = other.id();

        assert_eq!(
            ctx.attach(Box::new(other)),
            Err(ContextError::AttachmentConflict {
                attached: first,
                requested
            })
        );
        assert_eq!(ctx.attached_source(), Some(first));
    }

    #[test]
    fn teardown_is_final() {
        let (mut ctx, output) = context();
        ctx.attach(Box::new(source(0.5))).unwrap();
        ctx.resume().unwrap();
        ctx.teardown();

        assert_eq!(ctx.state(), ContextState::Closed);
        assert_eq!(ctx.resume(), Err(ContextError::Closed));
        assert_eq!(ctx.attach(Box::new(source(0.5))), Err(ContextError::Closed));
        assert!(ctx.transport().is_none());
        assert!(!output.is_running());
    }
}

//! Playable sources feeding the processing chain.
//!
//! A source is the media element of the pipeline: it can be played, paused,
//! sought and switched between tracks, and it carries a stable identity so
//! the context can tell a re-attachment of the same element apart from a
//! different one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::graph::node::RenderCtx;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a playable source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Transport commands forwarded to the source on the render side
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceCommand {
    Play,
    Pause,
    Seek { seconds: f64 },
    /// Switch to another track of the source's playlist
    Select { track: usize },
}

pub trait MediaSource: Send {
    fn id(&self) -> SourceId;

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, seconds: f64);

    fn select(&mut self, _track: usize) {}

    fn is_playing(&self) -> bool;

    /// Playback position of the current track in seconds
    fn position(&self) -> f64;

    /// Fill one stereo block; paused sources write silence
    fn read(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx);

    fn apply(&mut self, command: SourceCommand) {
        match command {
            SourceCommand::Play => self.play(),
            SourceCommand::Pause => self.pause(),
            SourceCommand::Seek { seconds } => self.seek(seconds),
            SourceCommand::Select { track } => self.select(track),
        }
    }
}

/// Decoded stereo audio held in memory
#[derive(Debug, Clone)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: f32,
}

impl StereoBuffer {
    pub fn new(mut left: Vec<f32>, mut right: Vec<f32>, sample_rate: f32) -> Self {
        let frames = left.len().min(right.len());
        left.truncate(frames);
        right.truncate(frames);
        Self {
            left,
            right,
            sample_rate,
        }
    }

    /// Split interleaved samples into channels (mono is duplicated)
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: f32) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels;
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for frame in samples.chunks_exact(channels) {
            left.push(frame[0]);
            right.push(if channels > 1 { frame[1] } else { frame[0] });
        }
        Self::new(left, right, sample_rate)
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// In-memory playlist source with linear-interpolation resampling
pub struct BufferSource {
    id: SourceId,
    tracks: Vec<StereoBuffer>,
    current: usize,
    /// Read position in frames of the current track
    cursor: f64,
    playing: bool,
    looping: bool,
}

impl BufferSource {
    pub fn new(track: StereoBuffer) -> Self {
        Self::with_tracks(vec![track])
    }

    pub fn with_tracks(tracks: Vec<StereoBuffer>) -> Self {
        Self {
            id: SourceId::next(),
            tracks,
            current: 0,
            cursor: 0.0,
            playing: false,
            looping: false,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn current_track(&self) -> usize {
        self.current
    }
}

impl MediaSource for BufferSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn play(&mut self) {
        if !self.tracks.is_empty() {
            self.playing = true;
        }
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, seconds: f64) {
        if let Some(track) = self.tracks.get(self.current) {
            let frame = seconds.max(0.0) * track.sample_rate as f64;
            self.cursor = frame.min(track.frames() as f64);
        }
    }

    fn select(&mut self, track: usize) {
        if track < self.tracks.len() {
            self.current = track;
            self.cursor = 0.0;
        }
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn position(&self) -> f64 {
        self.tracks
            .get(self.current)
            .map(|track| self.cursor / track.sample_rate as f64)
            .unwrap_or(0.0)
    }

    fn read(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx) {
        let Some(track) = self.tracks.get(self.current) else {
            left.fill(0.0);
            right.fill(0.0);
            return;
        };

        let frames = track.frames();
        let step = track.sample_rate as f64 / ctx.sample_rate as f64;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            if !self.playing || frames == 0 {
                *l = 0.0;
                *r = 0.0;
                continue;
            }

            if self.cursor >= frames as f64 {
                if self.looping {
                    self.cursor -= frames as f64;
                } else {
                    self.playing = false;
                    self.cursor = frames as f64;
                    *l = 0.0;
                    *r = 0.0;
                    continue;
                }
            }

            let index = self.cursor as usize;
            let frac = (self.cursor - index as f64) as f32;
            let next = if index + 1 < frames {
                index + 1
            } else if self.looping {
                0
            } else {
                index
            };

            *l = track.left[index] + (track.left[next] - track.left[index]) * frac;
            *r = track.right[index] + (track.right[next] - track.right[index]) * frac;
            self.cursor += step;
        }
    }
}

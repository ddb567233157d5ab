//! Scene construction per mode.
//!
//! Each mode is a pure function of one analysis snapshot and the canvas size.
//! Scenes use a y-up coordinate space with the origin in the bottom-left
//! corner, which is what ratatui's canvas expects.

use std::f32::consts::TAU;

use crate::graph::analyser::AnalysisSnapshot;

/// Bars drawn in `Bars` mode
pub const BAR_COUNT: usize = 32;
/// Spokes drawn in `Circular` mode
pub const SPOKE_COUNT: usize = 64;

/// Fraction of the frequency bins the bar and circular modes spread over;
/// the top of the spectrum is mostly empty for music
const USED_BINS: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
    },
    Polyline {
        points: Vec<(f32, f32)>,
        color: Rgb,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    pub shapes: Vec<Shape>,
}

impl Scene {
    fn empty(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            shapes: Vec::new(),
        }
    }
}

/// Cold-to-hot color for a level in 0.0-1.0
fn heat(level: f32) -> Rgb {
    let level = level.clamp(0.0, 1.0);
    let r = (255.0 * level) as u8;
    let g = (200.0 * (1.0 - (2.0 * level - 1.0).abs())) as u8;
    let b = (255.0 * (1.0 - level)) as u8;
    Rgb(r, g, b)
}

/// Average of `groups` equal slices over the used part of `data`, 0.0-1.0
fn grouped_levels(data: &[u8], groups: usize) -> Vec<f32> {
    let used = ((data.len() as f32 * USED_BINS) as usize).max(groups.min(data.len()));
    if used == 0 || groups == 0 {
        return vec![0.0; groups];
    }
    (0..groups)
        .map(|g| {
            let start = g * used / groups;
            let end = ((g + 1) * used / groups).max(start + 1).min(used);
            let slice = &data[start..end];
            slice.iter().map(|&b| b as f32).sum::<f32>() / (slice.len() as f32 * 255.0)
        })
        .collect()
}

pub fn bars(snapshot: &AnalysisSnapshot, width: f32, height: f32) -> Scene {
    let mut scene = Scene::empty(width, height);
    if snapshot.frequency.is_empty() {
        return scene;
    }

    let slot = width / BAR_COUNT as f32;
    for (i, level) in grouped_levels(&snapshot.frequency, BAR_COUNT).into_iter().enumerate() {
        if level <= 0.0 {
            continue;
        }
        scene.shapes.push(Shape::Rect {
            x: i as f32 * slot,
            y: 0.0,
            width: slot * 0.8,
            height: level * height,
            color: heat(level),
        });
    }
    scene
}

pub fn waveform(snapshot: &AnalysisSnapshot, width: f32, height: f32) -> Scene {
    let mut scene = Scene::empty(width, height);
    let samples = &snapshot.time_domain;
    if samples.len() < 2 {
        return scene;
    }

    let mid = height / 2.0;
    let step = width / (samples.len() - 1) as f32;
    let points = samples
        .iter()
        .enumerate()
        .map(|(i, &s)| (i as f32 * step, mid + s.clamp(-1.0, 1.0) * mid))
        .collect();

    scene.shapes.push(Shape::Polyline {
        points,
        color: Rgb(0, 255, 255),
    });
    scene
}

pub fn circular(snapshot: &AnalysisSnapshot, width: f32, height: f32) -> Scene {
    let mut scene = Scene::empty(width, height);
    if snapshot.frequency.is_empty() {
        return scene;
    }

    let center = (width / 2.0, height / 2.0);
    let radius = width.min(height) * 0.25;
    for (i, level) in grouped_levels(&snapshot.frequency, SPOKE_COUNT).into_iter().enumerate() {
        let angle = i as f32 / SPOKE_COUNT as f32 * TAU;
        let (sin, cos) = angle.sin_cos();
        let inner = (center.0 + cos * radius, center.1 + sin * radius);
        let outer_radius = radius * (1.0 + level);
        let outer = (center.0 + cos * outer_radius, center.1 + sin * outer_radius);
        scene.shapes.push(Shape::Line {
            from: inner,
            to: outer,
            color: heat(level),
        });
    }
    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(frequency: Vec<u8>, time_domain: Vec<f32>) -> AnalysisSnapshot {
        AnalysisSnapshot {
            frequency,
            time_domain,
            sample_rate: 48_000.0,
        }
    }

    #[test]
    fn silent_spectrum_draws_no_bars() {
        let scene = bars(&snapshot(vec![0; 1024], vec![0.0; 2048]), 100.0, 50.0);
        assert!(scene.shapes.is_empty());
    }

    #[test]
    fn full_spectrum_fills_the_height() {
        let scene = bars(&snapshot(vec![255; 1024], vec![0.0; 2048]), 100.0, 50.0);
        assert_eq!(scene.shapes.len(), BAR_COUNT);
        for shape in &scene.shapes {
            match shape {
                Shape::Rect { height, x, .. } => {
                    assert_eq!(*height, 50.0);
                    assert!(*x < 100.0);
                }
                other => panic!("unexpected shape {:?}", other),
            }
        }
    }

    #[test]
    fn waveform_spans_the_canvas() {
        let samples = vec![-1.0, 0.0, 1.0];
        let scene = waveform(&snapshot(vec![], samples), 10.0, 20.0);
        match &scene.shapes[..] {
            [Shape::Polyline { points, .. }] => {
                assert_eq!(points, &vec![(0.0, 0.0), (5.0, 10.0), (10.0, 20.0)]);
            }
            other => panic!("unexpected scene {:?}", other),
        }
    }

    #[test]
    fn circular_spokes_grow_with_level() {
        let quiet = circular(&snapshot(vec![0; 512], vec![]), 100.0, 100.0);
        let loud = circular(&snapshot(vec![255; 512], vec![]), 100.0, 100.0);
        assert_eq!(quiet.shapes.len(), SPOKE_COUNT);

        let length = |shape: &Shape| match shape {
            Shape::Line { from, to, .. } => ((to.0 - from.0).powi(2) + (to.1 - from.1).powi(2)).sqrt(),
            _ => 0.0,
        };
        assert!(length(&quiet.shapes[0]) < 1e-4);
        assert!((length(&loud.shapes[0]) - 25.0).abs() < 1e-3);
    }

    #[test]
    fn same_snapshot_same_scene() {
        let snap = snapshot((0..=255).collect(), vec![0.5; 64]);
        assert_eq!(bars(&snap, 80.0, 20.0), bars(&snap, 80.0, 20.0));
        assert_eq!(circular(&snap, 80.0, 20.0), circular(&snap, 80.0, 20.0));
    }
}

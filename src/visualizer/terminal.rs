//! Terminal surface for the visualizer.
//!
//! [`SharedCanvas`] is the [`Canvas`](super::Canvas) the loop draws into; it
//! just keeps the latest scene. The TUI picks that scene up on its own frame
//! and renders it with [`SceneWidget`] through ratatui's braille canvas.

use std::sync::Arc;

use parking_lot::Mutex;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    symbols::Marker,
    widgets::{
        canvas::{Canvas as RatatuiCanvas, Line, Rectangle},
        Block, Widget,
    },
};

use super::{Canvas, Rgb, Scene, Shape};

#[derive(Default)]
struct Shared {
    scene: Scene,
    size: (f32, f32),
}

#[derive(Clone, Default)]
pub struct SharedCanvas {
    shared: Arc<Mutex<Shared>>,
}

impl SharedCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        let canvas = Self::default();
        canvas.set_size(width, height);
        canvas
    }

    pub fn set_size(&self, width: f32, height: f32) {
        self.shared.lock().size = (width, height);
    }

    pub fn latest(&self) -> Scene {
        self.shared.lock().scene.clone()
    }
}

impl Canvas for SharedCanvas {
    fn size(&self) -> (f32, f32) {
        self.shared.lock().size
    }

    fn draw(&mut self, scene: &Scene) {
        self.shared.lock().scene = scene.clone();
    }
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

pub struct SceneWidget<'a> {
    scene: &'a Scene,
    block: Option<Block<'a>>,
}

impl<'a> SceneWidget<'a> {
    pub fn new(scene: &'a Scene) -> Self {
        Self { scene, block: None }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for SceneWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let scene = self.scene;
        let mut canvas = RatatuiCanvas::default()
            .marker(Marker::Braille)
            .x_bounds([0.0, scene.width.max(1.0) as f64])
            .y_bounds([0.0, scene.height.max(1.0) as f64])
            .paint(|ctx| {
                for shape in &scene.shapes {
                    match shape {
                        Shape::Rect {
                            x,
                            y,
                            width,
                            height,
                            color: c,
                        } => ctx.draw(&Rectangle {
                            x: *x as f64,
                            y: *y as f64,
                            width: *width as f64,
                            height: *height as f64,
                            color: color(*c),
                        }),
                        Shape::Line { from, to, color: c } => ctx.draw(&Line::new(
                            from.0 as f64,
                            from.1 as f64,
                            to.0 as f64,
                            to.1 as f64,
                            color(*c),
                        )),
                        Shape::Polyline { points, color: c } => {
                            for pair in points.windows(2) {
                                ctx.draw(&Line::new(
                                    pair[0].0 as f64,
                                    pair[0].1 as f64,
                                    pair[1].0 as f64,
                                    pair[1].1 as f64,
                                    color(*c),
                                ));
                            }
                        }
                    }
                }
            });
        if let Some(block) = self.block {
            canvas = canvas.block(block);
        }
        canvas.render(area, buf);
    }
}

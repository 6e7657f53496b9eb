//! Rendering collaborator interface.
//!
//! The simulation never talks to a graphics API directly. It submits
//! rectangles, sprite draws and batched sprite draws through [`Renderer`],
//! which the windowing layer implements. [`RecordingRenderer`] keeps the
//! calls in memory for headless runs and tests.

use crate::types::{Color, Flip, Rect, Vec3};
use serde::{Deserialize, Serialize};

/// A drawable sprite handle as handed out by the resource loader
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub name: String,
    /// Width of one subimage (frame)
    pub width: u32,
    pub height: u32,
    pub subimage_count: u32,
    /// False while the texture is still deferred
    pub is_loaded: bool,
    pub is_lightable: bool,
}

impl Sprite {
    /// A loaded single-frame sprite
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            subimage_count: 1,
            is_loaded: true,
            is_lightable: true,
        }
    }

    /// A sprite whose texture has not been loaded yet
    pub fn deferred(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            is_loaded: false,
            ..Self::new(name, width, height)
        }
    }

    pub fn with_subimages(mut self, count: u32) -> Self {
        self.subimage_count = count.max(1);
        self
    }
}

/// One entry of a batched sprite draw
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    /// Rotation in degrees, [0, 360)
    pub angle: f64,
    /// Tick the drawn object was created at, selects the animation frame
    pub subimage_time: u64,
}

/// Outline or filled rectangle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderMode {
    Filled,
    Outline,
}

/// Draw calls the simulation issues each frame
pub trait Renderer {
    /// Draw a debug rectangle
    fn draw_rectangle(&mut self, rect: Rect, border: BorderMode, color: Color);

    /// Draw a debug line segment
    fn draw_line(&mut self, from: Vec3, to: Vec3, color: Color);

    /// Draw one sprite frame into `rect`
    fn draw_sprite(&mut self, sprite: &Sprite, rect: DrawRect, color: Color, flip: Flip);

    /// Draw many copies of one sprite in a single call.
    ///
    /// `rotation_hint` tells the backend it may cache rotated geometry
    /// between frames.
    fn draw_batch(
        &mut self,
        sprite: &Sprite,
        rects: &[DrawRect],
        rotation_hint: bool,
        tint: Color,
        flip: Flip,
    );

    /// Toggle lighting for subsequent draws
    fn set_is_lightable(&mut self, is_lightable: bool);
}

/// A renderer call captured by [`RecordingRenderer`]
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Rectangle {
        rect: Rect,
        border: BorderMode,
        color: Color,
    },
    Line {
        from: Vec3,
        to: Vec3,
        color: Color,
    },
    Sprite {
        sprite: String,
        rect: DrawRect,
        color: Color,
        flip: Flip,
    },
    Batch {
        sprite: String,
        rects: Vec<DrawRect>,
        rotation_hint: bool,
        tint: Color,
        flip: Flip,
        /// Lighting state at the moment of the call
        is_lightable: bool,
    },
    Lightable(bool),
}

/// Headless renderer that records every call
#[derive(Debug)]
pub struct RecordingRenderer {
    pub calls: Vec<DrawCall>,
    is_lightable: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            is_lightable: true,
        }
    }

    /// Batched draws recorded so far
    pub fn batches(&self) -> impl Iterator<Item = &DrawCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Batch { .. }))
    }

    /// Total number of sprites submitted through batches
    pub fn batched_sprite_count(&self) -> usize {
        self.calls
            .iter()
            .map(|c| match c {
                DrawCall::Batch { rects, .. } => rects.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn is_lightable(&self) -> bool {
        self.is_lightable
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for RecordingRenderer {
    fn draw_rectangle(&mut self, rect: Rect, border: BorderMode, color: Color) {
        self.calls.push(DrawCall::Rectangle {
            rect,
            border,
            color,
        });
    }

    fn draw_line(&mut self, from: Vec3, to: Vec3, color: Color) {
        self.calls.push(DrawCall::Line { from, to, color });
    }

    fn draw_sprite(&mut self, sprite: &Sprite, rect: DrawRect, color: Color, flip: Flip) {
        self.calls.push(DrawCall::Sprite {
            sprite: sprite.name.clone(),
            rect,
            color,
            flip,
        });
    }

    fn draw_batch(
        &mut self,
        sprite: &Sprite,
        rects: &[DrawRect],
        rotation_hint: bool,
        tint: Color,
        flip: Flip,
    ) {
        self.calls.push(DrawCall::Batch {
            sprite: sprite.name.clone(),
            rects: rects.to_vec(),
            rotation_hint,
            tint,
            flip,
            is_lightable: self.is_lightable,
        });
    }

    fn set_is_lightable(&mut self, is_lightable: bool) {
        self.is_lightable = is_lightable;
        self.calls.push(DrawCall::Lightable(is_lightable));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_batches_with_lighting_state() {
        let mut r = RecordingRenderer::new();
        let spr = Sprite::new("spr_spark", 4, 4);
        let rect = DrawRect {
            x: 0,
            y: 0,
            w: 4,
            h: 4,
            angle: 0.0,
            subimage_time: 0,
        };

        r.set_is_lightable(false);
        r.draw_batch(&spr, &[rect, rect], false, Color::WHITE, Flip::None);
        r.set_is_lightable(true);

        assert_eq!(r.batches().count(), 1);
        assert_eq!(r.batched_sprite_count(), 2);
        match &r.calls[1] {
            DrawCall::Batch { is_lightable, .. } => assert!(!is_lightable),
            other => panic!("expected batch, got {other:?}"),
        }
        assert!(r.is_lightable());
    }

    #[test]
    fn deferred_sprite_is_not_loaded() {
        let spr = Sprite::deferred("spr_late", 8, 8).with_subimages(0);
        assert!(!spr.is_loaded);
        assert_eq!(spr.subimage_count, 1);
    }
}

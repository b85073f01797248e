//! Level-line orientation field used by the gradient-based stages.
//!
//! Gradients use the 2x2 LSD stencil, so the value at `(x, y)` describes the
//! point `(x + 0.5, y + 0.5)`. The stored angle is the level-line direction
//! `atan2(gx, -gy)`, i.e. perpendicular to the gradient and along the edge.
//! Pixels whose magnitude does not exceed the threshold, and the last row and
//! column, are marked [`NOTDEF`].

use image::GrayImage;
use std::f32::consts::PI;

/// Marker for pixels without a usable orientation.
pub const NOTDEF: f32 = -1024.0;

#[derive(Clone, Debug)]
pub struct LevelLineField {
    pub width: usize,
    pub height: usize,
    /// Level-line angle per pixel in (-pi, pi], or `NOTDEF`
    pub angles: Vec<f32>,
    /// Gradient magnitude per pixel, intensity units
    pub magnitudes: Vec<f32>,
    pub max_magnitude: f32,
}

impl LevelLineField {
    pub fn compute(gray: &GrayImage, threshold: f32) -> Self {
        let width = gray.width() as usize;
        let height = gray.height() as usize;
        let n = width * height;
        let mut field = Self {
            width,
            height,
            angles: vec![NOTDEF; n],
            magnitudes: vec![0.0; n],
            max_magnitude: 0.0,
        };
        if width < 2 || height < 2 {
            return field;
        }

        let raw = gray.as_raw();
        let px = |x: usize, y: usize| raw[y * width + x] as f32;
        for y in 0..height - 1 {
            for x in 0..width - 1 {
                let com1 = px(x + 1, y + 1) - px(x, y);
                let com2 = px(x + 1, y) - px(x, y + 1);
                let gx = com1 + com2;
                let gy = com1 - com2;
                let norm = ((gx * gx + gy * gy) / 4.0).sqrt();

                let idx = y * width + x;
                field.magnitudes[idx] = norm;
                if norm > threshold {
                    field.angles[idx] = gx.atan2(-gy);
                    field.max_magnitude = field.max_magnitude.max(norm);
                }
            }
        }
        field
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn angle(&self, x: usize, y: usize) -> f32 {
        self.angles[self.index(x, y)]
    }

    #[inline]
    pub fn magnitude(&self, x: usize, y: usize) -> f32 {
        self.magnitudes[self.index(x, y)]
    }
}

/// Absolute difference between two oriented angles, wrapped into [0, pi].
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    let mut d = (a - b).rem_euclid(2.0 * PI);
    if d > PI {
        d = 2.0 * PI - d;
    }
    d
}

/// Whether a pixel's level-line angle lies within `prec` of `theta`.
#[inline]
pub fn is_aligned(angle: f32, theta: f32, prec: f32) -> bool {
    angle != NOTDEF && angle_diff(angle, theta) <= prec
}

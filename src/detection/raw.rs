//! Normalization of backend-specific raw output into canonical `(N, 4)` lines.
//!
//! Detection libraries hand back endpoints in several layouts:
//! - `(N, 4)`: one `[x1, y1, x2, y2]` row per segment.
//! - `(N, 1, 4)`: the same rows wrapped in an extra dimension.
//! - `(N, 2, 2)`: endpoint pairs `[[x1, y1], [x2, y2]]`.
//! - any of the above with leading unit (batch) dimensions, e.g. `(1, N, 2, 2)`.
//!
//! All of them carry four values per segment in row-major order, so the
//! canonical form is a reinterpretation of the buffer once the shape is
//! validated. Nothing past this module sees a backend shape.

use crate::error::{DetectError, Result};
use crate::models::Line;

/// Raw line buffer as produced by a backend, with its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLines {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl RawLines {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// `(N, 4)` buffer built from endpoint quadruples.
    pub fn from_rows(rows: &[[f32; 4]]) -> Self {
        let data = rows.iter().flatten().copied().collect();
        Self::new(vec![rows.len(), 4], data)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of segments described by the shape.
    pub fn segment_count(&self) -> Result<usize> {
        let (leading, _) = split_shape(&self.shape)?;
        Ok(leading.iter().product())
    }

    /// Reshape into the canonical flat line list, preserving order.
    pub fn into_lines(self) -> Result<Vec<Line>> {
        let count = self.segment_count()?;
        if count * 4 != self.data.len() {
            return Err(DetectError::MalformedOutput(format!(
                "shape {:?} needs {} values, buffer has {}",
                self.shape,
                count * 4,
                self.data.len()
            )));
        }

        let mut lines = Vec::with_capacity(count);
        for chunk in self.data.chunks_exact(4) {
            if chunk.iter().any(|v| !v.is_finite()) {
                return Err(DetectError::MalformedOutput(format!(
                    "non-finite coordinate in segment {}",
                    lines.len()
                )));
            }
            lines.push([
                chunk[0] as f64,
                chunk[1] as f64,
                chunk[2] as f64,
                chunk[3] as f64,
            ]);
        }
        Ok(lines)
    }
}

/// Split a shape into its leading (segment) dims and the per-segment tail.
fn split_shape(shape: &[usize]) -> Result<(&[usize], &[usize])> {
    // An empty 1-D buffer is how some libraries report "no segments".
    if shape == [0] {
        return Ok((&shape[..1], &shape[1..]));
    }
    let split = match shape {
        [.., 2, 2] if shape.len() >= 3 => shape.len() - 2,
        [.., 4] if shape.len() >= 2 => shape.len() - 1,
        _ => {
            return Err(DetectError::MalformedOutput(format!(
                "unsupported line shape {shape:?}"
            )));
        }
    };
    let (leading, tail) = shape.split_at(split);
    if leading.iter().filter(|&&d| d != 1).count() > 1 {
        return Err(DetectError::MalformedOutput(format!(
            "line shape {shape:?} has more than one non-unit leading dimension"
        )));
    }
    Ok((leading, tail))
}

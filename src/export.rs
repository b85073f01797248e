//! Pixel-to-drawing coordinate conversion and DXF serialization.
//!
//! Raster space has its origin top-left with y growing down; drawing space
//! has its origin bottom-left with y growing up. Each endpoint is reflected
//! on its own (`x' = x`, `y' = H - y`), so segment lengths are preserved.

use crate::error::{DetectError, Result};
use crate::models::{DetectionResult, Line};
use dxf::Drawing;
use dxf::entities::{self, Entity, EntityType};
use log::debug;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Reflect one raster point into drawing space.
pub fn to_drawing_space(point: [f64; 2], image_height: u32) -> [f64; 2] {
    [point[0], image_height as f64 - point[1]]
}

/// Reflect both endpoints of a segment into drawing space.
pub fn segment_to_drawing_space(line: &Line, image_height: u32) -> Line {
    let [x1, y1] = to_drawing_space([line[0], line[1]], image_height);
    let [x2, y2] = to_drawing_space([line[2], line[3]], image_height);
    [x1, y1, x2, y2]
}

/// One LINE entity per segment, in result order.
pub fn build_drawing(result: &DetectionResult) -> Drawing {
    let mut drawing = Drawing::new();
    for line in &result.lines {
        let [x1, y1, x2, y2] = segment_to_drawing_space(line, result.image_height);
        let segment = entities::Line::new(
            dxf::Point::new(x1, y1, 0.0),
            dxf::Point::new(x2, y2, 0.0),
        );
        drawing.add_entity(Entity::new(EntityType::Line(segment)));
    }
    drawing
}

/// Write `result` as a DXF file at `path`, creating parent directories.
///
/// The drawing goes to a temporary file next to `path` and is renamed into
/// place, so `path` is either absent or complete.
pub fn save_to_dxf(result: &DetectionResult, path: &Path) -> Result<()> {
    let parent = ensure_parent_dir(path)?;
    let drawing = build_drawing(result);

    let mut tmp = tempfile::Builder::new()
        .prefix(".result")
        .suffix(".dxf.tmp")
        .tempfile_in(parent)
        .map_err(|e| DetectError::export(path, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        drawing
            .save(&mut writer)
            .map_err(|e| DetectError::export(path, e))?;
        writer.flush().map_err(|e| DetectError::export(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| DetectError::export(path, e))?;
    tmp.persist(path).map_err(|e| DetectError::export(path, e))?;

    debug!("Wrote {} LINE entities to {}", result.len(), path.display());
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<&Path> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| DetectError::export(parent, e))?;
            Ok(parent)
        }
        _ => Ok(Path::new(".")),
    }
}

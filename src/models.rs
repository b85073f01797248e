/// One segment as `[x1, y1, x2, y2]` in raster pixel coordinates
/// (origin top-left, y down).
pub type Line = [f64; 4];

/// Canonical output of every line detector.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    /// Detected segments in backend order
    pub lines: Vec<Line>,
    /// Height of the decoded raster in pixels
    pub image_height: u32,
    /// Width of the decoded raster in pixels
    pub image_width: u32,
}

impl DetectionResult {
    pub fn new(lines: Vec<Line>, image_width: u32, image_height: u32) -> Self {
        Self {
            lines,
            image_height,
            image_width,
        }
    }

    /// A well-formed result with no segments.
    pub fn empty(image_width: u32, image_height: u32) -> Self {
        Self::new(Vec::new(), image_width, image_height)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True when every coordinate of every segment is finite.
    pub fn is_finite(&self) -> bool {
        self.lines.iter().flatten().all(|v| v.is_finite())
    }
}

/// Length of a segment in pixels.
pub fn line_length(line: &Line) -> f64 {
    let dx = line[2] - line[0];
    let dy = line[3] - line[1];
    (dx * dx + dy * dy).sqrt()
}

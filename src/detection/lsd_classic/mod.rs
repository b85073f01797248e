//! Classical gradient-based backend (LSD), deterministic and CPU-only.

pub mod config;
pub mod lsd;

pub use config::{LsdClassicConfig, RefineMode};

use crate::detection::{LineDetector, preprocessing};
use crate::error::Result;
use crate::models::DetectionResult;
use image::GenericImageView;
use log::debug;
use std::path::Path;

pub const NAME: &str = "LSD Classic";
pub const OUTPUT_DIR: &str = "lsd_classic";

pub struct LsdClassicDetector {
    config: LsdClassicConfig,
}

impl LsdClassicDetector {
    pub fn new(config: LsdClassicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LsdClassicConfig {
        &self.config
    }
}

impl Default for LsdClassicDetector {
    fn default() -> Self {
        Self::new(config::DEFAULT_CONFIG)
    }
}

impl LineDetector for LsdClassicDetector {
    fn name(&self) -> &str {
        NAME
    }

    fn output_dir(&self) -> &str {
        OUTPUT_DIR
    }

    fn detect(&mut self, image_path: &Path) -> Result<DetectionResult> {
        let img = preprocessing::load_image(image_path)?;
        let (width, height) = img.dimensions();
        let gray = preprocessing::to_grayscale(&img);

        let output = lsd::detect_segments(&gray, &self.config)?;
        if let Some(best) = output.nfa.iter().copied().reduce(f32::max) {
            debug!(
                "[{NAME}] {} segments, best -log10(NFA) {best:.1}, mean width {:.2}px",
                output.nfa.len(),
                output.widths.iter().sum::<f32>() / output.widths.len() as f32
            );
        }

        // Width, precision and NFA stay behind; only endpoints are canonical.
        let lines = output.lines.into_lines()?;
        Ok(DetectionResult::new(lines, width, height))
    }
}

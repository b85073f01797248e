pub mod deeplsd;
pub mod level_lines;
pub mod lsd_classic;
pub mod nfa;
pub mod preprocessing;
pub mod raw;

use crate::error::Result;
use crate::export;
use crate::models::DetectionResult;
use log::info;
use std::path::Path;

pub use deeplsd::DeepLsdDetector;
pub use lsd_classic::LsdClassicDetector;

/// Capability every line detection backend implements.
pub trait LineDetector {
    /// Human-readable name, used in log lines
    fn name(&self) -> &str;

    /// Registry key and output sub-directory; filesystem safe
    fn output_dir(&self) -> &str;

    /// Read the raster at `image_path` and return its segments in pixel space.
    fn detect(&mut self, image_path: &Path) -> Result<DetectionResult>;

    /// Detect, then write the segments as a DXF drawing to `output_path`.
    fn process(&mut self, image_path: &Path, output_path: &Path) -> Result<DetectionResult> {
        info!("[{}] Processing: {}", self.name(), image_path.display());
        let result = self.detect(image_path)?;
        info!("[{}] Detected {} line segments.", self.name(), result.len());

        export::save_to_dxf(&result, output_path)?;
        info!("[{}] Saved to: {}", self.name(), output_path.display());
        Ok(result)
    }
}

/// The built-in backends, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    LsdClassic,
    DeepLsd,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 2] = [DetectorKind::LsdClassic, DetectorKind::DeepLsd];

    pub fn key(self) -> &'static str {
        match self {
            Self::LsdClassic => lsd_classic::OUTPUT_DIR,
            Self::DeepLsd => deeplsd::OUTPUT_DIR,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::LsdClassic => lsd_classic::NAME,
            Self::DeepLsd => deeplsd::NAME,
        }
    }

    pub fn preset_names(self) -> &'static [&'static str] {
        match self {
            Self::LsdClassic => lsd_classic::config::PRESET_NAMES,
            Self::DeepLsd => deeplsd::config::PRESET_NAMES,
        }
    }

    pub fn has_preset(self, name: &str) -> bool {
        self.preset_names().contains(&name)
    }

    /// Build a detector, using `preset` when this backend defines it.
    pub fn build(self, preset: Option<&str>) -> Box<dyn LineDetector> {
        match self {
            Self::LsdClassic => {
                let config = preset
                    .and_then(lsd_classic::config::preset)
                    .unwrap_or_default();
                Box::new(LsdClassicDetector::new(config))
            }
            Self::DeepLsd => {
                let config = preset.and_then(deeplsd::config::preset).unwrap_or_default();
                Box::new(DeepLsdDetector::new(config))
            }
        }
    }
}

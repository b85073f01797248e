//! Learned line backend: a pretrained checkpoint run through `rten`.
//!
//! The checkpoint and device are resolved on first use and kept for the
//! lifetime of the detector instance.

pub mod config;
pub mod model;
pub mod postprocess;

pub use config::DeepLsdConfig;
pub use model::{Device, LineModel};

use crate::detection::raw::RawLines;
use crate::detection::{LineDetector, preprocessing};
use crate::error::Result;
use crate::models::{DetectionResult, Line};
use image::{GenericImageView, GrayImage};
use log::{debug, info};
use std::path::Path;

pub const NAME: &str = "DeepLSD";
pub const OUTPUT_DIR: &str = "deeplsd";

pub struct DeepLsdDetector {
    config: DeepLsdConfig,
    device: Option<Device>,
    model: Option<LineModel>,
}

impl DeepLsdDetector {
    pub fn new(config: DeepLsdConfig) -> Self {
        Self {
            config,
            device: None,
            model: None,
        }
    }

    pub fn config(&self) -> &DeepLsdConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    fn device(&mut self) -> Result<Device> {
        if let Some(device) = self.device {
            return Ok(device);
        }
        let device = Device::resolve(self.config.device.as_deref())?;
        info!("[{NAME}] Using device: {device}");
        self.device = Some(device);
        Ok(device)
    }

    fn model(&mut self) -> Result<&LineModel> {
        let model = match self.model.take() {
            Some(model) => model,
            None => {
                let device = self.device()?;
                let model = LineModel::load(&self.config.resolve_weights_path(), device)?;
                info!(
                    "[{NAME}] Model loaded from {} on {}",
                    model.path().display(),
                    model.device()
                );
                model
            }
        };
        Ok(self.model.insert(model))
    }
}

impl Default for DeepLsdDetector {
    fn default() -> Self {
        Self::new(DeepLsdConfig::default())
    }
}

impl LineDetector for DeepLsdDetector {
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

        let detect_lines = self.config.detect_lines;
        let model = self.model()?;
        if !detect_lines {
            return Ok(DetectionResult::empty(width, height));
        }

        let raw = model.infer(model::image_tensor(&gray))?;
        let lines = lines_from_output(raw, &gray, &self.config)?;
        Ok(DetectionResult::new(lines, width, height))
    }
}

/// Normalize a model output buffer and run the configured post-processing.
fn lines_from_output(
    raw: RawLines,
    gray: &GrayImage,
    config: &DeepLsdConfig,
) -> Result<Vec<Line>> {
    debug!("[{NAME}] Raw output shape {:?}", raw.shape());
    let lines = raw.into_lines()?;
    let found = lines.len();
    let lines = postprocess::apply(lines, gray, config);
    debug!(
        "[{NAME}] Kept {} of {found} segments after post-processing",
        lines.len()
    );
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::deeplsd::config::DEFAULT_CONFIG;
    use crate::error::DetectError;
    use image::Luma;

    fn write_image(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("edge.png");
        GrayImage::from_fn(16, 12, |x, _| Luma([if x < 8 { 0 } else { 255 }]))
            .save(&path)
            .unwrap();
        path
    }

    /// Two segments in `(1, N, 2, 2)` layout: one on the x = 15.5 edge, one in a flat area.
    fn model_output() -> RawLines {
        let data = vec![15.5, 2.0, 15.5, 29.0, 5.0, 2.0, 5.0, 29.0];
        RawLines::new(vec![1, 2, 2, 2], data)
    }

    fn edge_image() -> GrayImage {
        GrayImage::from_fn(32, 40, |x, _| Luma([if x < 16 { 0 } else { 255 }]))
    }

    #[test]
    fn model_output_becomes_flat_lines() {
        let config = DeepLsdConfig {
            filtering: false,
            grad_nfa: false,
            ..DEFAULT_CONFIG
        };
        let lines = lines_from_output(model_output(), &edge_image(), &config).unwrap();
        assert_eq!(lines, vec![[15.5, 2.0, 15.5, 29.0], [5.0, 2.0, 5.0, 29.0]]);

        let result = DetectionResult::new(lines, 32, 40);
        assert_eq!((result.image_width, result.image_height), (32, 40));
    }

    #[test]
    fn model_output_is_filtered_against_the_image() {
        let lines = lines_from_output(model_output(), &edge_image(), &DEFAULT_CONFIG).unwrap();
        assert_eq!(lines, vec![[15.5, 2.0, 15.5, 29.0]]);
    }

    #[test]
    fn mismatched_model_output_is_malformed() {
        let raw = RawLines::new(vec![1, 2, 2, 2], vec![1.0, 2.0, 3.0]);
        let err = lines_from_output(raw, &edge_image(), &DEFAULT_CONFIG).unwrap_err();
        assert!(matches!(err, DetectError::MalformedOutput(_)), "{err}");
    }

    #[test]
    fn missing_checkpoint_is_a_load_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let image = write_image(dir.path());
        let config = DeepLsdConfig::default().with_weights_path(dir.path().join("none.rten"));
        let mut detector = DeepLsdDetector::new(config);

        let err = detector.detect(&image).unwrap_err();
        assert!(matches!(err, DetectError::ModelLoad { .. }), "{err}");
        assert!(!detector.is_loaded());
    }

    #[test]
    fn image_is_checked_before_the_model() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DeepLsdConfig::default().with_weights_path(dir.path().join("none.rten"));
        let mut detector = DeepLsdDetector::new(config);

        let err = detector.detect(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, DetectError::ImageNotFound { .. }), "{err}");
    }

    #[test]
    fn unsupported_device_override_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let image = write_image(dir.path());
        let config = DeepLsdConfig {
            device: Some("tpu".into()),
            ..DeepLsdConfig::default()
        };
        let mut detector = DeepLsdDetector::new(config);

        let err = detector.detect(&image).unwrap_err();
        assert!(matches!(err, DetectError::Device { .. }), "{err}");
    }
}

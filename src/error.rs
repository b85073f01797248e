//! Error taxonomy shared by detectors, the registry and the export engine.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DetectError>;

#[derive(Debug, Error)]
pub enum DetectError {
    /// Raster path is missing or does not decode to an image.
    #[error("Image not found: {} ({reason})", path.display())]
    ImageNotFound { path: PathBuf, reason: String },

    #[error("Unknown detector: {key}. Available: {}", available.join(", "))]
    UnknownBackend { key: String, available: Vec<String> },

    #[error("Detector already registered: {key}")]
    DuplicateBackend { key: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load model from {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Unsupported device: {requested}")]
    Device { requested: String },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Malformed detector output: {0}")]
    MalformedOutput(String),

    #[error("Failed to write {}: {reason}", path.display())]
    Export { path: PathBuf, reason: String },
}

impl DetectError {
    pub fn image_not_found(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ImageNotFound {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn export(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Export {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_lists_registered_keys() {
        let err = DetectError::UnknownBackend {
            key: "hough".into(),
            available: vec!["lsd_classic".into(), "deeplsd".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown detector: hough. Available: lsd_classic, deeplsd"
        );
    }
}

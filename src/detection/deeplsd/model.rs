//! Checkpoint loading, device selection and inference for the learned backend.

use crate::detection::raw::RawLines;
use crate::error::{DetectError, Result};
use image::GrayImage;
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::{NdTensor, Tensor};
use std::fmt;
use std::path::{Path, PathBuf};

/// Compute device the model runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
}

impl Device {
    /// Explicit override wins; otherwise auto-detect.
    pub fn resolve(requested: Option<&str>) -> Result<Self> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => Self::parse(name),
            None => Ok(Self::auto_detect()),
        }
    }

    fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            _ => Err(DetectError::Device {
                requested: name.to_string(),
            }),
        }
    }

    /// The rten runtime has no accelerator backends, so detection settles on CPU.
    pub fn auto_detect() -> Self {
        Self::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

/// A loaded line model bound to a device.
pub struct LineModel {
    model: Model,
    device: Device,
    path: PathBuf,
}

impl LineModel {
    pub fn load(path: &Path, device: Device) -> Result<Self> {
        let load_error = |reason: String| DetectError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };
        if !path.is_file() {
            return Err(load_error("checkpoint not found".to_string()));
        }

        let model = Model::load_file(path).map_err(|e| load_error(e.to_string()))?;
        if model.input_ids().len() != 1 {
            return Err(load_error(format!(
                "expected a single image input, model has {}",
                model.input_ids().len()
            )));
        }
        if model.output_ids().is_empty() {
            return Err(load_error("model has no outputs".to_string()));
        }

        Ok(Self {
            model,
            device,
            path: path.to_path_buf(),
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the model on a `[1, 1, H, W]` image tensor and return its line output.
    pub fn infer(&self, input: NdTensor<f32, 4>) -> Result<RawLines> {
        let output = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        let lines: Tensor<f32> = output
            .try_into()
            .map_err(|e| DetectError::MalformedOutput(format!("line output is not f32: {e}")))?;
        Ok(RawLines::new(lines.shape().to_vec(), lines.to_vec()))
    }
}

/// Single-channel `[1, 1, H, W]` tensor with intensities scaled to [0, 1].
pub fn image_tensor(gray: &GrayImage) -> NdTensor<f32, 4> {
    let (width, height) = gray.dimensions();
    let data: Vec<f32> = gray.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    NdTensor::from_data([1, 1, height as usize, width as usize], data)
}

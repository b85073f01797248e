use crate::error::{DetectError, Result};
use serde::{Deserialize, Serialize};

/// How hard the detector works to rescue sparse or weak regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineMode {
    /// Reject regions that fail the density test (fast, least precise)
    None,
    /// Shrink sparse regions around their seed until dense enough
    #[default]
    Standard,
    /// Standard, plus rectangle narrowing and precision tuning to improve NFA
    Advanced,
}

/// Parameters of the classical Line Segment Detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LsdClassicConfig {
    pub refine_mode: RefineMode,
    /// Resampling factor applied before detection (0, 1]; smaller is faster
    pub scale: f32,
    /// Gaussian sigma is `sigma_scale / scale` when shrinking
    pub sigma_scale: f32,
    /// Level-line angle tolerance in degrees
    pub angle_tolerance: f32,
    /// Minimum fraction of region pixels inside the fitted rectangle
    pub density_threshold: f32,
    /// Number of magnitude bins for pseudo-ordering seeds
    pub n_bins: usize,
}

pub const DEFAULT_CONFIG: LsdClassicConfig = LsdClassicConfig {
    refine_mode: RefineMode::Standard,
    scale: 0.8,
    sigma_scale: 0.6,
    angle_tolerance: 22.5,
    density_threshold: 0.7,
    n_bins: 1024,
};

/// Slower, full-resolution detection.
pub const HIGH_ACCURACY_CONFIG: LsdClassicConfig = LsdClassicConfig {
    refine_mode: RefineMode::Advanced,
    scale: 1.0,
    ..DEFAULT_CONFIG
};

/// Half-resolution detection without refinement.
pub const FAST_CONFIG: LsdClassicConfig = LsdClassicConfig {
    refine_mode: RefineMode::None,
    scale: 0.5,
    ..DEFAULT_CONFIG
};

pub const PRESET_NAMES: &[&str] = &["default", "high_accuracy", "fast"];

/// Look up a named preset.
pub fn preset(name: &str) -> Option<LsdClassicConfig> {
    match name {
        "default" => Some(DEFAULT_CONFIG),
        "high_accuracy" => Some(HIGH_ACCURACY_CONFIG),
        "fast" => Some(FAST_CONFIG),
        _ => None,
    }
}

impl Default for LsdClassicConfig {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

impl LsdClassicConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(DetectError::InvalidConfig(msg));
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return invalid(format!("scale must be positive, got {}", self.scale));
        }
        if !(self.sigma_scale.is_finite() && self.sigma_scale > 0.0) {
            return invalid(format!(
                "sigma_scale must be positive, got {}",
                self.sigma_scale
            ));
        }
        if !(self.angle_tolerance > 0.0 && self.angle_tolerance < 180.0) {
            return invalid(format!(
                "angle_tolerance must be in (0, 180) degrees, got {}",
                self.angle_tolerance
            ));
        }
        if !(0.0..=1.0).contains(&self.density_threshold) {
            return invalid(format!(
                "density_threshold must be in [0, 1], got {}",
                self.density_threshold
            ));
        }
        if self.n_bins == 0 {
            return invalid("n_bins must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_only_where_named() {
        assert_eq!(preset("default"), Some(LsdClassicConfig::default()));
        let fast = preset("fast").unwrap();
        assert_eq!(fast.refine_mode, RefineMode::None);
        assert_eq!(fast.scale, 0.5);
        assert_eq!(fast.n_bins, DEFAULT_CONFIG.n_bins);
        assert!(preset("strict").is_none());
        for name in PRESET_NAMES {
            assert!(preset(name).unwrap().validate().is_ok());
        }
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: LsdClassicConfig =
            serde_json::from_str(r#"{"refine_mode": "advanced", "scale": 1.0}"#).unwrap();
        assert_eq!(config.refine_mode, RefineMode::Advanced);
        assert_eq!(config.angle_tolerance, 22.5);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = LsdClassicConfig {
            scale: 0.0,
            ..DEFAULT_CONFIG
        };
        assert!(config.validate().is_err());
        let config = LsdClassicConfig {
            n_bins: 0,
            ..DEFAULT_CONFIG
        };
        assert!(config.validate().is_err());
    }
}

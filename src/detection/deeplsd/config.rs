use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment variable overriding the checkpoint location.
pub const WEIGHTS_ENV_VAR: &str = "DEEPLSD_WEIGHTS";
pub const DEFAULT_WEIGHTS_PATH: &str = "/opt/DeepLSD/weights/deeplsd_wireframe.rten";

/// Parameters of the learned line detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepLsdConfig {
    /// Explicit checkpoint path; wins over `DEEPLSD_WEIGHTS`
    pub weights_path: Option<PathBuf>,
    /// Run line extraction at all
    pub detect_lines: bool,
    /// Merge near-collinear touching segments
    pub merge_lines: bool,
    /// Drop segments with weak image gradient along them
    pub filtering: bool,
    /// Minimum mean gradient magnitude (intensity units) when filtering
    pub grad_thresh: f32,
    /// Require a significant gradient-alignment NFA
    pub grad_nfa: bool,
    /// Device override, e.g. "cpu"; auto-detected when unset
    pub device: Option<String>,
}

/// Indoor/wireframe defaults.
pub const DEFAULT_CONFIG: DeepLsdConfig = DeepLsdConfig {
    weights_path: None,
    detect_lines: true,
    merge_lines: false,
    filtering: true,
    grad_thresh: 3.0,
    grad_nfa: true,
    device: None,
};

/// Keeps more segments.
pub const HIGH_SENSITIVITY_CONFIG: DeepLsdConfig = DeepLsdConfig {
    grad_thresh: 2.0,
    filtering: false,
    ..DEFAULT_CONFIG
};

/// For noisy rasters.
pub const STRICT_CONFIG: DeepLsdConfig = DeepLsdConfig {
    grad_thresh: 5.0,
    filtering: true,
    merge_lines: true,
    ..DEFAULT_CONFIG
};

pub const PRESET_NAMES: &[&str] = &["default", "high_sensitivity", "strict"];

/// Look up a named preset.
pub fn preset(name: &str) -> Option<DeepLsdConfig> {
    match name {
        "default" => Some(DEFAULT_CONFIG),
        "high_sensitivity" => Some(HIGH_SENSITIVITY_CONFIG),
        "strict" => Some(STRICT_CONFIG),
        _ => None,
    }
}

impl Default for DeepLsdConfig {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

impl DeepLsdConfig {
    /// Copy of this configuration reading weights from `path`.
    pub fn with_weights_path(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            weights_path: Some(path.into()),
            ..self.clone()
        }
    }

    /// Checkpoint location: explicit path, then environment, then default.
    pub fn resolve_weights_path(&self) -> PathBuf {
        self.weights_path
            .clone()
            .or_else(|| env::var_os(WEIGHTS_ENV_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WEIGHTS_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_weights_path_wins() {
        let config = DEFAULT_CONFIG.with_weights_path("/tmp/model.rten");
        assert_eq!(config.resolve_weights_path(), PathBuf::from("/tmp/model.rten"));
        assert_eq!(DEFAULT_CONFIG.weights_path, None);
    }

    #[test]
    fn strict_preset_merges_and_filters() {
        let strict = preset("strict").unwrap();
        assert!(strict.merge_lines && strict.filtering);
        assert_eq!(strict.grad_thresh, 5.0);
        let sensitive = preset("high_sensitivity").unwrap();
        assert!(!sensitive.filtering);
        assert_eq!(sensitive.grad_nfa, DEFAULT_CONFIG.grad_nfa);
        assert!(preset("fast").is_none());
    }

    #[test]
    fn config_reads_from_json() {
        let config: DeepLsdConfig =
            serde_json::from_str(r#"{"device": "cpu", "merge_lines": true}"#).unwrap();
        assert_eq!(config.device.as_deref(), Some("cpu"));
        assert!(config.merge_lines);
        assert!(config.detect_lines);
    }
}

//! Driver: runs one or every registered detector against an input raster.

use crate::error::Result;
use crate::models::DetectionResult;
use crate::registry::Registry;
use log::warn;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

pub const RESULT_FILE_NAME: &str = "result.dxf";
/// Shown in the summary table for a backend that failed.
pub const FAILURE_SENTINEL: &str = "Error";

/// `<output_base>/<key>/result.dxf`
pub fn output_path_for(output_base: &Path, key: &str) -> PathBuf {
    output_base.join(key).join(RESULT_FILE_NAME)
}

/// What happened to one backend in an all-backends run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Detected(usize),
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detected(count) => write!(f, "{count}"),
            Self::Failed(_) => write!(f, "{FAILURE_SENTINEL}"),
        }
    }
}

/// Per-backend outcomes in the order the backends ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonReport {
    pub rows: Vec<(String, Outcome)>,
}

impl ComparisonReport {
    pub fn outcome(&self, key: &str) -> Option<&Outcome> {
        self.rows.iter().find(|(k, _)| k == key).map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> usize {
        self.rows
            .iter()
            .filter(|(_, outcome)| matches!(outcome, Outcome::Failed(_)))
            .count()
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<20} {:<15}", "Detector", "Lines Detected")?;
        writeln!(f, "{}", "-".repeat(35))?;
        for (key, outcome) in &self.rows {
            writeln!(f, "{:<20} {:<15}", key, outcome.to_string())?;
        }
        Ok(())
    }
}

pub struct Pipeline {
    registry: Registry,
    input: PathBuf,
    output_base: PathBuf,
}

impl Pipeline {
    pub fn new(
        registry: Registry,
        input: impl Into<PathBuf>,
        output_base: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            input: input.into(),
            output_base: output_base.into(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run the detector registered under `key`; every error propagates.
    pub fn run_detector(&self, key: &str) -> Result<DetectionResult> {
        let mut detector = self.registry.get(key)?;
        detector.process(&self.input, &output_path_for(&self.output_base, key))
    }

    /// Run every registered detector in registration order.
    ///
    /// A backend that errors or panics is logged and recorded as failed; the
    /// remaining backends still run.
    pub fn run_all(&self) -> ComparisonReport {
        let mut report = ComparisonReport::default();
        for key in self.registry.list_available() {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.run_detector(key))) {
                Ok(Ok(result)) => Outcome::Detected(result.len()),
                Ok(Err(e)) => {
                    warn!("[{key}] Error: {e}");
                    Outcome::Failed(e.to_string())
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!("[{key}] Error: {message}");
                    Outcome::Failed(message)
                }
            };
            report.rows.push((key.to_string(), outcome));
        }
        report
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "detector panicked".to_string())
}

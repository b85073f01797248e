pub mod detection;
pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod registry;

pub use detection::{DetectorKind, LineDetector};
pub use error::{DetectError, Result};
pub use models::{DetectionResult, Line};
pub use pipeline::{ComparisonReport, Outcome, Pipeline};
pub use registry::Registry;

#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from rastervec for tests
pub use rastervec::{DetectError, DetectionResult, LineDetector, Outcome, Pipeline, Registry};

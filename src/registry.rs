//! Name-keyed factory for line detectors.
//!
//! Built once at startup by listing every backend explicitly and then passed
//! to the driver; lookups never mutate it.

use crate::detection::{DetectorKind, LineDetector};
use crate::error::{DetectError, Result};
use log::debug;

pub type Constructor = Box<dyn Fn() -> Box<dyn LineDetector>>;

#[derive(Default)]
pub struct Registry {
    entries: Vec<(String, Constructor)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in backend with its default configuration.
    pub fn with_builtin_detectors() -> Result<Self> {
        Self::build(None)
    }

    /// Registry whose backends use the named preset where they define it.
    pub fn with_preset(name: &str) -> Result<Self> {
        if !DetectorKind::ALL.iter().any(|kind| kind.has_preset(name)) {
            return Err(DetectError::InvalidConfig(format!("unknown preset: {name}")));
        }
        Self::build(Some(name))
    }

    fn build(preset: Option<&str>) -> Result<Self> {
        let mut registry = Self::new();
        for kind in DetectorKind::ALL {
            let preset = preset.map(str::to_string);
            registry.register(move || kind.build(preset.as_deref()))?;
        }
        Ok(registry)
    }

    /// Store `constructor` under the `output_dir` of the detector it builds.
    ///
    /// The constructor runs once here to read the key; a key that is already
    /// registered is rejected.
    pub fn register<F>(&mut self, constructor: F) -> Result<()>
    where
        F: Fn() -> Box<dyn LineDetector> + 'static,
    {
        let key = constructor().output_dir().to_string();
        if self.contains(&key) {
            return Err(DetectError::DuplicateBackend { key });
        }
        debug!("Registered detector: {key}");
        self.entries.push((key, Box::new(constructor)));
        Ok(())
    }

    /// A fresh detector instance for `key`.
    pub fn get(&self, key: &str) -> Result<Box<dyn LineDetector>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, constructor)| constructor())
            .ok_or_else(|| DetectError::UnknownBackend {
                key: key.to_string(),
                available: self.list_available().into_iter().map(String::from).collect(),
            })
    }

    /// Registered keys, in registration order.
    pub fn list_available(&self) -> Vec<&str> {
        self.entries.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

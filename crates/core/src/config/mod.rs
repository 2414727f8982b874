use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{LedMatrixError, Result};

/// Top-level configuration structure for the display service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Number of device slots in the registry.
    pub capacity: usize,
    pub worker: WorkerConfig,
    pub spectrum: SpectrumConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            worker: WorkerConfig::default(),
            spectrum: SpectrumConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|err| LedMatrixError::msg(format!("invalid config: {err}")))
    }
}

/// Configuration for the per-device redraw loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Nominal tick period in milliseconds.
    pub tick_millis: u64,
    /// Lower bound on any single sleep, so the loop never busy-spins.
    pub min_sleep_millis: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tick_millis: 500,
            min_sleep_millis: 50,
        }
    }
}

/// Configuration specific to the spectrum analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumConfig {
    /// Length of the forward transform input, in samples.
    pub transform_len: usize,
    /// Number of display bars the amplitude scale targets.
    pub bars: usize,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            transform_len: 512,
            bars: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_four_half_second_devices() {
        let config = ServiceConfig::default();
        assert_eq!(config.capacity, 4);
        assert_eq!(config.worker.tick_millis, 500);
        assert_eq!(config.worker.min_sleep_millis, 50);
        assert_eq!(config.spectrum.transform_len, 512);
        assert_eq!(config.spectrum.bars, 16);
    }

    #[test]
    fn loads_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.json");
        let json = serde_json::to_string(&ServiceConfig::default()).unwrap();
        std::fs::write(&path, json).unwrap();

        let config = ServiceConfig::from_json_file(&path).unwrap();
        assert_eq!(config.spectrum.bars, 16);
    }

    #[test]
    fn rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(ServiceConfig::from_json_file(&path).is_err());
    }
}

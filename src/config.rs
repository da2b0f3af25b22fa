//! Configuration for the HAR service.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of sensor channels per sample (accelerometer x/y/z plus
/// gyroscope x/y/z).
pub const DEFAULT_NUM_CHANNELS: usize = 6;

/// Default number of readings per channel (50 Hz over a 2 second window).
pub const DEFAULT_SERIES_LENGTH: usize = 100;

/// Default number of random convolution kernels.
pub const DEFAULT_NUM_KERNELS: usize = 500;

/// Main configuration for the HAR service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for persistent state
    pub data_dir: PathBuf,

    /// Path to the accumulating training dataset (.ts file)
    pub dataset_path: PathBuf,

    /// Path to the serialized classifier artifact
    pub model_path: PathBuf,

    /// Directory where upload audit records are stored
    pub uploads_dir: PathBuf,

    /// Host to bind the HTTP server to
    pub host: String,

    /// Port to bind the HTTP server to (0 for random)
    pub port: u16,

    /// Expected number of channels per sample
    pub num_channels: usize,

    /// Expected number of readings per channel
    pub series_length: usize,

    /// Number of random convolution kernels used by the classifier
    pub num_kernels: usize,

    /// Seed for kernel sampling (fixed so retrains are reproducible)
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("har-service");

        Self {
            dataset_path: data_dir.join("train.ts"),
            model_path: data_dir.join("classifier.bin"),
            uploads_dir: data_dir.join("uploads"),
            data_dir,
            host: "0.0.0.0".to_string(),
            port: 5000,
            num_channels: DEFAULT_NUM_CHANNELS,
            series_length: DEFAULT_SERIES_LENGTH,
            num_kernels: DEFAULT_NUM_KERNELS,
            seed: 42,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("har-service")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.uploads_dir)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.num_channels, 6);
        assert_eq!(config.series_length, 100);
        assert_eq!(config.port, 5000);
        assert!(config.dataset_path.ends_with("train.ts"));
        assert!(config.model_path.ends_with("classifier.bin"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.num_kernels, config.num_kernels);
        assert_eq!(parsed.host, config.host);
    }
}

/*!
Configuration management for the frame grabber application.
*/

use serde::{Deserialize, Serialize};
use shared::timing::{DecoderConfig, SignalMap};
use shared::video::{DEFAULT_PREFIX, MAX_DIMENSION};
use std::path::Path;
use anyhow::{bail, Context, Result};
use tracing::warn;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub decoder: DecoderConfig,
    pub signals: SignalMap,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            signals: SignalMap::default(),
            output: OutputConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse config file as TOML")?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::new());
        }

        Self::load_from_file(path)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Reject settings the decoder cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.decoder.width == 0 || self.decoder.height == 0 {
            bail!(
                "Frame size must be non-zero, got {}x{}",
                self.decoder.width,
                self.decoder.height
            );
        }
        if self.decoder.width > MAX_DIMENSION || self.decoder.height > MAX_DIMENSION {
            bail!(
                "Frame size {}x{} exceeds the {} pixel limit per side",
                self.decoder.width,
                self.decoder.height,
                MAX_DIMENSION
            );
        }
        if self.decoder.progress_interval == 0 {
            bail!("progress_interval must be at least 1");
        }
        if self.output.prefix.is_empty() {
            bail!("Output prefix must not be empty");
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Output file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Filename prefix, frames are saved as `<prefix>_NNN.png`
    pub prefix: String,

    /// Directory the PNG files are written to
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            directory: ".".to_string(),
        }
    }
}

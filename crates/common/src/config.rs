//! Application configuration.
//!
//! Values come from an optional YAML file; command-line flags are applied on
//! top through [`ConfigOverrides`]. Every field has a default so an empty file
//! (or no file at all) is a valid configuration.

use crate::types::{ExampleKind, SurfaceSize};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors from loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Adapter selection hint. Only a suggestion to the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "primer".into(),
            width: 800,
            height: 800,
        }
    }
}

impl WindowConfig {
    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }
}

/// Full application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Lesson to run.
    pub example: ExampleKind,
    pub window: WindowConfig,
    /// Image used by the textured lessons. A generated checkerboard is used when unset.
    pub texture: Option<PathBuf>,
    /// Present with vertical sync (FIFO) instead of the lowest-latency mode available.
    pub vsync: bool,
    pub power: PowerPreference,
    /// Stop the frame loop after this many frames.
    pub frame_limit: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            example: ExampleKind::default(),
            window: WindowConfig::default(),
            texture: None,
            vsync: true,
            power: PowerPreference::default(),
            frame_limit: None,
        }
    }
}

/// Values supplied on the command line. `None` leaves the file value untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub example: Option<ExampleKind>,
    pub texture: Option<PathBuf>,
    pub frame_limit: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl AppConfig {
    /// Load a configuration file. The result is validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` when given, otherwise start from the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a struct.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    /// Apply command-line overrides, then re-validate.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(example) = overrides.example {
            self.example = example;
        }
        if let Some(texture) = overrides.texture {
            self.texture = Some(texture);
        }
        if let Some(limit) = overrides.frame_limit {
            self.frame_limit = Some(limit);
        }
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.frame_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "frame_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

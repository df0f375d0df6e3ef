//! Shared types and configuration for the primer lessons.

pub mod config;
pub mod types;

pub use config::{AppConfig, ConfigError, ConfigOverrides, PowerPreference, WindowConfig};
pub use types::{ExampleKind, SurfaceSize, UnknownExample};

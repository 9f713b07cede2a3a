//! Settings storage port interface

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::Settings;
use crate::domain::error::ConfigError;

/// Port for settings storage
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load settings from storage.
    ///
    /// # Returns
    /// The loaded settings (may have None fields if file doesn't exist)
    async fn load(&self) -> Result<Settings, ConfigError>;

    /// Save settings to storage.
    async fn save(&self, settings: &Settings) -> Result<(), ConfigError>;

    /// Get the settings file path.
    fn path(&self) -> PathBuf;

    /// Check if the settings file exists.
    fn exists(&self) -> bool;

    /// Initialize the settings file with defaults.
    /// Fails if file already exists.
    async fn init(&self) -> Result<(), ConfigError>;
}

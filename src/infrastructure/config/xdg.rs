//! XDG settings store adapter

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::application::ports::SettingsStore;
use crate::domain::config::Settings;
use crate::domain::error::ConfigError;

/// XDG-compliant settings store
pub struct XdgSettingsStore {
    path: PathBuf,
}

impl XdgSettingsStore {
    /// Create a new XDG settings store with default path
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("talktally");

        Self {
            path: config_dir.join("settings.toml"),
        }
    }

    /// Create with custom path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse TOML content into Settings
    fn parse_toml(content: &str) -> Result<Settings, ConfigError> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(settings)
    }

    /// Serialize Settings to TOML
    fn to_toml(settings: &Settings) -> Result<String, ConfigError> {
        toml::to_string_pretty(settings).map_err(|e| ConfigError::WriteError(e.to_string()))
    }
}

impl Default for XdgSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for XdgSettingsStore {
    async fn load(&self) -> Result<Settings, ConfigError> {
        if !self.exists() {
            // Return empty settings if file doesn't exist
            return Ok(Settings::empty());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Self::parse_toml(&content)
    }

    async fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let content = Self::to_toml(settings)?;

        fs::write(&self.path, content)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    async fn init(&self) -> Result<(), ConfigError> {
        if self.exists() {
            return Err(ConfigError::AlreadyExists(
                self.path.to_string_lossy().to_string(),
            ));
        }

        let defaults = Settings::defaults();
        self.save(&defaults).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_is_xdg() {
        let store = XdgSettingsStore::new();
        let path = store.path();
        assert!(path.to_string_lossy().contains("talktally"));
        assert!(path.to_string_lossy().contains("settings.toml"));
    }

    #[test]
    fn custom_path() {
        let store = XdgSettingsStore::with_path("/custom/path/settings.toml");
        assert_eq!(store.path(), PathBuf::from("/custom/path/settings.toml"));
    }

    #[test]
    fn parse_toml_flat_format() {
        let content = r#"
device_name = "TalkTally Aggregate"
mic_channels = "2"
file_format = "flac"
output_mixed = true
"#;

        let settings = XdgSettingsStore::parse_toml(content).unwrap();
        assert_eq!(
            settings.device_name,
            Some("TalkTally Aggregate".to_string())
        );
        assert_eq!(settings.mic_channels, Some("2".to_string()));
        assert_eq!(settings.file_format, Some("flac".to_string()));
        assert_eq!(settings.output_mixed, Some(true));
    }

    #[test]
    fn to_toml_round_trip() {
        let settings = Settings {
            device_name: Some("Loopback".to_string()),
            mic_channels: Some("2".to_string()),
            file_format: Some("mp3".to_string()),
            mp3_bitrate_kbps: Some(256),
            ..Settings::empty()
        };

        let toml = XdgSettingsStore::to_toml(&settings).unwrap();
        let parsed = XdgSettingsStore::parse_toml(&toml).unwrap();

        assert_eq!(settings.device_name, parsed.device_name);
        assert_eq!(settings.mic_channels, parsed.mic_channels);
        assert_eq!(settings.file_format, parsed.file_format);
        assert_eq!(settings.mp3_bitrate_kbps, parsed.mp3_bitrate_kbps);
    }

    #[tokio::test]
    async fn load_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgSettingsStore::with_path(dir.path().join("settings.toml"));

        let settings = store.load().await.unwrap();
        assert_eq!(settings, Settings::empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgSettingsStore::with_path(dir.path().join("nested").join("settings.toml"));

        let mut settings = Settings::empty();
        settings.wav_sample_rate = Some(44100);
        store.save(&settings).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.wav_sample_rate, Some(44100));
    }

    #[tokio::test]
    async fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgSettingsStore::with_path(dir.path().join("settings.toml"));

        store.init().await.unwrap();
        let err = store.init().await.unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists(_)));
    }
}

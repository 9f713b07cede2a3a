//! Config command handler

use crate::application::ports::SettingsStore;
use crate::domain::config::Settings;
use crate::domain::error::ConfigError;

use super::args::{is_valid_settings_key, ConfigAction, VALID_SETTINGS_KEYS};
use super::presenter::Presenter;

/// Handle config subcommand
pub async fn handle_config_command<S: SettingsStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: SettingsStore>(
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Settings file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: SettingsStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    if !is_valid_settings_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_SETTINGS_KEYS.join(", ")),
        });
    }

    let mut settings = store.load().await?;
    settings.set_value(key, value)?;

    // Format and channel keys get checked against the merged view so a
    // bad value is rejected before it lands in the file.
    match key {
        "file_format" | "wav_sample_rate" | "wav_bit_depth" | "mp3_bitrate_kbps"
        | "flac_sample_rate" | "flac_bit_depth" | "flac_level" => {
            Settings::defaults().merge(settings.clone()).encode_format()?;
        }
        "mic_channels" | "system_channels" => {
            Settings::defaults()
                .merge(settings.clone())
                .channel_map()
                .map_err(|e| ConfigError::ValidationError {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
        }
        _ => {}
    }

    store.save(&settings).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: SettingsStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    if !is_valid_settings_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_SETTINGS_KEYS.join(", ")),
        });
    }

    let settings = store.load().await?;

    match get_value(&settings, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output("(not set)"),
    }

    Ok(())
}

async fn handle_list<S: SettingsStore>(
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    let settings = store.load().await?;

    for key in VALID_SETTINGS_KEYS {
        let value = get_value(&settings, key).unwrap_or_else(|| "(not set)".to_string());
        presenter.key_value(key, &value);
    }

    Ok(())
}

fn handle_path<S: SettingsStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

/// Read a field by its settings-file key, as display text
fn get_value(settings: &Settings, key: &str) -> Option<String> {
    match key {
        "device_name" => settings.device_name.clone(),
        "mic_channels" => settings.mic_channels.clone(),
        "system_channels" => settings.system_channels.clone(),
        "output_dir" => settings.output_dir.clone(),
        "mic_filename" => settings.mic_filename.clone(),
        "system_filename" => settings.system_filename.clone(),
        "mixed_filename" => settings.mixed_filename.clone(),
        "output_mic" => settings.output_mic.map(|b| b.to_string()),
        "output_system" => settings.output_system.map(|b| b.to_string()),
        "output_mixed" => settings.output_mixed.map(|b| b.to_string()),
        "file_format" => settings.file_format.clone(),
        "wav_sample_rate" => settings.wav_sample_rate.map(|n| n.to_string()),
        "wav_bit_depth" => settings.wav_bit_depth.map(|n| n.to_string()),
        "mp3_bitrate_kbps" => settings.mp3_bitrate_kbps.map(|n| n.to_string()),
        "flac_sample_rate" => settings.flac_sample_rate.map(|n| n.to_string()),
        "flac_bit_depth" => settings.flac_bit_depth.map(|n| n.to_string()),
        "flac_level" => settings.flac_level.map(|n| n.to_string()),
        "dictation_enable" => settings.dictation_enable.map(|b| b.to_string()),
        "dictation_command" => settings.dictation_command.clone(),
        "dictation_model" => settings.dictation_model.clone(),
        "dictation_sample_rate" => settings.dictation_sample_rate.map(|n| n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &std::path::Path) -> crate::infrastructure::XdgSettingsStore {
        crate::infrastructure::XdgSettingsStore::with_path(dir.join("settings.toml"))
    }

    #[tokio::test]
    async fn set_then_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let presenter = Presenter::new();

        handle_set(&store, &presenter, "file_format", "flac")
            .await
            .unwrap();

        let settings = store.load().await.unwrap();
        assert_eq!(settings.file_format, Some("flac".to_string()));
    }

    #[tokio::test]
    async fn set_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let presenter = Presenter::new();

        let err = handle_set(&store, &presenter, "not_a_key", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn set_invalid_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let presenter = Presenter::new();

        let err = handle_set(&store, &presenter, "file_format", "ogg")
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
        // Nothing persisted
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn set_unparseable_channels_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let presenter = Presenter::new();

        let err = handle_set(&store, &presenter, "mic_channels", "left,right")
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn get_value_reads_every_kind() {
        let mut settings = Settings::empty();
        settings.device_name = Some("Loopback".to_string());
        settings.output_mic = Some(true);
        settings.wav_sample_rate = Some(44100);

        assert_eq!(
            get_value(&settings, "device_name"),
            Some("Loopback".to_string())
        );
        assert_eq!(get_value(&settings, "output_mic"), Some("true".to_string()));
        assert_eq!(
            get_value(&settings, "wav_sample_rate"),
            Some("44100".to_string())
        );
        assert_eq!(get_value(&settings, "file_format"), None);
    }
}

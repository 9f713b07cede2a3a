//! Persisted settings value object

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::audio::{ChannelMap, InvalidChannelMap};
use crate::domain::encoding::{EncodeFormat, FlacSettings, Mp3Settings, WavSettings};
use crate::domain::error::ConfigError;
use crate::domain::output::{OutputSpec, OutputTarget};

/// Persisted settings.
/// All fields are optional to support partial files and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    // Device and channel mapping
    pub device_name: Option<String>,
    pub mic_channels: Option<String>,
    pub system_channels: Option<String>,

    // Output directory and per-target filenames
    pub output_dir: Option<String>,
    pub mic_filename: Option<String>,
    pub system_filename: Option<String>,
    pub mixed_filename: Option<String>,
    pub output_mic: Option<bool>,
    pub output_system: Option<bool>,
    pub output_mixed: Option<bool>,

    // File format and encoding parameters (apply to all outputs)
    pub file_format: Option<String>,
    pub wav_sample_rate: Option<u32>,
    pub wav_bit_depth: Option<u16>,
    pub mp3_bitrate_kbps: Option<u32>,
    pub flac_sample_rate: Option<u32>,
    pub flac_bit_depth: Option<u16>,
    pub flac_level: Option<u8>,

    // Dictation (push-to-talk)
    pub dictation_enable: Option<bool>,
    pub dictation_command: Option<String>,
    pub dictation_model: Option<String>,
    pub dictation_sample_rate: Option<u32>,
}

impl Settings {
    /// Create settings with default values
    pub fn defaults() -> Self {
        Self {
            device_name: Some(String::new()),
            mic_channels: Some("2".to_string()),
            system_channels: Some("0,1".to_string()),
            output_dir: Some(".".to_string()),
            mic_filename: Some("mic".to_string()),
            system_filename: Some("system".to_string()),
            mixed_filename: Some("mixed".to_string()),
            output_mic: Some(true),
            output_system: Some(true),
            output_mixed: Some(true),
            file_format: Some("wav".to_string()),
            wav_sample_rate: Some(48_000),
            wav_bit_depth: Some(16),
            mp3_bitrate_kbps: Some(192),
            flac_sample_rate: Some(48_000),
            flac_bit_depth: Some(16),
            flac_level: Some(5),
            dictation_enable: Some(false),
            dictation_command: Some("whisper".to_string()),
            dictation_model: Some("base".to_string()),
            dictation_sample_rate: Some(16_000),
        }
    }

    /// Create empty settings (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge these settings with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            device_name: other.device_name.or(self.device_name),
            mic_channels: other.mic_channels.or(self.mic_channels),
            system_channels: other.system_channels.or(self.system_channels),
            output_dir: other.output_dir.or(self.output_dir),
            mic_filename: other.mic_filename.or(self.mic_filename),
            system_filename: other.system_filename.or(self.system_filename),
            mixed_filename: other.mixed_filename.or(self.mixed_filename),
            output_mic: other.output_mic.or(self.output_mic),
            output_system: other.output_system.or(self.output_system),
            output_mixed: other.output_mixed.or(self.output_mixed),
            file_format: other.file_format.or(self.file_format),
            wav_sample_rate: other.wav_sample_rate.or(self.wav_sample_rate),
            wav_bit_depth: other.wav_bit_depth.or(self.wav_bit_depth),
            mp3_bitrate_kbps: other.mp3_bitrate_kbps.or(self.mp3_bitrate_kbps),
            flac_sample_rate: other.flac_sample_rate.or(self.flac_sample_rate),
            flac_bit_depth: other.flac_bit_depth.or(self.flac_bit_depth),
            flac_level: other.flac_level.or(self.flac_level),
            dictation_enable: other.dictation_enable.or(self.dictation_enable),
            dictation_command: other.dictation_command.or(self.dictation_command),
            dictation_model: other.dictation_model.or(self.dictation_model),
            dictation_sample_rate: other.dictation_sample_rate.or(self.dictation_sample_rate),
        }
    }

    /// Get device name, or empty (system default) if not set
    pub fn device_name_or_default(&self) -> &str {
        self.device_name.as_deref().unwrap_or("")
    }

    /// Get the channel map parsed from mic/system channel strings
    pub fn channel_map(&self) -> Result<ChannelMap, InvalidChannelMap> {
        ChannelMap::parse(
            self.mic_channels.as_deref().unwrap_or("2"),
            self.system_channels.as_deref().unwrap_or("0,1"),
        )
    }

    /// Get output directory, or current directory if not set
    pub fn output_dir_or_default(&self) -> PathBuf {
        match self.output_dir.as_deref() {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from("."),
        }
    }

    /// Directory finished recordings land in
    pub fn recordings_dir(&self) -> PathBuf {
        self.output_dir_or_default().join("recordings")
    }

    /// Directory transcripts of recorded files are written to
    pub fn transcripts_dir(&self) -> PathBuf {
        self.output_dir_or_default().join("transcripts")
    }

    /// Build the encode format from file_format and the per-format parameters
    pub fn encode_format(&self) -> Result<EncodeFormat, ConfigError> {
        let format = match self.file_format.as_deref().unwrap_or("wav") {
            "wav" => EncodeFormat::Wav(WavSettings {
                sample_rate: self.wav_sample_rate.unwrap_or(48_000),
                bit_depth: self.wav_bit_depth.unwrap_or(16),
            }),
            "mp3" => EncodeFormat::Mp3(Mp3Settings {
                bitrate_kbps: self.mp3_bitrate_kbps.unwrap_or(192),
            }),
            "flac" => EncodeFormat::Flac(FlacSettings {
                sample_rate: self.flac_sample_rate.unwrap_or(48_000),
                bit_depth: self.flac_bit_depth.unwrap_or(16),
                compression_level: self.flac_level.unwrap_or(5),
            }),
            other => {
                return Err(ConfigError::ValidationError {
                    key: "file_format".to_string(),
                    message: format!("unknown format \"{other}\" (use wav, mp3, or flac)"),
                })
            }
        };
        format.validate().map_err(|e| ConfigError::ValidationError {
            key: "file_format".to_string(),
            message: e.to_string(),
        })?;
        Ok(format)
    }

    /// Build the per-target output specs from filenames, enable flags,
    /// and the shared format
    pub fn output_specs(&self) -> Result<Vec<OutputSpec>, ConfigError> {
        let format = self.encode_format()?;
        Ok(vec![
            OutputSpec {
                target: OutputTarget::Mic,
                enabled: self.output_mic.unwrap_or(true),
                base_filename: stem(self.mic_filename.as_deref().unwrap_or("mic")),
                format,
            },
            OutputSpec {
                target: OutputTarget::System,
                enabled: self.output_system.unwrap_or(true),
                base_filename: stem(self.system_filename.as_deref().unwrap_or("system")),
                format,
            },
            OutputSpec {
                target: OutputTarget::Mixed,
                enabled: self.output_mixed.unwrap_or(true),
                base_filename: stem(self.mixed_filename.as_deref().unwrap_or("mixed")),
                format,
            },
        ])
    }

    /// Get dictation enable flag, or false if not set
    pub fn dictation_enabled(&self) -> bool {
        self.dictation_enable.unwrap_or(false)
    }

    /// Get dictation transcriber command, or "whisper" if not set
    pub fn dictation_command_or_default(&self) -> &str {
        self.dictation_command.as_deref().unwrap_or("whisper")
    }

    /// Get dictation model name, or "base" if not set
    pub fn dictation_model_or_default(&self) -> &str {
        self.dictation_model.as_deref().unwrap_or("base")
    }

    /// Get dictation capture sample rate, or 16 kHz if not set
    pub fn dictation_sample_rate_or_default(&self) -> u32 {
        self.dictation_sample_rate.unwrap_or(16_000)
    }

    /// Set a field by its settings-file key. Used by `config set`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "device_name" => self.device_name = Some(value.to_string()),
            "mic_channels" => self.mic_channels = Some(value.to_string()),
            "system_channels" => self.system_channels = Some(value.to_string()),
            "output_dir" => self.output_dir = Some(value.to_string()),
            "mic_filename" => self.mic_filename = Some(value.to_string()),
            "system_filename" => self.system_filename = Some(value.to_string()),
            "mixed_filename" => self.mixed_filename = Some(value.to_string()),
            "output_mic" => self.output_mic = Some(parse_bool(key, value)?),
            "output_system" => self.output_system = Some(parse_bool(key, value)?),
            "output_mixed" => self.output_mixed = Some(parse_bool(key, value)?),
            "file_format" => self.file_format = Some(value.to_string()),
            "wav_sample_rate" => self.wav_sample_rate = Some(parse_num(key, value)?),
            "wav_bit_depth" => self.wav_bit_depth = Some(parse_num(key, value)?),
            "mp3_bitrate_kbps" => self.mp3_bitrate_kbps = Some(parse_num(key, value)?),
            "flac_sample_rate" => self.flac_sample_rate = Some(parse_num(key, value)?),
            "flac_bit_depth" => self.flac_bit_depth = Some(parse_num(key, value)?),
            "flac_level" => self.flac_level = Some(parse_num(key, value)?),
            "dictation_enable" => self.dictation_enable = Some(parse_bool(key, value)?),
            "dictation_command" => self.dictation_command = Some(value.to_string()),
            "dictation_model" => self.dictation_model = Some(value.to_string()),
            "dictation_sample_rate" => self.dictation_sample_rate = Some(parse_num(key, value)?),
            _ => {
                return Err(ConfigError::ValidationError {
                    key: key.to_string(),
                    message: "unknown setting".to_string(),
                })
            }
        }
        Ok(())
    }
}

/// Strip a trailing extension from a configured filename, if any.
/// The format supplies the real extension at encode time.
fn stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("expected a boolean, got \"{value}\""),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("expected a number, got \"{value}\""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_values() {
        let settings = Settings::defaults();
        assert_eq!(settings.device_name, Some(String::new()));
        assert_eq!(settings.mic_channels, Some("2".to_string()));
        assert_eq!(settings.system_channels, Some("0,1".to_string()));
        assert_eq!(settings.file_format, Some("wav".to_string()));
        assert_eq!(settings.wav_sample_rate, Some(48_000));
        assert_eq!(settings.flac_level, Some(5));
        assert_eq!(settings.dictation_enable, Some(false));
        assert_eq!(settings.dictation_command_or_default(), "whisper");
        assert_eq!(settings.dictation_sample_rate_or_default(), 16_000);
    }

    #[test]
    fn empty_has_all_none() {
        let settings = Settings::empty();
        assert!(settings.device_name.is_none());
        assert!(settings.file_format.is_none());
        assert!(settings.output_mic.is_none());
        assert!(settings.dictation_command.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = Settings {
            device_name: Some("Aggregate".to_string()),
            file_format: Some("wav".to_string()),
            mp3_bitrate_kbps: Some(128),
            ..Default::default()
        };
        let other = Settings {
            file_format: Some("mp3".to_string()),
            device_name: None, // Should not override
            ..Default::default()
        };

        let merged = base.merge(other);

        assert_eq!(merged.device_name, Some("Aggregate".to_string()));
        assert_eq!(merged.file_format, Some("mp3".to_string()));
        assert_eq!(merged.mp3_bitrate_kbps, Some(128)); // Kept from base
    }

    #[test]
    fn merge_preserves_base_when_other_is_none() {
        let base = Settings {
            output_dir: Some("/tmp/rec".to_string()),
            output_mixed: Some(false),
            ..Default::default()
        };
        let merged = base.merge(Settings::empty());

        assert_eq!(merged.output_dir, Some("/tmp/rec".to_string()));
        assert_eq!(merged.output_mixed, Some(false));
    }

    #[test]
    fn channel_map_parses_defaults() {
        let map = Settings::defaults().channel_map().unwrap();
        assert_eq!(map.mic, vec![2]);
        assert_eq!(map.system, vec![0, 1]);
    }

    #[test]
    fn encode_format_defaults_to_wav() {
        let format = Settings::empty().encode_format().unwrap();
        assert_eq!(format.extension(), "wav");
        assert_eq!(format.sample_rate(), 48_000);
    }

    #[test]
    fn encode_format_rejects_unknown() {
        let settings = Settings {
            file_format: Some("ogg".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            settings.encode_format(),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn encode_format_rejects_out_of_range_bitrate() {
        let settings = Settings {
            file_format: Some("mp3".to_string()),
            mp3_bitrate_kbps: Some(64),
            ..Default::default()
        };
        assert!(settings.encode_format().is_err());
    }

    #[test]
    fn output_specs_strip_extensions() {
        let settings = Settings {
            mic_filename: Some("mic.wav".to_string()),
            mixed_filename: Some("combined".to_string()),
            ..Default::default()
        };
        let specs = settings.output_specs().unwrap();
        assert_eq!(specs[0].base_filename, "mic");
        assert_eq!(specs[2].base_filename, "combined");
    }

    #[test]
    fn output_specs_carry_enable_flags() {
        let settings = Settings {
            output_system: Some(false),
            ..Default::default()
        };
        let specs = settings.output_specs().unwrap();
        assert!(specs[0].enabled);
        assert!(!specs[1].enabled);
        assert!(specs[2].enabled);
    }

    #[test]
    fn set_value_parses_typed_fields() {
        let mut settings = Settings::empty();
        settings.set_value("flac_level", "8").unwrap();
        settings.set_value("output_mixed", "false").unwrap();
        settings.set_value("dictation_enable", "on").unwrap();
        assert_eq!(settings.flac_level, Some(8));
        assert_eq!(settings.output_mixed, Some(false));
        assert_eq!(settings.dictation_enable, Some(true));
    }

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut settings = Settings::empty();
        assert!(settings.set_value("hotkey", "cmd+r").is_err());
    }

    #[test]
    fn set_value_rejects_bad_number() {
        let mut settings = Settings::empty();
        assert!(settings.set_value("wav_sample_rate", "fast").is_err());
    }
}

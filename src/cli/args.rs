//! CLI argument definitions using Clap

use clap::{Parser, Subcommand};

/// TalkTally - multi-channel audio recorder with push-to-talk dictation
#[derive(Parser, Debug)]
#[command(name = "talktally")]
#[command(version = "0.1.0")]
#[command(about = "Record mic and system audio to per-channel files, with dictation")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available input devices
    Devices,
    /// Record mic, system, and mixed outputs until stopped
    Record {
        /// Stop automatically after this many seconds
        #[arg(short = 'd', long, value_name = "SECS")]
        duration: Option<u64>,

        /// Encode format (wav, mp3, flac)
        #[arg(short = 'f', long, value_name = "FORMAT")]
        format: Option<String>,

        /// Output directory override
        #[arg(short = 'o', long, value_name = "DIR")]
        output_dir: Option<String>,

        /// Input device name override
        #[arg(long, value_name = "NAME")]
        device: Option<String>,
    },
    /// Push-to-talk dictation driven from stdin (Enter toggles hold)
    Dictate,
    /// Transcribe a recorded file
    Transcribe {
        /// Recording to transcribe (defaults to the newest recording)
        #[arg(value_name = "FILE")]
        file: Option<String>,

        /// Model name passed to the transcriber
        #[arg(short = 'm', long, value_name = "MODEL")]
        model: Option<String>,

        /// Replace an existing transcript
        #[arg(long)]
        overwrite: bool,

        /// List recordings instead of transcribing
        #[arg(short = 'l', long)]
        list: bool,
    },
    /// Manage settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create settings file with defaults
    Init,
    /// Set a settings value
    Set {
        /// Settings key
        key: String,
        /// Settings value
        value: String,
    },
    /// Get a settings value
    Get {
        /// Settings key
        key: String,
    },
    /// List all settings values
    List,
    /// Show settings file path
    Path,
}

/// Valid settings keys
pub const VALID_SETTINGS_KEYS: &[&str] = &[
    "device_name",
    "mic_channels",
    "system_channels",
    "output_dir",
    "mic_filename",
    "system_filename",
    "mixed_filename",
    "output_mic",
    "output_system",
    "output_mixed",
    "file_format",
    "wav_sample_rate",
    "wav_bit_depth",
    "mp3_bitrate_kbps",
    "flac_sample_rate",
    "flac_bit_depth",
    "flac_level",
    "dictation_enable",
    "dictation_command",
    "dictation_model",
    "dictation_sample_rate",
];

/// Check if a settings key is valid
pub fn is_valid_settings_key(key: &str) -> bool {
    VALID_SETTINGS_KEYS.contains(&key)
}

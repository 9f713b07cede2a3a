//! Output formats and their parameters
//!
//! The format set is closed: WAV and FLAC are encoded natively, MP3 by an
//! external encoder. Size estimators feed the CLI's disk-rate preview.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error when format parameters fall outside the supported ranges.
/// Rejected at validation time, before any resource is acquired.
#[derive(Debug, Clone, Error)]
pub enum FormatUnsupported {
    #[error("WAV sample rate {0} Hz is not supported (use 44100 or 48000)")]
    WavSampleRate(u32),

    #[error("WAV bit depth {0} is not supported (use 16 or 24)")]
    WavBitDepth(u16),

    #[error("MP3 bitrate {0} kbps is out of range (CBR 96-320)")]
    Mp3Bitrate(u32),

    #[error("FLAC compression level {0} is out of range (0-8)")]
    FlacLevel(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavSettings {
    pub sample_rate: u32,
    pub bit_depth: u16,
}

impl Default for WavSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            bit_depth: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mp3Settings {
    pub bitrate_kbps: u32,
}

impl Default for Mp3Settings {
    fn default() -> Self {
        Self { bitrate_kbps: 192 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlacSettings {
    pub sample_rate: u32,
    pub bit_depth: u16,
    /// 0-8, higher = slower / smaller.
    pub compression_level: u8,
}

impl Default for FlacSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            bit_depth: 16,
            compression_level: 5,
        }
    }
}

/// Closed tagged variant over the supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    Wav(WavSettings),
    Mp3(Mp3Settings),
    Flac(FlacSettings),
}

impl EncodeFormat {
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav(_) => "wav",
            Self::Mp3(_) => "mp3",
            Self::Flac(_) => "flac",
        }
    }

    /// Sample rate the device stream must run at for this format.
    pub const fn sample_rate(&self) -> u32 {
        match self {
            Self::Wav(s) => s.sample_rate,
            // The external encoder resamples nothing; MP3 runs at the
            // recorder default.
            Self::Mp3(_) => 48_000,
            Self::Flac(s) => s.sample_rate,
        }
    }

    pub fn validate(&self) -> Result<(), FormatUnsupported> {
        match self {
            Self::Wav(s) => {
                if !matches!(s.sample_rate, 44_100 | 48_000) {
                    return Err(FormatUnsupported::WavSampleRate(s.sample_rate));
                }
                if !matches!(s.bit_depth, 16 | 24) {
                    return Err(FormatUnsupported::WavBitDepth(s.bit_depth));
                }
                Ok(())
            }
            Self::Mp3(s) => {
                if !(96..=320).contains(&s.bitrate_kbps) {
                    return Err(FormatUnsupported::Mp3Bitrate(s.bitrate_kbps));
                }
                Ok(())
            }
            Self::Flac(s) => {
                if !matches!(s.sample_rate, 44_100 | 48_000) {
                    return Err(FormatUnsupported::WavSampleRate(s.sample_rate));
                }
                if !matches!(s.bit_depth, 16 | 24) {
                    return Err(FormatUnsupported::WavBitDepth(s.bit_depth));
                }
                if s.compression_level > 8 {
                    return Err(FormatUnsupported::FlacLevel(s.compression_level));
                }
                Ok(())
            }
        }
    }

    /// Estimated output bytes per minute for `channels` channels.
    pub fn bytes_per_minute(&self, channels: u16) -> u64 {
        match self {
            Self::Wav(s) => wav_bytes_per_minute(channels, s.sample_rate, s.bit_depth),
            // CBR: independent of channel count.
            Self::Mp3(s) => (s.bitrate_kbps as u64 * 1000 / 8) * 60,
            Self::Flac(s) => {
                let uncompressed = wav_bytes_per_minute(channels, s.sample_rate, s.bit_depth);
                (uncompressed as f64 * flac_compression_ratio(s.compression_level)) as u64
            }
        }
    }
}

impl fmt::Display for EncodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wav(s) => write!(f, "WAV {} Hz {}-bit", s.sample_rate, s.bit_depth),
            Self::Mp3(s) => write!(f, "MP3 CBR {} kbps", s.bitrate_kbps),
            Self::Flac(s) => write!(
                f,
                "FLAC {} Hz {}-bit level {}",
                s.sample_rate, s.bit_depth, s.compression_level
            ),
        }
    }
}

fn wav_bytes_per_minute(channels: u16, sample_rate: u32, bit_depth: u16) -> u64 {
    let bytes_per_sec = sample_rate as u64 * channels as u64 * (bit_depth as u64 / 8);
    bytes_per_sec * 60
}

/// Heuristic FLAC size ratio by compression level, relative to raw PCM.
fn flac_compression_ratio(level: u8) -> f64 {
    match level {
        0 => 0.70,
        1 => 0.68,
        2 => 0.66,
        3 => 0.64,
        4 => 0.62,
        5 => 0.60,
        6 => 0.58,
        7 => 0.57,
        _ => 0.56,
    }
}

/// Render a byte count as B / KiB / MiB.
pub fn human_readable_bytes(n: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if n >= MIB {
        format!("{:.1} MiB", n as f64 / MIB as f64)
    } else if n >= KIB {
        format!("{} KiB", n / KIB)
    } else {
        format!("{n} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wav_is_48k_16bit() {
        let s = WavSettings::default();
        assert_eq!(s.sample_rate, 48_000);
        assert_eq!(s.bit_depth, 16);
    }

    #[test]
    fn wav_validation_rejects_odd_rates_and_depths() {
        assert!(EncodeFormat::Wav(WavSettings::default()).validate().is_ok());
        assert!(EncodeFormat::Wav(WavSettings {
            sample_rate: 22_050,
            bit_depth: 16
        })
        .validate()
        .is_err());
        assert!(EncodeFormat::Wav(WavSettings {
            sample_rate: 48_000,
            bit_depth: 32
        })
        .validate()
        .is_err());
    }

    #[test]
    fn mp3_bitrate_bounds() {
        assert!(EncodeFormat::Mp3(Mp3Settings { bitrate_kbps: 96 }).validate().is_ok());
        assert!(EncodeFormat::Mp3(Mp3Settings { bitrate_kbps: 320 }).validate().is_ok());
        assert!(EncodeFormat::Mp3(Mp3Settings { bitrate_kbps: 64 }).validate().is_err());
        assert!(EncodeFormat::Mp3(Mp3Settings { bitrate_kbps: 321 }).validate().is_err());
    }

    #[test]
    fn flac_level_bounds() {
        let ok = FlacSettings {
            compression_level: 8,
            ..Default::default()
        };
        assert!(EncodeFormat::Flac(ok).validate().is_ok());
        let bad = FlacSettings {
            compression_level: 9,
            ..Default::default()
        };
        assert!(EncodeFormat::Flac(bad).validate().is_err());
    }

    #[test]
    fn wav_size_estimate() {
        // 48kHz * 2ch * 2 bytes * 60s = 11,520,000 bytes/min
        let fmt = EncodeFormat::Wav(WavSettings::default());
        assert_eq!(fmt.bytes_per_minute(2), 11_520_000);
    }

    #[test]
    fn mp3_size_estimate_ignores_channels() {
        let fmt = EncodeFormat::Mp3(Mp3Settings { bitrate_kbps: 192 });
        assert_eq!(fmt.bytes_per_minute(1), fmt.bytes_per_minute(2));
        assert_eq!(fmt.bytes_per_minute(2), 192 * 1000 / 8 * 60);
    }

    #[test]
    fn flac_estimate_shrinks_with_level() {
        let low = EncodeFormat::Flac(FlacSettings {
            compression_level: 0,
            ..Default::default()
        });
        let high = EncodeFormat::Flac(FlacSettings {
            compression_level: 8,
            ..Default::default()
        });
        assert!(high.bytes_per_minute(2) < low.bytes_per_minute(2));
    }

    #[test]
    fn human_readable_byte_sizes() {
        assert_eq!(human_readable_bytes(512), "512 B");
        assert_eq!(human_readable_bytes(2048), "2 KiB");
        assert_eq!(human_readable_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn extensions() {
        assert_eq!(EncodeFormat::Wav(WavSettings::default()).extension(), "wav");
        assert_eq!(EncodeFormat::Mp3(Mp3Settings::default()).extension(), "mp3");
        assert_eq!(EncodeFormat::Flac(FlacSettings::default()).extension(), "flac");
    }
}

//! Output targets, specs, and recording artifacts

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::encoding::EncodeFormat;

/// The closed set of output targets a recording can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputTarget {
    Mic,
    System,
    Mixed,
}

impl OutputTarget {
    pub const ALL: [OutputTarget; 3] = [Self::Mic, Self::System, Self::Mixed];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mic => "mic",
            Self::System => "system",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-target output configuration, editable only while no session is active
/// (sessions take a read-only snapshot at start).
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub target: OutputTarget,
    pub enabled: bool,
    /// Filename stem without extension; the format supplies the extension.
    pub base_filename: String,
    pub format: EncodeFormat,
}

/// One finalized output file of a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArtifact {
    pub target: OutputTarget,
    pub path: PathBuf,
    pub bytes: u64,
    pub frames: u64,
}

/// Produced on successful stop, after every sink has finalized.
#[derive(Debug, Clone, Default)]
pub struct RecordingArtifact {
    pub outputs: Vec<OutputArtifact>,
    pub duration: Duration,
    /// Hardware gaps plus blocks dropped by saturated sink queues.
    pub underruns: u64,
    /// Targets skipped at start (e.g. missing external encoder), with reason.
    pub skipped: Vec<(OutputTarget, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_display() {
        assert_eq!(OutputTarget::Mic.to_string(), "mic");
        assert_eq!(OutputTarget::System.to_string(), "system");
        assert_eq!(OutputTarget::Mixed.to_string(), "mixed");
    }

    #[test]
    fn all_lists_every_target() {
        assert_eq!(OutputTarget::ALL.len(), 3);
    }
}

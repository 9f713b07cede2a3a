//! Filename protocol: non-clobbering paths, timestamp suffixes, temp names

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Timestamp layout used in final recording names.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Return `path` if free, else append `" (n)"` before the extension,
/// with `n` counting up from 2.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    let mut n: u32 = 2;
    loop {
        let name = match &extension {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Final path for a finished recording:
/// `<dir>/<base>__<end-timestamp>.<ext>`, made unique on collision.
pub fn final_recording_path(
    dir: &Path,
    base: &str,
    extension: &str,
    end_time: DateTime<Local>,
) -> PathBuf {
    let ts = end_time.format(TIMESTAMP_FORMAT);
    unique_path(&dir.join(format!("{base}__{ts}.{extension}")))
}

/// Temporary path a sink writes to while recording:
/// `<dir>/.<base>.<ext>.part`, made unique on collision. Never deleted
/// automatically if finalization is not reached.
pub fn temp_recording_path(dir: &Path, base: &str, extension: &str) -> PathBuf {
    unique_path(&dir.join(format!(".{base}.{extension}.part")))
}

/// Transcript path for a recording: `<dir>/<stem>__<model>.txt`,
/// made unique on collision.
pub fn transcript_path(dir: &Path, source_stem: &str, model: &str) -> PathBuf {
    unique_path(&dir.join(format!("{source_stem}__{model}.txt")))
}

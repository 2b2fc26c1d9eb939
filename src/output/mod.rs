use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::utils::sanitize_filename;

pub mod vtt;

pub use vtt::{parse_cues, sanitize_transcript, HeaderStatus, SanitizedTranscript, VttCue};

/// A subtitle file that made it to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSubtitles {
    /// Absolute path of the written file
    pub path: PathBuf,

    /// Number of cues found when re-reading the document
    pub cue_count: usize,
}

/// Output file name for a video title: sanitized title plus `.vtt`
pub fn subtitle_filename(title: &str) -> String {
    format!("{}.{}", sanitize_filename(title), vtt::EXTENSION)
}

/// Write a subtitle document as UTF-8 into `dir`, named after `title`
pub fn save_subtitles(content: &str, title: &str, dir: &Path) -> Result<SavedSubtitles> {
    let path = dir.join(subtitle_filename(title));

    fs_err::write(&path, content)?;

    let path = fs_err::canonicalize(&path).unwrap_or(path);
    Ok(SavedSubtitles {
        path,
        cue_count: parse_cues(content).len(),
    })
}

use async_trait::async_trait;
use std::path::PathBuf;

pub mod ytdlp;

pub use ytdlp::YtDlpDownloader;

use crate::Result;

/// Extension of the transcoded audio artifact
pub const AUDIO_EXTENSION: &str = "mp3";

/// MIME type announced to the provider for the audio artifact
pub const AUDIO_MIME_TYPE: &str = "audio/mp3";

/// A local audio file produced by a downloader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedAudio {
    /// Path of the temporary audio file
    pub path: PathBuf,

    /// Human-readable title of the source video
    pub title: String,
}

/// Fetches the audio track of a video URL into a local file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download and transcode the audio for `url`
    async fn download_audio(&self, url: &str) -> Result<DownloadedAudio>;
}

/// Title used when the source does not provide one
pub fn placeholder_title(timestamp: i64) -> String {
    format!("video_{}", timestamp)
}

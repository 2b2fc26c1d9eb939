//! tubescribe - A Rust CLI tool that turns YouTube videos into WebVTT subtitles
//!
//! This library downloads the audio track of a video with yt-dlp, uploads it to the
//! Google Gemini Files API, asks a Gemini model for an English WebVTT transcript and
//! writes the cleaned result next to the user.

pub mod cli;
pub mod config;
pub mod download;
pub mod output;
pub mod provider;
pub mod transcribe;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use download::{DownloadedAudio, MediaDownloader};
pub use provider::{FileState, RemoteFile, TranscriptionProvider};
pub use transcribe::{RunOutcome, SubtitlePipeline};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Fatal failures of a pipeline run, one variant per stage that can abort it
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("GOOGLE_API_KEY not found in environment variables. Create a .env file with your API key or export it")]
    MissingCredential,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("File processing failed on Gemini side: {0}")]
    RemoteProcessing(String),

    #[error("File was still processing after {waited_secs}s, giving up")]
    ProcessingTimeout { waited_secs: u64 },

    #[error("Transcription error: {0}")]
    Inference(String),
}

impl PipelineError {
    /// Stage label used in the failure summary
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::MissingCredential | PipelineError::Config(_) => "configuration",
            PipelineError::Download(_) => "download",
            PipelineError::Upload(_) => "upload",
            PipelineError::RemoteProcessing(_) | PipelineError::ProcessingTimeout { .. } => {
                "processing"
            }
            PipelineError::Inference(_) => "transcription",
        }
    }
}

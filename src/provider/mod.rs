use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub mod gemini;

pub use gemini::GeminiClient;

use crate::Result;

/// Processing state of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Upload accepted but no state reported yet
    Uploading,
    Processing,
    /// Ready for inference
    Active,
    Failed,
}

impl FileState {
    /// Map the provider's state name; anything unrecognised counts as not ready yet
    pub fn from_api(state: Option<&str>) -> Self {
        match state {
            Some("ACTIVE") => FileState::Active,
            Some("FAILED") => FileState::Failed,
            Some("PROCESSING") => FileState::Processing,
            _ => FileState::Uploading,
        }
    }
}

/// Handle to a file stored on the provider side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc123`
    pub name: String,

    /// URI used to reference the file in inference requests
    pub uri: String,

    pub mime_type: String,

    pub state: FileState,

    /// Provider error message when processing failed
    pub error: Option<String>,
}

/// Cloud transcription provider: file storage plus a multimodal generate call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Upload a local file with an explicit MIME type
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile>;

    /// Fetch the current metadata (and state) of an uploaded file
    async fn get_file(&self, name: &str) -> Result<RemoteFile>;

    /// Run one inference request over the file with the given instruction
    async fn generate(&self, file: &RemoteFile, prompt: &str, timeout: Duration) -> Result<String>;

    /// Delete an uploaded file
    async fn delete(&self, name: &str) -> Result<()>;
}

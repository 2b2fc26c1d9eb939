use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use url::Url;

use super::{FileState, RemoteFile, TranscriptionProvider};
use crate::config::GeminiConfig;
use crate::Result;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Gemini Files API and `generateContent`
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base: Url,
    model: String,
}

/// File resource as returned by the Files API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: String,
    state: Option<String>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl From<FileResource> for RemoteFile {
    fn from(file: FileResource) -> Self {
        RemoteFile {
            state: FileState::from_api(file.state.as_deref()),
            error: file
                .error
                .map(|status| format!("{} (code {})", status.message, status.code)),
            name: file.name,
            uri: file.uri,
            mime_type: file.mime_type,
        }
    }
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let base = Url::parse(&config.api_base)
            .with_context(|| format!("Invalid Gemini API base URL: {}", config.api_base))?;

        let client = Client::builder()
            .user_agent(concat!("tubescribe/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base,
            model: config.model.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Invalid endpoint path: {}", path))
    }

    fn generate_path(&self) -> String {
        format!("v1beta/models/{}:generateContent", self.model)
    }
}

/// Turn a non-success response into an error carrying the API's own message
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(anyhow!("HTTP {}: {}", status, api_error_message(&body)))
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateResponse) -> Result<String> {
    let block_reason = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason);

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match block_reason {
            Some(reason) => anyhow!("Prompt was blocked: {}", reason),
            None => anyhow!("Response contained no candidates"),
        });
    };

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        anyhow::bail!(
            "Response contained no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );
    }

    Ok(text)
}

#[async_trait]
impl TranscriptionProvider for GeminiClient {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<RemoteFile> {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        tracing::debug!("Starting resumable upload of {} ({} bytes)", display_name, content.len());

        let start = self
            .client
            .post(self.endpoint("upload/v1beta/files")?)
            .header(API_KEY_HEADER, &self.api_key)
            .header("x-goog-upload-protocol", "resumable")
            .header("x-goog-upload-command", "start")
            .header("x-goog-upload-header-content-length", content.len().to_string())
            .header("x-goog-upload-header-content-type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .context("Failed to start upload")?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| anyhow!("Upload session response has no upload URL"))?
            .to_string();

        let response = self
            .client
            .post(upload_url)
            .header("x-goog-upload-offset", "0")
            .header("x-goog-upload-command", "upload, finalize")
            .body(content)
            .send()
            .await
            .context("Failed to send file content")?;

        let uploaded: UploadResponse = check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse upload response")?;

        let mut file: RemoteFile = uploaded.file.into();
        if file.mime_type.is_empty() {
            file.mime_type = mime_type.to_string();
        }
        Ok(file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile> {
        let response = self
            .client
            .get(self.endpoint(&format!("v1beta/{}", name))?)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .context("Failed to query file state")?;

        let file: FileResource = check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse file metadata")?;

        Ok(file.into())
    }

    async fn generate(&self, file: &RemoteFile, prompt: &str, timeout: Duration) -> Result<String> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "file_data": { "mime_type": file.mime_type, "file_uri": file.uri } },
                    { "text": prompt }
                ]
            }]
        });

        let response = self
            .client
            .post(self.endpoint(&self.generate_path())?)
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("Request timed out after {}s", timeout.as_secs())
                } else {
                    anyhow!(e).context("Failed to call generateContent")
                }
            })?;

        let parsed: GenerateResponse = check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse generateContent response")?;

        extract_text(parsed)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.endpoint(&format!("v1beta/{}", name))?)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .context("Failed to delete file")?;

        check_status(response).await?;
        Ok(())
    }
}

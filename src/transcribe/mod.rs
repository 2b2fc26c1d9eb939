use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::download::{DownloadedAudio, MediaDownloader, YtDlpDownloader, AUDIO_MIME_TYPE};
use crate::output::{self, HeaderStatus, SavedSubtitles};
use crate::provider::{GeminiClient, RemoteFile, TranscriptionProvider};
use crate::utils::{check_file_accessible, format_file_size};
use crate::PipelineError;

pub mod processor;

pub use processor::{PollPolicy, ReadinessPoller};

/// Instruction sent alongside the audio file
pub const TRANSCRIPTION_PROMPT: &str = "You are a professional subtitle generator.
Transcribe the audio from the provided file into English.
Strictly output the result in WebVTT (.vtt) format.
Ensure timestamps are accurate and formatted correctly (e.g., 00:00:00.000).
Do not include any conversational text, markdown formatting blocks (like ```vtt), or explanations.
Start directly with \"WEBVTT\".";

/// How a run ended when no stage failed fatally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every stage ran; the subtitle write itself may still have failed
    Completed(Completion),
    /// Interrupted by the user
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub title: String,

    /// How the header was found in the model output
    pub header: HeaderStatus,

    /// `None` when writing the file failed
    pub saved: Option<SavedSubtitles>,
}

/// Knobs of a pipeline run that do not belong to a collaborator
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub poll: PollPolicy,

    /// Client-side timeout of the inference call
    pub request_timeout: Duration,

    /// Where the subtitle file is written
    pub output_dir: PathBuf,

    /// Model name shown in progress output
    pub model: String,
}

impl PipelineSettings {
    pub fn from_config(config: &Config, output_dir: PathBuf) -> Self {
        Self {
            poll: PollPolicy {
                interval: config.poll_interval(),
                max_wait: config.max_poll_wait(),
            },
            request_timeout: config.request_timeout(),
            output_dir,
            model: config.gemini.model.clone(),
        }
    }
}

/// Download → upload → wait → transcribe → save → cleanup
pub struct SubtitlePipeline<D, P> {
    downloader: D,
    provider: P,
    settings: PipelineSettings,
}

impl SubtitlePipeline<YtDlpDownloader, GeminiClient> {
    /// Build the production pipeline: yt-dlp for audio, Gemini for transcription
    pub fn from_config(config: &Config, output_dir: PathBuf) -> Result<Self> {
        let downloader = YtDlpDownloader::new(config.temp_dir(), config.app.audio_bitrate_kbps);
        let provider = GeminiClient::new(&config.gemini)?;

        Ok(Self::new(
            downloader,
            provider,
            PipelineSettings::from_config(config, output_dir),
        ))
    }
}

impl<D: MediaDownloader, P: TranscriptionProvider> SubtitlePipeline<D, P> {
    pub fn new(downloader: D, provider: P, settings: PipelineSettings) -> Self {
        Self {
            downloader,
            provider,
            settings,
        }
    }

    /// Run the whole pipeline for one URL.
    ///
    /// Once the audio is on disk, cleanup runs exactly once no matter how the
    /// later stages end. `interrupt` resolving cancels the in-flight stage.
    pub async fn run<F>(&self, url: &str, interrupt: F) -> Result<RunOutcome, PipelineError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);

        let audio = tokio::select! {
            result = self.download(url) => result?,
            _ = &mut interrupt => {
                report_cancelled();
                return Ok(RunOutcome::Cancelled);
            }
        };

        let mut remote: Option<RemoteFile> = None;
        let outcome = {
            let stages = self.process(&audio, &mut remote);
            tokio::select! {
                result = stages => result.map(RunOutcome::Completed),
                _ = &mut interrupt => Ok(RunOutcome::Cancelled),
            }
        };

        if let Ok(RunOutcome::Cancelled) = outcome {
            report_cancelled();
        }

        self.cleanup(&audio.path, remote.as_ref()).await;
        outcome
    }

    /// Stages 2 to 5; `remote` is filled as soon as an upload succeeded
    async fn process(
        &self,
        audio: &DownloadedAudio,
        remote: &mut Option<RemoteFile>,
    ) -> Result<Completion, PipelineError> {
        let uploaded = self.upload(&audio.path).await?;
        *remote = Some(uploaded.clone());

        let ready = self.wait_for_processing(&uploaded).await?;
        let raw = self.transcribe(&ready).await?;
        let (header, saved) = self.save(&raw, &audio.title);

        Ok(Completion {
            title: audio.title.clone(),
            header,
            saved,
        })
    }

    async fn download(&self, url: &str) -> Result<DownloadedAudio, PipelineError> {
        step("⬇️ ", 1, "Downloading audio from YouTube...");
        tracing::info!("Downloading audio for URL: {}", url);

        let progress = spinner("Downloading and converting audio with yt-dlp...");
        let result = self.downloader.download_audio(url).await;
        progress.finish_and_clear();

        match result {
            Ok(audio) => {
                success(&format!("Downloaded: {}", audio.title));
                tracing::debug!("Audio stored at {}", audio.path.display());
                Ok(audio)
            }
            Err(e) => {
                failure(&format!("Download failed: {:#}", e));
                Err(PipelineError::Download(format!("{:#}", e)))
            }
        }
    }

    async fn upload(&self, path: &Path) -> Result<RemoteFile, PipelineError> {
        step("📤", 2, "Uploading to Gemini...");

        let size = check_file_accessible(path).map_err(|e| {
            failure(&format!("Error: {:#}", e));
            PipelineError::Upload(format!("{:#}", e))
        })?;
        println!("   File size: {}", format_file_size(size));

        match self.provider.upload(path, AUDIO_MIME_TYPE).await {
            Ok(file) => {
                success(&format!("Uploaded. URI: {}", file.uri));
                tracing::debug!("Remote file {} in state {:?}", file.name, file.state);
                Ok(file)
            }
            Err(e) => {
                failure(&format!("Upload failed: {:#}", e));
                Err(PipelineError::Upload(format!("{:#}", e)))
            }
        }
    }

    async fn wait_for_processing(&self, file: &RemoteFile) -> Result<RemoteFile, PipelineError> {
        step("⏳", 3, "Waiting for server-side processing...");

        let poller = ReadinessPoller::new(&self.provider, self.settings.poll);
        match poller.wait_until_active(file).await {
            Ok(ready) => {
                success("File is ready for inference.");
                Ok(ready)
            }
            Err(e) => {
                failure(&e.to_string());
                Err(e)
            }
        }
    }

    async fn transcribe(&self, file: &RemoteFile) -> Result<String, PipelineError> {
        step("🧠", 4, &format!("Transcribing with {}...", self.settings.model));

        let progress = spinner("Waiting for the model (this can take a few minutes)...");
        let result = self
            .provider
            .generate(file, TRANSCRIPTION_PROMPT, self.settings.request_timeout)
            .await;
        progress.finish_and_clear();

        match result {
            Ok(text) => {
                success(&format!("Received {} characters.", text.chars().count()));
                Ok(text)
            }
            Err(e) => {
                failure(&format!("Transcription error: {:#}", e));
                Err(PipelineError::Inference(format!("{:#}", e)))
            }
        }
    }

    /// Never fatal: a write error only produces a warning
    fn save(&self, raw: &str, title: &str) -> (HeaderStatus, Option<SavedSubtitles>) {
        step("💾", 5, "Saving output...");

        let sanitized = output::sanitize_transcript(raw);
        match sanitized.header {
            HeaderStatus::Present => {}
            HeaderStatus::Recovered => {
                warning("Warning: Output might contain extra text. Cleaning...");
            }
            HeaderStatus::Missing => {
                warning("Warning: No WEBVTT header found in the response, saving it as-is.");
            }
        }

        match output::save_subtitles(&sanitized.content, title, &self.settings.output_dir) {
            Ok(saved) => {
                success(&format!("Saved to: {}", saved.path.display()));
                if saved.cue_count == 0 {
                    warning("Warning: No subtitle cues found, the file may not be valid WebVTT.");
                } else {
                    println!("   {} cues written.", saved.cue_count);
                }
                (sanitized.header, Some(saved))
            }
            Err(e) => {
                failure(&format!("Save failed: {:#}", e));
                tracing::warn!("Could not write subtitles for {:?}: {:#}", title, e);
                (sanitized.header, None)
            }
        }
    }

    /// Best-effort removal of whatever the run acquired
    async fn cleanup(&self, audio_path: &Path, remote: Option<&RemoteFile>) {
        step("🧹", 6, "Cleanup...");

        if audio_path.exists() {
            match fs_err::remove_file(audio_path) {
                Ok(()) => println!("   Deleted local temporary audio file."),
                Err(e) => warning(&format!("Warning: Could not delete local file: {}", e)),
            }
        }

        if let Some(file) = remote {
            match self.provider.delete(&file.name).await {
                Ok(()) => println!("   Deleted remote Gemini file."),
                // The provider expires uploads on its own
                Err(e) => tracing::debug!("Ignoring failed delete of {}: {:#}", file.name, e),
            }
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("   {spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message.to_string());
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

fn step(icon: &str, number: u8, message: &str) {
    println!("\n{} {}", icon, style(format!("Step {}: {}", number, message)).bold());
}

fn success(message: &str) {
    println!("   {} {}", style("✅").green(), message);
}

fn failure(message: &str) {
    println!("   {} {}", style("❌").red(), style(message).red());
}

fn warning(message: &str) {
    println!("   {}  {}", style("⚠️").yellow(), style(message).yellow());
}

fn report_cancelled() {
    println!("\n\n🛑 Operation cancelled by user.");
}

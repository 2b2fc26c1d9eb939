use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{placeholder_title, DownloadedAudio, MediaDownloader, AUDIO_EXTENSION};
use crate::Result;

/// Audio downloader backed by the yt-dlp executable (ffmpeg does the transcoding)
pub struct YtDlpDownloader {
    yt_dlp_path: String,
    output_dir: PathBuf,
    bitrate_kbps: u32,
}

impl YtDlpDownloader {
    pub fn new(output_dir: impl Into<PathBuf>, bitrate_kbps: u32) -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            output_dir: output_dir.into(),
            bitrate_kbps,
        }
    }

    /// Unique file stem for this invocation, without extension
    fn output_stem(&self, timestamp: i64) -> PathBuf {
        let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
        self.output_dir.join(format!("temp_audio_{}_{}", timestamp, suffix))
    }

    fn build_args(&self, url: &str, stem: &Path) -> Vec<String> {
        vec![
            "--format".into(),
            "bestaudio/best".into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            AUDIO_EXTENSION.into(),
            "--audio-quality".into(),
            format!("{}K", self.bitrate_kbps),
            "--output".into(),
            format!("{}.%(ext)s", stem.to_string_lossy()),
            "--no-playlist".into(),
            // Metadata goes to stdout while the download still happens
            "--dump-json".into(),
            "--no-simulate".into(),
            "--quiet".into(),
            "--no-warnings".into(),
            url.into(),
        ]
    }
}

/// Pull the title out of yt-dlp's JSON info dump.
///
/// Only a missing `title` key yields `None`; a blank title is kept.
fn parse_title(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str::<Value>(line).ok())
        .and_then(|info| info["title"].as_str().map(str::to_string))
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    async fn download_audio(&self, url: &str) -> Result<DownloadedAudio> {
        let timestamp = chrono::Utc::now().timestamp();
        let stem = self.output_stem(timestamp);
        let args = self.build_args(url, &stem);

        tracing::debug!("Running {} {:?}", self.yt_dlp_path, args);

        let output = Command::new(&self.yt_dlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run {}: {}", self.yt_dlp_path, e))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        // yt-dlp swaps the template's extension for the post-processed one
        let path = stem.with_extension(AUDIO_EXTENSION);
        if !path.exists() {
            anyhow::bail!(
                "yt-dlp reported success but {} was not created (is ffmpeg installed?)",
                path.display()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let title = parse_title(&stdout).unwrap_or_else(|| {
            tracing::warn!("No title in yt-dlp output, using a placeholder");
            placeholder_title(timestamp)
        });

        Ok(DownloadedAudio { path, title })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_request_low_bitrate_mp3() {
        let downloader = YtDlpDownloader::new("/tmp", 64);
        let args = downloader.build_args("https://youtu.be/abc", Path::new("/tmp/temp_audio_1_ab"));

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("--format") + 1], "bestaudio/best");
        assert_eq!(args[pos("--audio-format") + 1], "mp3");
        assert_eq!(args[pos("--audio-quality") + 1], "64K");
        assert_eq!(args[pos("--output") + 1], "/tmp/temp_audio_1_ab.%(ext)s");
        assert_eq!(args.last().unwrap(), "https://youtu.be/abc");
    }

    #[test]
    fn test_stems_are_unique_per_call() {
        let downloader = YtDlpDownloader::new("/tmp", 64);
        let a = downloader.output_stem(1_700_000_000);
        let b = downloader.output_stem(1_700_000_000);

        assert_ne!(a, b);
        assert!(a.to_string_lossy().starts_with("/tmp/temp_audio_1700000000_"));
        assert_eq!(a.with_extension(AUDIO_EXTENSION).extension().unwrap(), "mp3");
    }

    #[test]
    fn test_parse_title_from_info_dump() {
        let stdout = "{\"id\": \"abc\", \"title\": \"Rust in 100 Seconds\"}\n";
        assert_eq!(parse_title(stdout).as_deref(), Some("Rust in 100 Seconds"));
    }

    #[test]
    fn test_parse_title_missing_or_garbage() {
        assert_eq!(parse_title(""), None);
        assert_eq!(parse_title("not json"), None);
        assert_eq!(parse_title("{\"id\": \"abc\"}"), None);
        assert_eq!(parse_title("{\"title\": null}"), None);
    }

    #[test]
    fn test_parse_title_keeps_blank_title() {
        assert_eq!(parse_title("{\"title\": \"  \"}").as_deref(), Some("  "));
        assert_eq!(parse_title("{\"title\": \"\"}").as_deref(), Some(""));
    }

    #[test]
    fn test_placeholder_title() {
        assert_eq!(placeholder_title(42), "video_42");
    }
}

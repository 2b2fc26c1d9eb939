use anyhow::Result;
use std::path::Path;

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Reduce a title to alphanumerics, spaces, hyphens and underscores.
///
/// Everything else is dropped, not replaced; a title made only of
/// disallowed characters becomes the empty string. Combining vowel signs
/// count as alphabetic, so Thai or Devanagari titles stay readable.
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .filter(|&c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Check that a path exists and is a regular file, returning its size
pub fn check_file_accessible(path: &Path) -> Result<u64> {
    if !path.exists() {
        anyhow::bail!("File {} not found", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("Path is not a file: {}", path.display());
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| anyhow::anyhow!("Cannot access file {}: {}", path.display(), e))?;

    Ok(metadata.len())
}

/// Check if the current environment has required tools
pub async fn check_dependencies() -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available("yt-dlp", "--version").await {
        missing.push("yt-dlp - required to download audio".to_string());
    }

    // ffmpeg only understands single-dash flags
    if !check_command_available("ffmpeg", "-version").await {
        missing.push("ffmpeg - required by yt-dlp to convert audio to mp3".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

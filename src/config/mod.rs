use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::PipelineError;

/// Environment variable holding the Gemini API key
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gemini configuration
    pub gemini: GeminiConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key, only ever taken from the environment
    #[serde(skip)]
    pub api_key: String,

    /// Base URL of the Generative Language API
    pub api_base: String,

    /// Model used for transcription
    pub model: String,

    /// Client-side timeout for the generate call
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory for the temporary audio file (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,

    /// MP3 bitrate requested from the extractor
    pub audio_bitrate_kbps: u32,

    /// Delay between two processing-state queries
    pub poll_interval_secs: u64,

    /// Upper bound on the processing wait, unbounded when unset
    pub max_poll_wait_secs: Option<u64>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            request_timeout_secs: 600,
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            audio_bitrate_kbps: 64,
            poll_interval_secs: 2,
            max_poll_wait_secs: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            app: AppConfig::default(),
        }
    }
}

impl Config {
    /// Load settings from the optional config file and the API key from the environment.
    ///
    /// `.env` in the working directory (or a parent) is loaded first, without
    /// overriding variables that are already set.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match Self::config_path() {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                let content = fs_err::read_to_string(&path)
                    .context("Failed to read config file")?;
                Self::from_yaml(&content)?
            }
            None => Self::default(),
        };

        config.apply_api_key(std::env::var(API_KEY_VAR).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse settings from YAML; missing keys keep their defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    /// Install the API key, rejecting an absent or blank value
    pub fn apply_api_key(&mut self, value: Option<String>) -> Result<()> {
        match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            Some(key) => {
                self.gemini.api_key = key;
                Ok(())
            }
            None => Err(PipelineError::MissingCredential.into()),
        }
    }

    /// Get configuration file path, if one exists
    fn config_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("tubescribe").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.gemini.api_base).map_err(|e| {
            PipelineError::Config(format!("invalid api_base {:?}: {}", self.gemini.api_base, e))
        })?;

        if self.gemini.model.trim().is_empty() {
            return Err(PipelineError::Config("model must not be empty".into()).into());
        }
        if self.gemini.request_timeout_secs == 0 {
            return Err(
                PipelineError::Config("request_timeout_secs must be positive".into()).into(),
            );
        }
        if self.app.audio_bitrate_kbps == 0 {
            return Err(PipelineError::Config("audio_bitrate_kbps must be positive".into()).into());
        }
        if self.app.poll_interval_secs == 0 {
            return Err(PipelineError::Config("poll_interval_secs must be positive".into()).into());
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.app.poll_interval_secs)
    }

    pub fn max_poll_wait(&self) -> Option<Duration> {
        self.app.max_poll_wait_secs.map(Duration::from_secs)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.app.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

//! Configuration settings for Hark.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub sources: SourceSettings,
    pub transcription: TranscriptionSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files (downloaded audio, subtitle files).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.hark".to_string(),
            temp_dir: "/tmp/hark".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Transcript source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Base URL of the managed transcript API.
    pub hosted_api_url: String,
    /// API key for the managed transcript API. Falls back to the
    /// `TRANSCRIPT_API_KEY` environment variable when unset.
    pub hosted_api_key: Option<String>,
    /// Seconds between status polls for deferred transcript jobs.
    pub poll_interval_seconds: u64,
    /// Maximum number of status polls before a deferred job counts as failed.
    pub poll_max_attempts: u32,
    /// Caption languages to request, in preference order.
    pub languages: Vec<String>,
    /// Allow the audio-transcription fallback (requires yt-dlp on PATH).
    pub allow_audio_fallback: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            hosted_api_url: "https://api.transcriptrelay.com/v1".to_string(),
            hosted_api_key: None,
            poll_interval_seconds: 3,
            poll_max_attempts: 20,
            languages: vec!["en".to_string(), "en-US".to_string()],
            allow_audio_fallback: true,
        }
    }
}

impl SourceSettings {
    /// Resolve the hosted API key from settings or the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.hosted_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("TRANSCRIPT_API_KEY").ok().filter(|k| !k.is_empty()))
    }
}

/// Speech-to-text settings for the audio fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Duration in seconds for splitting long audio files.
    pub chunk_duration_seconds: u32,
    /// Maximum concurrent transcription calls for split audio.
    pub max_concurrent_chunks: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            chunk_duration_seconds: 600,
            max_concurrent_chunks: 2,
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size in characters.
    pub target_chars: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { target_chars: 1000 }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Shared requests-per-minute ceiling across all concurrent calls.
    pub requests_per_minute: usize,
    /// Maximum embedding calls in flight at once.
    pub max_concurrent: usize,
    /// Attempts per chunk before it is dropped.
    pub max_attempts: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            requests_per_minute: 60,
            max_concurrent: 5,
            max_attempts: 3,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the SQLite database.
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.hark/videos.db".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::HarkError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hark")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_roundtrip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.embedding.requests_per_minute, 60);
        assert_eq!(parsed.embedding.max_concurrent, 5);
        assert_eq!(parsed.chunking.target_chars, 1000);
        assert!(parsed.sources.allow_audio_fallback);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [chunking]
            target_chars = 500
            "#,
        )
        .unwrap();

        assert_eq!(settings.chunking.target_chars, 500);
        assert_eq!(settings.embedding.max_attempts, 3);
        assert_eq!(settings.sources.poll_max_attempts, 20);
    }
}

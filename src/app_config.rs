use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::time::Duration;

use crate::consistency::DEFAULT_DRIFT_TOLERANCE_SECONDS;
use crate::file_utils::FileManager;
use crate::timeline::{DEFAULT_GAP_SECONDS, DEFAULT_MIN_DURATION_SECONDS, DEFAULT_PER_CHAR_SECONDS};

/// Environment variable consulted when the config carries no API key
pub const API_KEY_ENV_VAR: &str = "ELEVENLABS_API_KEY";

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Speech synthesis settings
    #[serde(default)]
    pub tts: TtsConfig,

    /// Timeline and drift settings
    #[serde(default)]
    pub timeline: TimelineConfig,

    /// Where audio files are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Voice tuning sent with every synthesis request
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VoiceSettings {
    #[serde(default = "default_stability")]
    pub stability: f32,

    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
        }
    }
}

/// Speech synthesis service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TtsConfig {
    // @field: Service URL
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Voice identifier
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    // @field: Model identifier
    #[serde(default = "default_model_id")]
    pub model_id: String,

    // @field: Voice settings
    #[serde(default)]
    pub voice_settings: VoiceSettings,

    // @field: Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tts_endpoint(),
            api_key: String::new(),
            voice_id: default_voice_id(),
            model_id: default_model_id(),
            voice_settings: VoiceSettings::default(),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TtsConfig {
    /// Get the API key, falling back to the environment
    pub fn get_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }

        std::env::var(API_KEY_ENV_VAR).unwrap_or_default()
    }

    /// Per-request deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Timeline construction settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimelineConfig {
    /// Gap between consecutive sentences, in the timeline and in the stitched audio
    #[serde(default = "default_gap_secs")]
    pub gap_secs: f64,

    /// Lower bound of the estimated duration of an unsynthesized sentence
    #[serde(default = "default_min_duration_secs")]
    pub min_duration_secs: f64,

    /// Estimated speaking time per character
    #[serde(default = "default_per_char_secs")]
    pub per_char_secs: f64,

    /// Accepted difference between timeline end and stitched audio length
    #[serde(default = "default_drift_tolerance_secs")]
    pub drift_tolerance_secs: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            gap_secs: default_gap_secs(),
            min_duration_secs: default_min_duration_secs(),
            per_char_secs: default_per_char_secs(),
            drift_tolerance_secs: default_drift_tolerance_secs(),
        }
    }
}

impl TimelineConfig {
    /// Estimated duration of a sentence whose audio is unavailable
    pub fn fallback_duration(&self, text: &str) -> f64 {
        crate::timeline::fallback_duration(text, self.min_duration_secs, self.per_char_secs)
    }
}

/// Output locations
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Directory for `{step_id}_{index}.mp3`
    #[serde(default = "default_sentence_audio_dir")]
    pub sentence_audio_dir: String,

    /// Directory for `{step_id}_scene.mp3`
    #[serde(default = "default_scene_audio_dir")]
    pub scene_audio_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sentence_audio_dir: default_sentence_audio_dir(),
            scene_audio_dir: default_scene_audio_dir(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_tts_endpoint() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_voice_id() -> String {
    // "Rachel", one of the stock voices
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_stability() -> f32 {
    0.5
}

fn default_similarity_boost() -> f32 {
    0.75
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_gap_secs() -> f64 {
    DEFAULT_GAP_SECONDS
}

fn default_min_duration_secs() -> f64 {
    DEFAULT_MIN_DURATION_SECONDS
}

fn default_per_char_secs() -> f64 {
    DEFAULT_PER_CHAR_SECONDS
}

fn default_drift_tolerance_secs() -> f64 {
    DEFAULT_DRIFT_TOLERANCE_SECONDS
}

fn default_sentence_audio_dir() -> String {
    "audio/sentences".to_string()
}

fn default_scene_audio_dir() -> String {
    "audio/scenes".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    ///
    /// `require_api_key` is false for runs that never call the speech API.
    pub fn validate(&self, require_api_key: bool) -> Result<()> {
        if require_api_key && self.tts.get_api_key().is_empty() {
            return Err(anyhow!(
                "TTS API key is required (set tts.api_key, --api-key or {})",
                API_KEY_ENV_VAR
            ));
        }

        if self.tts.voice_id.trim().is_empty() {
            return Err(anyhow!("tts.voice_id must not be empty"));
        }

        if self.tts.model_id.trim().is_empty() {
            return Err(anyhow!("tts.model_id must not be empty"));
        }

        if self.tts.concurrent_requests == 0 {
            return Err(anyhow!("tts.concurrent_requests must be at least 1"));
        }

        if self.tts.timeout_secs == 0 {
            return Err(anyhow!("tts.timeout_secs must be at least 1"));
        }

        let non_negative = [
            ("timeline.gap_secs", self.timeline.gap_secs),
            ("timeline.min_duration_secs", self.timeline.min_duration_secs),
            ("timeline.per_char_secs", self.timeline.per_char_secs),
            ("timeline.drift_tolerance_secs", self.timeline.drift_tolerance_secs),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!("{} must be a non-negative number, got {}", name, value));
            }
        }

        if FileManager::normalize_path(&self.output.sentence_audio_dir)
            == FileManager::normalize_path(&self.output.scene_audio_dir)
        {
            return Err(anyhow!(
                "output.sentence_audio_dir and output.scene_audio_dir must differ"
            ));
        }

        Ok(())
    }
}

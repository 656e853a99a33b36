/*!
 * Speech synthesis providers.
 *
 * This module contains client implementations for text-to-speech services:
 * - ElevenLabs: HTTP API integration
 * - Mock: offline provider with scripted behaviour for tests
 */

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;

use crate::app_config::{TtsConfig, VoiceSettings};
use crate::errors::ProviderError;

/// Everything a provider needs to voice one sentence
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    /// Text to speak, never blank
    pub text: String,
    pub voice_id: String,
    pub model_id: String,
    pub voice_settings: VoiceSettings,
}

impl SpeechRequest {
    /// Create a request using the voice and model from the configuration
    pub fn from_config(text: impl Into<String>, config: &TtsConfig) -> Self {
        Self {
            text: text.into(),
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
            voice_settings: config.voice_settings.clone(),
        }
    }
}

/// Common trait for all speech providers
///
/// Implementations return the encoded audio exactly as received; measuring
/// it is the caller's job.
#[async_trait]
pub trait SpeechProvider: Send + Sync + Debug {
    /// Synthesize one sentence into encoded (MP3) audio
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Bytes, ProviderError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

pub mod elevenlabs;
pub mod mock;

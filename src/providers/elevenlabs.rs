use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::app_config::{TtsConfig, VoiceSettings};
use crate::errors::ProviderError;
use crate::providers::{SpeechProvider, SpeechRequest};

/// ElevenLabs client for the text-to-speech endpoint
#[derive(Debug)]
pub struct ElevenLabs {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL, always ending with '/'
    base_url: Url,
}

/// Body of a text-to-speech request
#[derive(Debug, Serialize)]
pub struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

impl ElevenLabs {
    /// Create a new client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let normalized = format!("{}/", endpoint.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url,
        })
    }

    /// Create a client from the TTS section of the configuration
    pub fn from_config(config: &TtsConfig) -> Result<Self, ProviderError> {
        Self::new(config.get_api_key(), &config.endpoint, config.timeout())
    }

    /// URL of the synthesis endpoint for a voice
    pub fn speech_url(&self, voice_id: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(&format!("v1/text-to-speech/{}", voice_id))
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid voice id '{}': {}", voice_id, e)))
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabs {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Bytes, ProviderError> {
        let url = self.speech_url(&request.voice_id)?;
        let body = ElevenLabsRequest {
            text: &request.text,
            model_id: &request.model_id,
            voice_settings: &request.voice_settings,
        };

        let response = self
            .client
            .post(url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to send request to ElevenLabs API: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("ElevenLabs API error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::AuthenticationError(error_text)
                }
                _ => ProviderError::ApiError {
                    status_code: status.as_u16(),
                    message: error_text,
                },
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to read audio payload: {}", e)))?;

        if audio.is_empty() {
            return Err(ProviderError::EmptyPayload);
        }

        debug!("Received {} bytes of audio for {} chars", audio.len(), request.text.chars().count());
        Ok(audio)
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}

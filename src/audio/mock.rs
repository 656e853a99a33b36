/*!
 * Offline audio engine.
 *
 * Mock clips are small text files holding `duration=<seconds>`. The engine
 * "measures" a clip by reading that value back and "stitches" clips by
 * writing a new mock clip whose duration is the sum of the inputs plus the
 * silence between them. This keeps the whole pipeline runnable without
 * ffmpeg installed.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::AudioEngine;
use crate::errors::AudioError;

const MOCK_CLIP_PREFIX: &str = "MOCKCLIP duration=";

/// Encode a mock clip of the given duration
pub fn encode_mock_clip(duration_secs: f64) -> Vec<u8> {
    format!("{}{}\n", MOCK_CLIP_PREFIX, duration_secs).into_bytes()
}

/// Decode the duration of a mock clip
pub fn decode_mock_clip(content: &[u8]) -> Result<f64, AudioError> {
    let text = String::from_utf8_lossy(content);
    let value = text
        .trim()
        .strip_prefix(MOCK_CLIP_PREFIX)
        .ok_or_else(|| AudioError::InvalidDuration("not a mock clip".to_string()))?;

    let duration: f64 = value
        .parse()
        .map_err(|_| AudioError::InvalidDuration(format!("bad mock duration '{}'", value)))?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(AudioError::InvalidDuration(format!("bad mock duration '{}'", value)));
    }
    Ok(duration)
}

/// Audio engine operating on mock clips
#[derive(Debug, Clone, Default)]
pub struct MockAudioEngine {
    fail_concat: bool,
    /// Every concatenation performed, as the list of input clips
    concat_calls: Arc<Mutex<Vec<Vec<PathBuf>>>>,
}

impl MockAudioEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose concatenation always fails
    pub fn failing_concat() -> Self {
        Self {
            fail_concat: true,
            ..Self::default()
        }
    }

    /// Clips passed to each concatenation so far
    pub fn concat_calls(&self) -> Vec<Vec<PathBuf>> {
        self.concat_calls.lock().clone()
    }
}

#[async_trait]
impl AudioEngine for MockAudioEngine {
    async fn probe_duration(&self, path: &Path) -> Result<f64, AudioError> {
        let content = tokio::fs::read(path).await?;
        decode_mock_clip(&content)
    }

    async fn concat_with_silence(
        &self,
        clips: &[PathBuf],
        gap_secs: f64,
        output: &Path,
    ) -> Result<(), AudioError> {
        self.concat_calls.lock().push(clips.to_vec());

        if clips.is_empty() {
            return Err(AudioError::NoClips);
        }

        if self.fail_concat {
            return Err(AudioError::ToolFailed {
                tool: "mock".to_string(),
                stderr: "simulated concatenation failure".to_string(),
            });
        }

        let mut total = 0.0;
        for clip in clips {
            total += self.probe_duration(clip).await?;
        }
        total += gap_secs * (clips.len() - 1) as f64;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, encode_mock_clip(total)).await?;
        Ok(())
    }
}

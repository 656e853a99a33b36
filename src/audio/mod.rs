/*!
 * Measuring and concatenating encoded audio.
 *
 * The pipeline never decodes audio itself. It goes through an
 * [`AudioEngine`]:
 * - `ffmpeg`: shells out to ffprobe / ffmpeg
 * - `mock`: reads and writes tiny text clips, for tests and offline runs
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::errors::AudioError;

/// Operations the pipeline needs from an audio toolchain
#[async_trait]
pub trait AudioEngine: Send + Sync + Debug {
    /// Duration of an encoded audio file, in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64, AudioError>;

    /// Write `clips`, in order and separated by `gap_secs` of silence, to `output`
    async fn concat_with_silence(
        &self,
        clips: &[PathBuf],
        gap_secs: f64,
        output: &Path,
    ) -> Result<(), AudioError>;
}

pub mod ffmpeg;
pub mod mock;

pub use self::ffmpeg::FfmpegEngine;
pub use self::mock::MockAudioEngine;

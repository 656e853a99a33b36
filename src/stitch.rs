/*!
 * Per-step audio stitching.
 *
 * Joins the clips of the sentences that were actually synthesized, in
 * sentence order, with the timeline gap as silence between them.
 */

use log::{debug, warn};
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::AudioEngine;
use crate::file_utils::FileManager;
use crate::timeline::ResolvedSentence;

/// Written to `audio_file_scene` when a step has no clip at all
pub const NO_AUDIO_SENTINEL: &str = "NO_AUDIO";

/// Written to `audio_file_scene` when stitching failed
pub const STITCH_ERROR_SENTINEL: &str = "ERROR_STITCHING";

/// Combined audio of a step
#[derive(Debug, Clone, PartialEq)]
pub enum SceneAudio {
    /// Stitched file
    File(PathBuf),
    /// No sentence of the step produced audio
    NoAudio,
    /// Stitching or measuring the result failed
    Failed(String),
}

impl SceneAudio {
    /// Value of `audio_file_scene` in the output document
    pub fn to_output_string(&self) -> String {
        match self {
            Self::File(path) => path.to_string_lossy().into_owned(),
            Self::NoAudio => NO_AUDIO_SENTINEL.to_string(),
            Self::Failed(_) => STITCH_ERROR_SENTINEL.to_string(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            _ => None,
        }
    }
}

impl Serialize for SceneAudio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_output_string())
    }
}

/// Result of stitching one step
#[derive(Debug, Clone, PartialEq)]
pub struct StitchOutcome {
    pub audio: SceneAudio,
    /// Measured duration of the stitched file, 0 without one
    pub duration_seconds: f64,
}

impl StitchOutcome {
    fn without_audio(audio: SceneAudio) -> Self {
        Self {
            audio,
            duration_seconds: 0.0,
        }
    }
}

/// Expected length of a stitched step: clips plus one gap between each pair
pub fn expected_stitch_duration(clip_durations: &[f64], gap: f64) -> f64 {
    if clip_durations.is_empty() {
        return 0.0;
    }
    clip_durations.iter().sum::<f64>() + gap * (clip_durations.len() - 1) as f64
}

/// Clips of a step that can be stitched, in sentence order
pub fn stitchable_clips(sentences: &[ResolvedSentence]) -> Vec<PathBuf> {
    let mut ordered: Vec<&ResolvedSentence> = sentences.iter().collect();
    ordered.sort_by_key(|s| s.sentence.index);
    ordered
        .into_iter()
        .filter_map(|s| s.audio_file.clone())
        .collect()
}

/// Concatenates sentence clips into one file per step
#[derive(Debug, Clone)]
pub struct StepAudioStitcher {
    engine: Arc<dyn AudioEngine>,
    scene_audio_dir: PathBuf,
    gap_seconds: f64,
}

impl StepAudioStitcher {
    pub fn new(engine: Arc<dyn AudioEngine>, scene_audio_dir: impl Into<PathBuf>, gap_seconds: f64) -> Self {
        Self {
            engine,
            scene_audio_dir: scene_audio_dir.into(),
            gap_seconds,
        }
    }

    /// Same stitcher writing to `{scene_audio_dir}/{subdir}`
    pub fn in_subdirectory(&self, subdir: &str) -> Self {
        let mut scoped = self.clone();
        scoped.scene_audio_dir = self.scene_audio_dir.join(subdir);
        scoped
    }

    /// Stitch the clips of a step into `{scene_audio_dir}/{step_id}_scene.mp3`.
    ///
    /// Never fails: an empty clip list yields [`SceneAudio::NoAudio`] and an
    /// engine error yields [`SceneAudio::Failed`], both with duration 0. In
    /// both cases no scene file is left at the output path.
    pub async fn stitch(&self, step_id: &str, clips: &[PathBuf]) -> StitchOutcome {
        let output = FileManager::scene_audio_path(&self.scene_audio_dir, step_id);

        if clips.is_empty() {
            debug!("Step '{}' has no audio clips to stitch", step_id);
            FileManager::remove_stale_file(&output).await;
            return StitchOutcome::without_audio(SceneAudio::NoAudio);
        }

        if let Err(e) = self
            .engine
            .concat_with_silence(clips, self.gap_seconds, &output)
            .await
        {
            warn!("Failed to stitch audio for step '{}': {}", step_id, e);
            FileManager::remove_stale_file(&output).await;
            return StitchOutcome::without_audio(SceneAudio::Failed(e.to_string()));
        }

        match self.engine.probe_duration(&output).await {
            Ok(duration_seconds) => {
                debug!(
                    "Stitched {} clips for step '{}' into {:?} ({:.3}s)",
                    clips.len(),
                    step_id,
                    output,
                    duration_seconds
                );
                StitchOutcome {
                    audio: SceneAudio::File(output),
                    duration_seconds,
                }
            }
            Err(e) => {
                warn!("Failed to measure stitched audio for step '{}': {}", step_id, e);
                FileManager::remove_stale_file(&output).await;
                StitchOutcome::without_audio(SceneAudio::Failed(e.to_string()))
            }
        }
    }
}

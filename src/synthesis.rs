/*!
 * Speech synthesis stage.
 *
 * Sends every sentence to the speech provider with a bounded number of
 * requests in flight, persists the returned audio, and measures it. A
 * failed sentence never aborts the run: it is reported as a failure and
 * later timed with the fallback heuristic.
 */

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::app_config::{TimelineConfig, TtsConfig};
use crate::audio::AudioEngine;
use crate::errors::ProviderError;
use crate::file_utils::FileManager;
use crate::providers::{SpeechProvider, SpeechRequest};
use crate::timeline::{ResolvedSentence, Sentence};

/// Identifies a sentence across the whole document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SentenceKey {
    pub step_id: String,
    pub index: usize,
}

impl SentenceKey {
    pub fn new(step_id: impl Into<String>, index: usize) -> Self {
        Self {
            step_id: step_id.into(),
            index,
        }
    }
}

/// Audio of one synthesized sentence
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceAudio {
    pub bytes: Bytes,
    /// Where the bytes were persisted
    pub path: PathBuf,
}

/// What happened when a sentence was sent for synthesis
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOutcome {
    /// Audio was produced and measured
    Success {
        duration_seconds: f64,
        audio: SentenceAudio,
    },
    /// The provider, the file system or the measurement failed
    Failure { reason: String },
    /// Nothing to speak
    Blank,
    /// Synthesis was not attempted
    Skipped,
}

/// Result of synthesizing one sentence
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    pub step_id: String,
    pub sentence: Sentence,
    pub outcome: SynthesisOutcome,
}

impl SynthesisResult {
    pub fn key(&self) -> SentenceKey {
        SentenceKey::new(self.step_id.clone(), self.sentence.index)
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, SynthesisOutcome::Success { .. })
    }

    pub fn audio_bytes(&self) -> Option<&Bytes> {
        match &self.outcome {
            SynthesisOutcome::Success { audio, .. } => Some(&audio.bytes),
            _ => None,
        }
    }

    /// Duration to place on the timeline.
    ///
    /// Measured audio is used as is; the heuristic only applies when no
    /// audio is available.
    pub fn audio_duration_seconds(&self, timeline: &TimelineConfig) -> f64 {
        match &self.outcome {
            SynthesisOutcome::Success { duration_seconds, .. } => *duration_seconds,
            SynthesisOutcome::Failure { .. } | SynthesisOutcome::Skipped => {
                timeline.fallback_duration(&self.sentence.text)
            }
            SynthesisOutcome::Blank => 0.0,
        }
    }

    /// Turn the result into a sentence ready for the timeline
    pub fn resolve(self, timeline: &TimelineConfig) -> ResolvedSentence {
        let duration = self.audio_duration_seconds(timeline);
        match self.outcome {
            SynthesisOutcome::Success { audio, .. } => {
                ResolvedSentence::measured(self.sentence, duration, Some(audio.path))
            }
            SynthesisOutcome::Failure { .. } | SynthesisOutcome::Skipped => {
                ResolvedSentence::estimated(self.sentence, duration)
            }
            SynthesisOutcome::Blank => ResolvedSentence::silent(self.sentence),
        }
    }
}

/// One sentence waiting for synthesis
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    pub step_id: String,
    pub sentence: Sentence,
}

/// Speech synthesis with bounded concurrency
#[derive(Clone)]
pub struct SpeechSynthesizer {
    provider: Arc<dyn SpeechProvider>,
    engine: Arc<dyn AudioEngine>,
    tts: TtsConfig,
    sentence_audio_dir: PathBuf,
    /// Deadline for a whole sentence (request, write, measure)
    call_timeout: Duration,
}

impl SpeechSynthesizer {
    pub fn new(
        provider: Arc<dyn SpeechProvider>,
        engine: Arc<dyn AudioEngine>,
        tts: TtsConfig,
        sentence_audio_dir: impl Into<PathBuf>,
    ) -> Self {
        let call_timeout = tts.timeout();
        Self {
            provider,
            engine,
            tts,
            sentence_audio_dir: sentence_audio_dir.into(),
            call_timeout,
        }
    }

    /// Override the per-sentence deadline
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Same synthesizer writing its clips to `{sentence_audio_dir}/{subdir}`
    pub fn in_subdirectory(&self, subdir: &str) -> Self {
        let mut scoped = self.clone();
        scoped.sentence_audio_dir = self.sentence_audio_dir.join(subdir);
        scoped
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Maximum number of requests in flight
    pub fn max_concurrent_requests(&self) -> usize {
        self.tts.concurrent_requests.max(1)
    }

    /// Synthesize one sentence. Never fails; failures are part of the outcome.
    pub async fn synthesize_sentence(&self, step_id: &str, sentence: Sentence) -> SynthesisResult {
        let outcome = if sentence.is_blank() {
            debug!("Step '{}' sentence {} is blank, not synthesizing", step_id, sentence.index);
            SynthesisOutcome::Blank
        } else {
            match tokio::time::timeout(self.call_timeout, self.produce_audio(step_id, &sentence)).await {
                Ok(Ok((duration_seconds, audio))) => SynthesisOutcome::Success {
                    duration_seconds,
                    audio,
                },
                Ok(Err(reason)) => SynthesisOutcome::Failure { reason },
                Err(_) => SynthesisOutcome::Failure {
                    reason: ProviderError::Timeout(self.call_timeout).to_string(),
                },
            }
        };

        if let SynthesisOutcome::Failure { reason } = &outcome {
            warn!(
                "Synthesis failed for step '{}' sentence {}: {}; using estimated duration",
                step_id, sentence.index, reason
            );
        }

        // A sentence without audio must not leave a clip behind: neither a
        // partial write cut short by the timeout nor one from an earlier run
        if !matches!(outcome, SynthesisOutcome::Success { .. }) {
            let path = FileManager::sentence_audio_path(&self.sentence_audio_dir, step_id, sentence.index);
            FileManager::remove_stale_file(&path).await;
        }

        SynthesisResult {
            step_id: step_id.to_string(),
            sentence,
            outcome,
        }
    }

    async fn produce_audio(&self, step_id: &str, sentence: &Sentence) -> Result<(f64, SentenceAudio), String> {
        let request = SpeechRequest::from_config(sentence.text.clone(), &self.tts);
        let bytes = self
            .provider
            .synthesize(&request)
            .await
            .map_err(|e| e.to_string())?;

        let path = FileManager::sentence_audio_path(&self.sentence_audio_dir, step_id, sentence.index);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create {:?}: {}", parent, e))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| format!("Failed to write {:?}: {}", path, e))?;

        match self.engine.probe_duration(&path).await {
            Ok(duration) => {
                debug!("Step '{}' sentence {}: {:.3}s -> {:?}", step_id, sentence.index, duration, path);
                Ok((duration, SentenceAudio { bytes, path }))
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Synthesize all jobs, at most `max_concurrent_requests` at a time.
    ///
    /// Results are keyed by `(step_id, index)`, so completion order does not
    /// matter to the caller.
    pub async fn synthesize_all(
        &self,
        jobs: Vec<SynthesisJob>,
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> HashMap<SentenceKey, SynthesisResult> {
        let max_concurrent = self.max_concurrent_requests();
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        let total = jobs.len();
        let completed = Arc::new(AtomicUsize::new(0));

        let results = stream::iter(jobs)
            .map(|job| {
                let synthesizer = self.clone();
                let semaphore = semaphore.clone();
                let completed = completed.clone();
                let progress_callback = progress_callback.clone();

                async move {
                    // The semaphore is never closed, so a permit is always granted
                    let _permit = semaphore.acquire().await.ok();

                    let result = synthesizer.synthesize_sentence(&job.step_id, job.sentence).await;

                    let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total);

                    result
                }
            })
            .buffer_unordered(max_concurrent)
            .collect::<Vec<_>>()
            .await;

        results.into_iter().map(|result| (result.key(), result)).collect()
    }
}

/// Results for sentences that were never sent to a provider
pub fn skipped_results(jobs: Vec<SynthesisJob>) -> HashMap<SentenceKey, SynthesisResult> {
    jobs.into_iter()
        .map(|job| {
            let outcome = if job.sentence.is_blank() {
                SynthesisOutcome::Blank
            } else {
                SynthesisOutcome::Skipped
            };
            let result = SynthesisResult {
                step_id: job.step_id,
                sentence: job.sentence,
                outcome,
            };
            (result.key(), result)
        })
        .collect()
}

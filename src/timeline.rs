/*!
 * Step-local narration timeline.
 *
 * Turns the ordered sentences of one step, each with a resolved duration,
 * into start/end offsets. Every step starts at zero and consecutive
 * sentences are separated by a fixed gap.
 */

use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default gap between consecutive sentences, in seconds
pub const DEFAULT_GAP_SECONDS: f64 = 0.01;

/// Lower bound of the estimated duration of a sentence, in seconds
pub const DEFAULT_MIN_DURATION_SECONDS: f64 = 0.75;

/// Estimated speaking time per character, in seconds
pub const DEFAULT_PER_CHAR_SECONDS: f64 = 0.15;

/// One spoken utterance of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    /// Text to be spoken
    pub text: String,
    /// Zero-based position within the step
    pub index: usize,
}

impl Sentence {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            index,
        }
    }

    /// Whether there is anything to speak
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Where a sentence duration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationSource {
    /// Measured from synthesized audio
    Measured,
    /// Heuristic used after a synthesis failure (or in estimate-only runs)
    Estimated,
    /// Nothing to speak, zero-length
    Silent,
}

/// A sentence whose duration is known and ready to be placed on the timeline
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSentence {
    pub sentence: Sentence,
    pub duration_seconds: f64,
    pub source: DurationSource,
    /// Persisted clip, only for measured sentences
    pub audio_file: Option<PathBuf>,
}

impl ResolvedSentence {
    /// A sentence timed from real audio
    pub fn measured(sentence: Sentence, duration_seconds: f64, audio_file: Option<PathBuf>) -> Self {
        Self {
            sentence,
            duration_seconds,
            source: DurationSource::Measured,
            audio_file,
        }
    }

    /// A sentence timed with the fallback heuristic
    pub fn estimated(sentence: Sentence, duration_seconds: f64) -> Self {
        Self {
            sentence,
            duration_seconds,
            source: DurationSource::Estimated,
            audio_file: None,
        }
    }

    /// A blank sentence
    pub fn silent(sentence: Sentence) -> Self {
        Self {
            sentence,
            duration_seconds: 0.0,
            source: DurationSource::Silent,
            audio_file: None,
        }
    }
}

/// A sentence placed on its step's timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSentence {
    pub text: String,
    pub index: usize,
    pub start_time_seconds: f64,
    pub end_time_seconds: f64,
    pub duration_seconds: f64,
    pub duration_source: DurationSource,
    pub audio_file: Option<String>,
}

/// Heuristic duration for a sentence whose audio is unavailable.
///
/// `max(min_duration, chars * per_char)`, where `chars` counts Unicode
/// scalar values.
pub fn fallback_duration(text: &str, min_duration: f64, per_char_seconds: f64) -> f64 {
    let estimate = text.chars().count() as f64 * per_char_seconds;
    estimate.max(min_duration)
}

/// Build the timeline of one step.
///
/// The first sentence starts at zero, each following sentence starts `gap`
/// seconds after the previous one ends. The input must already be ordered
/// by sentence index.
pub fn build_timeline(sentences: &[ResolvedSentence], gap: f64) -> Vec<TimedSentence> {
    sentences
        .iter()
        .enumerate()
        .fold(
            (Vec::with_capacity(sentences.len()), 0.0_f64),
            |(mut timeline, cursor), (position, resolved)| {
                let duration = sanitize_duration(resolved);
                let start = if position > 0 { cursor + gap } else { 0.0 };
                let end = start + duration;

                timeline.push(TimedSentence {
                    text: resolved.sentence.text.clone(),
                    index: resolved.sentence.index,
                    start_time_seconds: start,
                    end_time_seconds: end,
                    duration_seconds: duration,
                    duration_source: resolved.source,
                    audio_file: resolved
                        .audio_file
                        .as_ref()
                        .map(|p| p.to_string_lossy().into_owned()),
                });

                (timeline, end)
            },
        )
        .0
}

/// End of the last sentence, or zero for an empty step
pub fn step_end(timeline: &[TimedSentence]) -> f64 {
    timeline.last().map_or(0.0, |s| s.end_time_seconds)
}

fn sanitize_duration(resolved: &ResolvedSentence) -> f64 {
    let duration = resolved.duration_seconds;
    if duration.is_finite() && duration >= 0.0 {
        duration
    } else {
        warn!(
            "Sentence {} has invalid duration {}, using 0",
            resolved.sentence.index, duration
        );
        0.0
    }
}

/*!
 * Tests for concurrent speech synthesis
 */

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use narrasync::app_config::TimelineConfig;
use narrasync::audio::MockAudioEngine;
use narrasync::providers::mock::MockProvider;
use narrasync::synthesis::{SentenceKey, SpeechSynthesizer, SynthesisJob, SynthesisOutcome};
use narrasync::timeline::{DurationSource, Sentence};

use crate::common;

fn jobs(step_id: &str, texts: &[&str]) -> Vec<SynthesisJob> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| SynthesisJob {
            step_id: step_id.to_string(),
            sentence: Sentence::new(i, *text),
        })
        .collect()
}

/// Test that every job gets a result keyed by step and index, whatever fails
#[tokio::test]
async fn test_synthesize_all_withIntermittentProvider_shouldReturnOneResultPerJob() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());
    let provider = MockProvider::intermittent(2);
    let synthesizer = SpeechSynthesizer::new(
        Arc::new(provider.clone()),
        Arc::new(MockAudioEngine::new()),
        config.tts.clone(),
        &config.output.sentence_audio_dir,
    );

    let texts = ["One.", "Two.", "Three.", "Four.", "Five.", "Six."];
    let progress = Arc::new(AtomicUsize::new(0));
    let progress_seen = progress.clone();
    let results = synthesizer
        .synthesize_all(jobs("s", &texts), move |current, _total| {
            progress_seen.fetch_max(current, Ordering::SeqCst);
        })
        .await;

    assert_eq!(results.len(), texts.len());
    assert_eq!(progress.load(Ordering::SeqCst), texts.len());
    assert_eq!(provider.request_count(), texts.len());

    let failures = results.values().filter(|r| !r.success()).count();
    assert_eq!(failures, 3);

    for (index, text) in texts.iter().enumerate() {
        let result = &results[&SentenceKey::new("s", index)];
        assert_eq!(result.sentence.text, *text);
    }
    Ok(())
}

/// Test that failed sentences fall back to the heuristic duration
#[tokio::test]
async fn test_resolve_withFailingProvider_shouldUseEstimatedDuration() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());
    let synthesizer = SpeechSynthesizer::new(
        Arc::new(MockProvider::failing()),
        Arc::new(MockAudioEngine::new()),
        config.tts.clone(),
        &config.output.sentence_audio_dir,
    );

    let result = synthesizer
        .synthesize_sentence("s", Sentence::new(0, "abcdefghijklmnopqrst"))
        .await;
    assert!(matches!(result.outcome, SynthesisOutcome::Failure { .. }));

    let resolved = result.resolve(&TimelineConfig::default());
    assert_eq!(resolved.source, DurationSource::Estimated);
    assert!((resolved.duration_seconds - 3.0).abs() < 1e-9);
    assert!(resolved.audio_file.is_none());
    Ok(())
}

/// Test that the number of requests in flight never exceeds the limit
#[tokio::test]
async fn test_synthesize_all_withLimitOfTwo_shouldNeverExceedTwoInFlight() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path());
    config.tts.concurrent_requests = 2;
    let provider = MockProvider::slow(5);
    let synthesizer = SpeechSynthesizer::new(
        Arc::new(provider.clone()),
        Arc::new(MockAudioEngine::new()),
        config.tts.clone(),
        &config.output.sentence_audio_dir,
    );

    let texts = ["a.", "b.", "c.", "d.", "e.", "f.", "g."];
    let results = synthesizer.synthesize_all(jobs("s", &texts), |_, _| {}).await;

    assert_eq!(results.len(), texts.len());
    assert!(results.values().all(|r| r.success()));
    assert!(provider.peak_in_flight() <= 2);
    assert!(provider.peak_in_flight() >= 1);
    Ok(())
}

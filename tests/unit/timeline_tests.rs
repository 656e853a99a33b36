/*!
 * Tests for step-local timeline construction
 */

use narrasync::consistency::check_step;
use narrasync::timeline::{
    build_timeline, fallback_duration, step_end, DurationSource, ResolvedSentence, Sentence,
    DEFAULT_GAP_SECONDS, DEFAULT_MIN_DURATION_SECONDS, DEFAULT_PER_CHAR_SECONDS,
};
use std::path::PathBuf;

use crate::common::assert_close;

fn measured(durations: &[f64]) -> Vec<ResolvedSentence> {
    durations
        .iter()
        .enumerate()
        .map(|(i, d)| {
            ResolvedSentence::measured(
                Sentence::new(i, format!("Sentence {}.", i)),
                *d,
                Some(PathBuf::from(format!("s_{}.mp3", i))),
            )
        })
        .collect()
}

/// Test that every sentence starts one gap after the previous one ends
#[test]
fn test_build_timeline_withManySentences_shouldKeepGapBetweenNeighbours() {
    let durations = [0.4, 1.25, 0.0, 3.5, 0.75, 2.0, 0.01];
    let gap = 0.2;
    let timeline = build_timeline(&measured(&durations), gap);

    assert_eq!(timeline.len(), durations.len());
    assert_eq!(timeline[0].start_time_seconds, 0.0);
    for pair in timeline.windows(2) {
        assert_close(pair[1].start_time_seconds, pair[0].end_time_seconds + gap);
    }
    for (timed, duration) in timeline.iter().zip(durations) {
        assert_close(timed.end_time_seconds - timed.start_time_seconds, duration);
        assert_eq!(timed.duration_seconds, duration);
    }
}

/// Test the documented three-sentence example
#[test]
fn test_build_timeline_withThreeSentences_shouldMatchExpectedTimestamps() {
    let timeline = build_timeline(&measured(&[2.0, 3.0, 1.5]), DEFAULT_GAP_SECONDS);

    let spans: Vec<(f64, f64)> = timeline
        .iter()
        .map(|t| (t.start_time_seconds, t.end_time_seconds))
        .collect();
    let expected = [(0.0, 2.0), (2.01, 5.01), (5.02, 6.52)];
    for ((start, end), (expected_start, expected_end)) in spans.into_iter().zip(expected) {
        assert_close(start, expected_start);
        assert_close(end, expected_end);
    }
    assert_close(step_end(&timeline), 6.52);
}

/// Test that a single silent sentence yields a zero-length span
#[test]
fn test_build_timeline_withZeroDuration_shouldProduceZeroSpan() {
    let timeline = build_timeline(&measured(&[0.0]), DEFAULT_GAP_SECONDS);
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].start_time_seconds, 0.0);
    assert_eq!(timeline[0].end_time_seconds, 0.0);
}

/// Test that the timeline keeps the sentence order and sources
#[test]
fn test_build_timeline_withMixedSources_shouldKeepOrderAndSource() {
    let resolved = vec![
        ResolvedSentence::measured(Sentence::new(0, "One."), 1.0, Some(PathBuf::from("a.mp3"))),
        ResolvedSentence::estimated(Sentence::new(1, "Estimated sentence."), 2.85),
        ResolvedSentence::silent(Sentence::new(2, "   ")),
    ];

    let timeline = build_timeline(&resolved, 0.5);

    let indices: Vec<usize> = timeline.iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(timeline[0].duration_source, DurationSource::Measured);
    assert_eq!(timeline[0].audio_file.as_deref(), Some("a.mp3"));
    assert_eq!(timeline[1].duration_source, DurationSource::Estimated);
    assert_eq!(timeline[1].audio_file, None);
    assert_eq!(timeline[2].duration_source, DurationSource::Silent);
    assert_close(timeline[2].start_time_seconds, 1.0 + 0.5 + 2.85 + 0.5);
    assert_close(timeline[2].end_time_seconds, timeline[2].start_time_seconds);
}

/// Test that the heuristic never goes below the minimum duration
#[test]
fn test_fallback_duration_shouldRespectMinimumAndCountCharacters() {
    let min = DEFAULT_MIN_DURATION_SECONDS;
    let per_char = DEFAULT_PER_CHAR_SECONDS;

    assert_eq!(fallback_duration("", min, per_char), min);
    assert_eq!(fallback_duration("Hi", min, per_char), min);
    assert_close(fallback_duration("abcdefghijklmnopqrst", min, per_char), 3.0);
    // Characters, not bytes
    assert_close(fallback_duration("éééééééééééééééééééé", min, per_char), 3.0);
}

/// Test that drift is measured against the end of the timeline
#[test]
fn test_check_step_withStitchedDurationMatching_shouldBeWithinTolerance() {
    let timeline = build_timeline(&measured(&[2.0, 3.0, 1.5]), DEFAULT_GAP_SECONDS);

    let report = check_step("s1", &timeline, 6.52, 0.01);
    assert!(report.within_tolerance);
    assert_close(report.expected_end, 6.52);

    let report = check_step("s1", &timeline, 4.0, 0.01);
    assert!(!report.within_tolerance);
    assert_close(report.drift, 2.52);
}

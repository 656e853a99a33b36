/*!
 * Drift detection between a step's timeline and its stitched audio.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::timeline::{step_end, TimedSentence};

/// Default tolerance for drift between timeline and stitched audio, in seconds
pub const DEFAULT_DRIFT_TOLERANCE_SECONDS: f64 = 0.01;

/// Comparison of the expected and the measured duration of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub step_id: String,
    /// End of the last sentence on the timeline
    pub expected_end: f64,
    /// Measured duration of the stitched audio
    pub actual_duration: f64,
    pub drift: f64,
    pub within_tolerance: bool,
}

/// Compare a step's timeline against its stitched audio duration.
///
/// Never fails; drift beyond `tolerance` is reported as a warning.
pub fn check_step(
    step_id: &str,
    timeline: &[TimedSentence],
    combined_audio_duration: f64,
    tolerance: f64,
) -> ConsistencyReport {
    let expected_end = step_end(timeline);
    let drift = (expected_end - combined_audio_duration).abs();
    let within_tolerance = drift <= tolerance;

    if within_tolerance {
        debug!(
            "Step '{}' timeline ends at {:.3}s, audio is {:.3}s (drift {:.4}s)",
            step_id, expected_end, combined_audio_duration, drift
        );
    } else {
        warn!(
            "Step '{}' drifts by {:.3}s: timeline ends at {:.3}s but audio is {:.3}s",
            step_id, drift, expected_end, combined_audio_duration
        );
    }

    ConsistencyReport {
        step_id: step_id.to_string(),
        expected_end,
        actual_duration: combined_audio_duration,
        drift,
        within_tolerance,
    }
}

/*!
 * Mock speech provider for testing.
 *
 * The provider answers with mock clips (see `audio::mock`) so that the
 * returned audio can be "measured" by `MockAudioEngine`:
 * - `MockProvider::working()` - Always succeeds
 * - `MockProvider::intermittent(n)` - Fails every n-th request
 * - `MockProvider::failing()` - Always fails with an error
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::audio::mock::encode_mock_clip;
use crate::errors::ProviderError;
use crate::providers::{SpeechProvider, SpeechRequest};

/// Seconds of mock speech per character when no custom duration is set
pub const MOCK_SECONDS_PER_CHAR: f64 = 0.05;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Answers 200 with an empty body
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing synthesis behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Requests currently being served
    in_flight: Arc<AtomicUsize>,
    /// Highest number of simultaneous requests seen
    peak_in_flight: Arc<AtomicUsize>,
    /// Texts received, in arrival order
    requests: Arc<Mutex<Vec<String>>>,
    /// Custom duration generator (optional)
    custom_duration: Option<fn(&str) -> f64>,
    /// Texts for which the request fails (optional)
    fail_when: Option<fn(&str) -> bool>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_duration: None,
            fail_when: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns empty payloads
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that waits before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom duration generator
    pub fn with_custom_duration(mut self, generator: fn(&str) -> f64) -> Self {
        self.custom_duration = Some(generator);
        self
    }

    /// Fail every request whose text matches the predicate
    pub fn with_failures_when(mut self, predicate: fn(&str) -> bool) -> Self {
        self.fail_when = Some(predicate);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of requests served at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Texts received so far
    pub fn requested_texts(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Duration the mock assigns to a text
    pub fn duration_for(&self, text: &str) -> f64 {
        match self.custom_duration {
            Some(generator) => generator(text),
            None => text.chars().count() as f64 * MOCK_SECONDS_PER_CHAR,
        }
    }

    fn clip_for(&self, text: &str) -> Bytes {
        Bytes::from(encode_mock_clip(self.duration_for(text)))
    }

    async fn respond(&self, request: &SpeechRequest, count: usize) -> Result<Bytes, ProviderError> {
        if self.fail_when.is_some_and(|predicate| predicate(&request.text)) {
            return Err(ProviderError::ApiError {
                message: "Simulated failure for this text".to_string(),
                status_code: 500,
            });
        }

        match self.behavior {
            MockBehavior::Working => Ok(self.clip_for(&request.text)),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.clip_for(&request.text))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Err(ProviderError::EmptyPayload),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.clip_for(&request.text))
            }
        }
    }
}

#[async_trait]
impl SpeechProvider for MockProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Bytes, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.text.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        // Let other requests start so concurrency limits are observable
        tokio::task::yield_now().await;
        let result = self.respond(request, count).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        "mock"
    }
}

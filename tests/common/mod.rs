/*!
 * Common test utilities for the narrasync test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use narrasync::app_config::Config;
use narrasync::audio::MockAudioEngine;
use narrasync::providers::mock::MockProvider;
use narrasync::Controller;

/// Routes library logs to the test output; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample explanation document for testing
pub fn create_test_document(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"{
  "problem": "Show that the sum of two even numbers is even.",
  "steps": [
    {
      "step_id": "intro",
      "scene": "Title",
      "sentences": ["Let us add two even numbers.", "Call them a and b."]
    },
    {
      "step_id": "proof",
      "sentences": [
        {"text": "Write a as two m.", "emphasis": "a"},
        {"text": "Write b as two n."},
        "Then a plus b is two times m plus n."
      ]
    },
    {
      "step_id": "outro",
      "sentences": []
    }
  ]
}"#;
    create_test_file(dir, filename, content)
}

/// Configuration writing its audio below `root`
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.tts.api_key = "test-key".to_string();
    config.tts.concurrent_requests = 3;
    config.output.sentence_audio_dir = root.join("audio").join("sentences").to_string_lossy().into_owned();
    config.output.scene_audio_dir = root.join("audio").join("scenes").to_string_lossy().into_owned();
    config
}

/// Controller using a mock provider and the mock audio engine
pub fn mock_controller(config: Config, provider: MockProvider) -> (Controller, MockAudioEngine) {
    init_test_logging();
    let engine = MockAudioEngine::new();
    let controller = Controller::with_backends(config, Arc::new(provider), Arc::new(engine.clone()));
    (controller, engine)
}

/// Asserts two durations agree within floating point noise
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

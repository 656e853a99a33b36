/*!
 * Integration tests for application lifecycle
 */

use anyhow::Result;

use narrasync::app_config::Config;
use narrasync::document::InputDocument;
use narrasync::providers::mock::MockProvider;
use narrasync::Controller;

use crate::common;

/// Test the controller initialization with a configured API key
#[test]
fn test_controller_with_config_withApiKey_shouldInitialize() -> Result<()> {
    let mut config = Config::default();
    config.tts.api_key = "test-key".to_string();

    let controller = Controller::with_config(config)?;

    assert!(!controller.is_estimate_only());
    Ok(())
}

/// Test that a missing input file is reported as an error
#[test]
fn test_run_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::estimate_only(common::test_config(temp_dir.path()));

    let result = tokio_test::block_on(controller.run(
        temp_dir.path().join("missing.json"),
        temp_dir.path().join("out.json"),
        false,
    ));

    assert!(result.is_err());
    Ok(())
}

/// Test that an unusable document fails the run without writing output
#[tokio::test]
async fn test_run_withDuplicateStepIds_shouldFailWithoutOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "dup.json",
        r#"[{"step_id": "a", "sentences": []}, {"step_id": "a", "sentences": []}]"#,
    )?;
    let output = temp_dir.path().join("dup.timed.json");
    let (controller, _engine) = common::mock_controller(common::test_config(temp_dir.path()), MockProvider::working());

    let result = controller.run(input, output.clone(), false).await;

    assert!(result.is_err());
    assert!(!output.exists());
    Ok(())
}

/// Test that processing an earlier output again gives the same timeline
#[tokio::test]
async fn test_run_withPreviousOutputAsInput_shouldReproduceTimeline() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_document(temp_dir.path(), "proof.json")?;
    let first = temp_dir.path().join("first.json");
    let second = temp_dir.path().join("second.json");
    let (controller, _engine) = common::mock_controller(common::test_config(temp_dir.path()), MockProvider::working());

    controller.run(input, first.clone(), false).await?;
    controller.run(first.clone(), second.clone(), false).await?;

    let first_doc = InputDocument::from_json(&std::fs::read_to_string(&first)?)?;
    let second_doc = InputDocument::from_json(&std::fs::read_to_string(&second)?)?;
    let first_steps: Vec<_> = first_doc.steps.iter().map(|s| s.sentences.clone()).collect();
    let second_steps: Vec<_> = second_doc.steps.iter().map(|s| s.sentences.clone()).collect();
    assert_eq!(first_steps, second_steps);
    Ok(())
}

/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::path::{Path, PathBuf};

use narrasync::file_utils::FileManager;

use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "test_file_exists.tmp", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path().join("missing.tmp")));
    Ok(())
}

/// Test that generate_output_path puts the timed document next to its input
#[test]
fn test_generate_output_path_withJsonInput_shouldAppendTimedSuffix() {
    let output_path = FileManager::generate_output_path(Path::new("/tmp/input/proof.json"));
    assert_eq!(output_path, Path::new("/tmp/input/proof.timed.json"));
}

/// Test audio file naming
#[test]
fn test_audio_paths_shouldFollowNamingConvention() {
    assert_eq!(
        FileManager::sentence_audio_path("audio/sentences", "step_2", 3),
        PathBuf::from("audio/sentences/step_2_3.mp3")
    );
    assert_eq!(
        FileManager::scene_audio_path("audio/scenes", "step_2"),
        PathBuf::from("audio/scenes/step_2_scene.mp3")
    );
}

/// Test that step ids cannot escape the audio directories
#[test]
fn test_sanitize_file_stem_withPathSeparators_shouldReplaceThem() {
    assert_eq!(FileManager::sanitize_file_stem("../etc/passwd"), ".._etc_passwd");
    assert_eq!(FileManager::sanitize_file_stem("step one"), "step_one");
    assert_eq!(FileManager::sanitize_file_stem(".."), "step");
    assert_eq!(FileManager::sanitize_file_stem("  "), "step");
}

/// Test that directory scanning skips previous outputs and other files
#[test]
fn test_find_documents_withMixedFiles_shouldReturnInputsOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "b.json", "[]")?;
    common::create_test_file(dir, "a.json", "[]")?;
    common::create_test_file(dir, "a.timed.json", "[]")?;
    common::create_test_file(dir, "notes.txt", "x")?;

    let documents = FileManager::find_documents(dir)?;

    assert_eq!(documents, vec![dir.join("a.json"), dir.join("b.json")]);
    Ok(())
}

/// Test that writing creates missing parent directories
#[test]
fn test_write_to_file_withMissingParent_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("out.json");

    FileManager::write_to_file(&path, "{}")?;

    assert_eq!(FileManager::read_to_string(&path)?, "{}");
    Ok(())
}

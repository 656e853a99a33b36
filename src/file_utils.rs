use anyhow::{Context, Result};
use log::{debug, warn};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

// @module: File and directory utilities

/// Suffix of the documents this tool writes
pub const OUTPUT_SUFFIX: &str = ".timed.json";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Output path for a timed document, next to its input
    pub fn generate_output_path<P: AsRef<Path>>(input_file: P) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push_str(OUTPUT_SUFFIX);

        match input_file.parent() {
            Some(parent) => parent.join(output_filename),
            None => PathBuf::from(output_filename),
        }
    }

    /// Make a step id safe to embed in a file name
    ///
    /// Path separators and other unusual characters become '_'.
    pub fn sanitize_file_stem(step_id: &str) -> String {
        static UNSAFE: OnceLock<Regex> = OnceLock::new();
        let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static pattern is valid"));

        let sanitized = unsafe_chars.replace_all(step_id.trim(), "_").to_string();
        if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
            "step".to_string()
        } else {
            sanitized
        }
    }

    /// `{dir}/{step_id}_{index}.mp3`
    pub fn sentence_audio_path<P: AsRef<Path>>(dir: P, step_id: &str, index: usize) -> PathBuf {
        dir.as_ref()
            .join(format!("{}_{}.mp3", Self::sanitize_file_stem(step_id), index))
    }

    /// `{dir}/{step_id}_scene.mp3`
    pub fn scene_audio_path<P: AsRef<Path>>(dir: P, step_id: &str) -> PathBuf {
        dir.as_ref()
            .join(format!("{}_scene.mp3", Self::sanitize_file_stem(step_id)))
    }

    /// Audio subdirectory name for a document, from its path without extension.
    ///
    /// Pass the path relative to the scanned folder so that documents with
    /// the same file name in different subfolders stay apart.
    pub fn audio_namespace<P: AsRef<Path>>(relative_input: P) -> String {
        let without_extension = relative_input.as_ref().with_extension("");
        let joined = without_extension
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("_");
        Self::sanitize_file_stem(&joined)
    }

    /// Lexically normalized path: `.` components and trailing separators dropped
    pub fn normalize_path<P: AsRef<Path>>(path: P) -> PathBuf {
        let mut normalized = PathBuf::new();
        for component in path.as_ref().components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !matches!(
                        normalized.components().next_back(),
                        Some(Component::Normal(_))
                    ) || !normalized.pop()
                    {
                        normalized.push("..");
                    }
                }
                other => normalized.push(other.as_os_str()),
            }
        }
        normalized
    }

    /// Delete a file left over from an earlier run. A missing file is fine.
    pub async fn remove_stale_file<P: AsRef<Path>>(path: P) {
        let path = path.as_ref();
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed stale audio {:?}", path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove stale audio {:?}: {}", path, e),
        }
    }

    /// Find input documents (`*.json`, except our own outputs) in a directory
    pub fn find_documents<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let name = path.file_name().unwrap_or_default().to_string_lossy().to_lowercase();
            if name.ends_with(".json") && !name.ends_with(OUTPUT_SUFFIX) {
                result.push(path.to_path_buf());
            }
        }

        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }
}

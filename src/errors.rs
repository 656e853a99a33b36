/*!
 * Error types for the narrasync application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to a speech synthesis API
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The API answered 200 but sent no audio
    #[error("API returned an empty audio payload")]
    EmptyPayload,

    /// The call did not finish within its deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors raised by the external audio tools (ffprobe / ffmpeg) or their doubles
#[derive(Error, Debug)]
pub enum AudioError {
    /// The tool could not be started at all
    #[error("Failed to execute {tool}: {message}")]
    Spawn {
        /// Tool name
        tool: String,
        /// Underlying error
        message: String,
    },

    /// The tool ran but exited unsuccessfully
    #[error("{tool} failed: {stderr}")]
    ToolFailed {
        /// Tool name
        tool: String,
        /// Filtered stderr of the tool
        stderr: String,
    },

    /// The tool did not finish in time
    #[error("{tool} timed out after {timeout:?}")]
    Timeout {
        /// Tool name
        tool: String,
        /// Deadline that was exceeded
        timeout: Duration,
    },

    /// A duration could not be read from the ffprobe output
    #[error("Could not read audio duration: {0}")]
    InvalidDuration(String),

    /// A concatenation was requested without any input clip
    #[error("No clips to concatenate")]
    NoClips,

    /// Reading or writing an audio file failed
    #[error("Audio file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors in the structure of the input document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document is not valid JSON or has the wrong top-level shape
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// A step has no usable `step_id`
    #[error("Step at position {0} has no step_id")]
    MissingStepId(usize),

    /// Two steps share the same `step_id`
    #[error("Duplicate step_id: {0}")]
    DuplicateStepId(String),
}

impl From<serde_json::Error> for DocumentError {
    fn from(error: serde_json::Error) -> Self {
        Self::Malformed(error.to_string())
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the speech provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the audio tools
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Error in the input document
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

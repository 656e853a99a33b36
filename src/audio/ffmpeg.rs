use async_trait::async_trait;
use log::{debug, error};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::audio::AudioEngine;
use crate::errors::AudioError;

/// Sample rate used for generated silence and the stitched output
const SAMPLE_RATE: u32 = 44_100;

/// Audio engine backed by the ffmpeg command-line tools
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: String,
    ffprobe: String,
    timeout: Duration,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use specific binaries instead of the ones on PATH
    pub fn with_binaries(mut self, ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments for concatenating `clips` with `gap_secs` of silence in between
    pub fn concat_args(clips: &[PathBuf], gap_secs: f64, output: &Path) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-hide_banner".to_string()];
        for clip in clips {
            args.push("-i".to_string());
            args.push(clip.to_string_lossy().into_owned());
        }

        let mut graph = Vec::new();
        let mut segments = Vec::new();
        for i in 0..clips.len() {
            if i > 0 && gap_secs > 0.0 {
                graph.push(format!(
                    "anullsrc=r={}:cl=mono,atrim=duration={:.3}[s{}]",
                    SAMPLE_RATE, gap_secs, i
                ));
                segments.push(format!("[s{}]", i));
            }
            graph.push(format!(
                "[{}:a]aresample={},aformat=channel_layouts=mono[a{}]",
                i, SAMPLE_RATE, i
            ));
            segments.push(format!("[a{}]", i));
        }
        graph.push(format!(
            "{}concat=n={}:v=0:a=1[out]",
            segments.concat(),
            segments.len()
        ));

        args.extend([
            "-filter_complex".to_string(),
            graph.join(";"),
            "-map".to_string(),
            "[out]".to_string(),
            "-c:a".to_string(),
            "libmp3lame".to_string(),
            "-q:a".to_string(),
            "2".to_string(),
            output.to_string_lossy().into_owned(),
        ]);
        args
    }

    async fn run(&self, tool: &str, args: &[String]) -> Result<Output, AudioError> {
        let future = Command::new(tool).args(args).kill_on_drop(true).output();

        let output = tokio::select! {
            result = future => {
                result.map_err(|e| AudioError::Spawn {
                    tool: tool.to_string(),
                    message: e.to_string(),
                })?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(AudioError::Timeout {
                    tool: tool.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            let stderr = filter_stderr(&String::from_utf8_lossy(&output.stderr));
            error!("{} failed: {}", tool, stderr);
            return Err(AudioError::ToolFailed {
                tool: tool.to_string(),
                stderr,
            });
        }

        Ok(output)
    }
}

#[async_trait]
impl AudioEngine for FfmpegEngine {
    async fn probe_duration(&self, path: &Path) -> Result<f64, AudioError> {
        let args = [
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        let output = self.run(&self.ffprobe, &args).await?;
        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn concat_with_silence(
        &self,
        clips: &[PathBuf],
        gap_secs: f64,
        output: &Path,
    ) -> Result<(), AudioError> {
        if clips.is_empty() {
            return Err(AudioError::NoClips);
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = Self::concat_args(clips, gap_secs, output);
        debug!("Stitching {} clips into {:?}", clips.len(), output);
        self.run(&self.ffmpeg, &args).await?;
        Ok(())
    }
}

/// Read the duration printed by `ffprobe -show_entries format=duration`
pub fn parse_probe_duration(stdout: &str) -> Result<f64, AudioError> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let duration: f64 = line
        .parse()
        .map_err(|_| AudioError::InvalidDuration(format!("unexpected ffprobe output '{}'", line)))?;

    if !duration.is_finite() || duration < 0.0 {
        return Err(AudioError::InvalidDuration(format!("negative or infinite duration {}", duration)));
    }
    Ok(duration)
}

/// Keep the meaningful tail of ffmpeg's stderr
fn filter_stderr(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| !l.starts_with("ffmpeg version") && !l.starts_with("built with") && !l.starts_with("configuration:"))
        .collect();

    if lines.is_empty() {
        return "unknown error (stderr was empty after filtering)".to_string();
    }

    let start = lines.len().saturating_sub(5);
    lines[start..].join(" | ")
}

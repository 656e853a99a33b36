use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::audio::{AudioEngine, FfmpegEngine};
use crate::consistency::{check_step, ConsistencyReport};
use crate::document::{extract_sentences, InputDocument, OutputStep};
use crate::errors::{AppError, DocumentError};
use crate::file_utils::FileManager;
use crate::providers::elevenlabs::ElevenLabs;
use crate::providers::SpeechProvider;
use crate::stitch::{stitchable_clips, SceneAudio, StepAudioStitcher};
use crate::synthesis::{
    skipped_results, SentenceKey, SpeechSynthesizer, SynthesisJob, SynthesisOutcome, SynthesisResult,
};
use crate::timeline::{build_timeline, DurationSource, ResolvedSentence, Sentence, TimedSentence};

// @module: Application controller for narration timing

/// Timeline and audio computed for one step
#[derive(Debug, Clone, PartialEq)]
pub struct StepTimeline {
    pub step_id: String,
    pub sentences: Vec<TimedSentence>,
    pub audio: SceneAudio,
    pub combined_audio_duration_seconds: f64,
    /// Absent when no audio was produced on purpose (estimate-only runs)
    pub consistency: Option<ConsistencyReport>,
}

/// Counters over a processed document (or folder)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: usize,
    pub sentences: usize,
    pub measured: usize,
    pub estimated: usize,
    pub silent: usize,
    pub stitched_steps: usize,
    pub steps_without_audio: usize,
    pub failed_stitches: usize,
    pub drifting_steps: usize,
}

impl RunSummary {
    fn record(&mut self, step: &StepTimeline) {
        self.steps += 1;
        self.sentences += step.sentences.len();
        for sentence in &step.sentences {
            match sentence.duration_source {
                DurationSource::Measured => self.measured += 1,
                DurationSource::Estimated => self.estimated += 1,
                DurationSource::Silent => self.silent += 1,
            }
        }
        match step.audio {
            SceneAudio::File(_) => self.stitched_steps += 1,
            SceneAudio::NoAudio => self.steps_without_audio += 1,
            SceneAudio::Failed(_) => self.failed_stitches += 1,
        }
        if step.consistency.as_ref().is_some_and(|r| !r.within_tolerance) {
            self.drifting_steps += 1;
        }
    }

    /// Add the counters of another run
    pub fn merge(&mut self, other: &RunSummary) {
        self.steps += other.steps;
        self.sentences += other.sentences;
        self.measured += other.measured;
        self.estimated += other.estimated;
        self.silent += other.silent;
        self.stitched_steps += other.stitched_steps;
        self.steps_without_audio += other.steps_without_audio;
        self.failed_stitches += other.failed_stitches;
        self.drifting_steps += other.drifting_steps;
    }
}

/// Audio backends used when synthesizing
#[derive(Clone)]
struct AudioBackends {
    synthesizer: SpeechSynthesizer,
    stitcher: StepAudioStitcher,
}

impl AudioBackends {
    fn in_subdirectory(&self, subdir: &str) -> Self {
        Self {
            synthesizer: self.synthesizer.in_subdirectory(subdir),
            stitcher: self.stitcher.in_subdirectory(subdir),
        }
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: None in estimate-only runs
    backends: Option<AudioBackends>,
}

impl Controller {
    // @method: Create a controller talking to ElevenLabs and ffmpeg
    pub fn with_config(config: Config) -> Result<Self> {
        let provider = ElevenLabs::from_config(&config.tts)
            .context("Failed to create speech provider")?;
        Ok(Self::with_backends(config, Arc::new(provider), Arc::new(FfmpegEngine::new())))
    }

    // @method: Create a controller with explicit provider and audio engine
    pub fn with_backends(
        config: Config,
        provider: Arc<dyn SpeechProvider>,
        engine: Arc<dyn AudioEngine>,
    ) -> Self {
        let synthesizer = SpeechSynthesizer::new(
            provider,
            engine.clone(),
            config.tts.clone(),
            &config.output.sentence_audio_dir,
        );
        let stitcher = StepAudioStitcher::new(engine, &config.output.scene_audio_dir, config.timeline.gap_secs);

        Self {
            config,
            backends: Some(AudioBackends {
                synthesizer,
                stitcher,
            }),
        }
    }

    // @method: Create a controller that only estimates durations
    pub fn estimate_only(config: Config) -> Self {
        Self {
            config,
            backends: None,
        }
    }

    pub fn is_estimate_only(&self) -> bool {
        self.backends.is_none()
    }

    /// Compute timelines and scene audio for every step of a document.
    ///
    /// Audio goes straight into the configured directories. Individual
    /// synthesis or stitching failures never fail the document; only an
    /// unusable document does.
    pub async fn process_document(&self, document: &InputDocument) -> Result<(Vec<StepTimeline>, RunSummary), AppError> {
        self.process_with(document, self.backends.clone()).await
    }

    /// Like [`Controller::process_document`], with the audio of this document
    /// kept in `{dir}/{audio_subdir}` so documents sharing step ids do not
    /// overwrite each other's clips.
    pub async fn process_document_in(
        &self,
        document: &InputDocument,
        audio_subdir: &str,
    ) -> Result<(Vec<StepTimeline>, RunSummary), AppError> {
        let backends = self.backends.as_ref().map(|b| b.in_subdirectory(audio_subdir));
        self.process_with(document, backends).await
    }

    async fn process_with(
        &self,
        document: &InputDocument,
        backends: Option<AudioBackends>,
    ) -> Result<(Vec<StepTimeline>, RunSummary), AppError> {
        Self::check_file_stems(document)?;

        let steps: Vec<(String, Vec<Sentence>)> = document
            .steps
            .iter()
            .map(|step| (step.step_id.clone(), extract_sentences(step)))
            .collect();

        let jobs: Vec<SynthesisJob> = steps
            .iter()
            .flat_map(|(step_id, sentences)| {
                sentences.iter().map(move |sentence| SynthesisJob {
                    step_id: step_id.clone(),
                    sentence: sentence.clone(),
                })
            })
            .collect();

        let mut results = match &backends {
            Some(backends) => self.synthesize_with_progress(&backends.synthesizer, jobs).await,
            None => skipped_results(jobs),
        };

        // Reassemble in sentence order, independent of completion order
        let resolved_steps: Vec<(String, Vec<ResolvedSentence>)> = steps
            .into_iter()
            .map(|(step_id, sentences)| {
                let resolved = sentences
                    .into_iter()
                    .map(|sentence| {
                        let key = SentenceKey::new(step_id.clone(), sentence.index);
                        results
                            .remove(&key)
                            .unwrap_or_else(|| SynthesisResult {
                                step_id: step_id.clone(),
                                sentence,
                                outcome: SynthesisOutcome::Failure {
                                    reason: "no synthesis result".to_string(),
                                },
                            })
                            .resolve(&self.config.timeline)
                    })
                    .collect();
                (step_id, resolved)
            })
            .collect();

        let concurrency = self.config.tts.concurrent_requests.max(1);
        let timelines: Vec<StepTimeline> = stream::iter(resolved_steps)
            .map(|(step_id, resolved)| self.assemble_step(backends.as_ref(), step_id, resolved))
            .buffered(concurrency)
            .collect()
            .await;

        let mut summary = RunSummary::default();
        for step in &timelines {
            summary.record(step);
        }

        Ok((timelines, summary))
    }

    /// Step ids that collapse to the same file name would overwrite each other's audio
    fn check_file_stems(document: &InputDocument) -> Result<(), DocumentError> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for step in &document.steps {
            let stem = FileManager::sanitize_file_stem(&step.step_id);
            if let Some(previous) = seen.insert(stem, &step.step_id) {
                return Err(DocumentError::DuplicateStepId(format!(
                    "'{}' and '{}' map to the same audio file name",
                    previous, step.step_id
                )));
            }
        }
        Ok(())
    }

    async fn synthesize_with_progress(
        &self,
        synthesizer: &SpeechSynthesizer,
        jobs: Vec<SynthesisJob>,
    ) -> HashMap<SentenceKey, SynthesisResult> {
        let progress_bar = ProgressBar::new(jobs.len() as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sentences ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Synthesizing");

        info!(
            "Synthesizing {} sentences with {} model {} ({} at a time)",
            jobs.len(),
            synthesizer.provider_name(),
            self.config.tts.model_id,
            synthesizer.max_concurrent_requests()
        );

        let pb = progress_bar.clone();
        let results = synthesizer
            .synthesize_all(jobs, move |current, _total| pb.set_position(current as u64))
            .await;

        progress_bar.finish_and_clear();
        results
    }

    async fn assemble_step(
        &self,
        backends: Option<&AudioBackends>,
        step_id: String,
        resolved: Vec<ResolvedSentence>,
    ) -> StepTimeline {
        let sentences = build_timeline(&resolved, self.config.timeline.gap_secs);

        match backends {
            Some(backends) => {
                let clips = stitchable_clips(&resolved);
                let stitched = backends.stitcher.stitch(&step_id, &clips).await;
                let report = check_step(
                    &step_id,
                    &sentences,
                    stitched.duration_seconds,
                    self.config.timeline.drift_tolerance_secs,
                );

                StepTimeline {
                    step_id,
                    sentences,
                    audio: stitched.audio,
                    combined_audio_duration_seconds: stitched.duration_seconds,
                    consistency: Some(report),
                }
            }
            None => StepTimeline {
                step_id,
                sentences,
                audio: SceneAudio::NoAudio,
                combined_audio_duration_seconds: 0.0,
                consistency: None,
            },
        }
    }

    /// Process one input document and write its timed counterpart.
    ///
    /// Audio lands in a subdirectory named after the input file. Returns
    /// `None` when the output already exists and `force_overwrite` is not set.
    pub async fn run(&self, input_file: PathBuf, output_file: PathBuf, force_overwrite: bool) -> Result<Option<RunSummary>> {
        let audio_subdir = FileManager::audio_namespace(input_file.file_name().unwrap_or_default());
        self.run_document(input_file, output_file, force_overwrite, &audio_subdir).await
    }

    async fn run_document(
        &self,
        input_file: PathBuf,
        output_file: PathBuf,
        force_overwrite: bool,
        audio_subdir: &str,
    ) -> Result<Option<RunSummary>> {
        if !input_file.exists() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        if output_file.exists() && !force_overwrite {
            warn!("Skipping {:?}, output already exists (use -f to force overwrite)", input_file);
            return Ok(None);
        }

        let start_time = std::time::Instant::now();
        info!("Processing {:?}", input_file);

        let content = FileManager::read_to_string(&input_file)?;
        let document = InputDocument::from_json(&content)
            .with_context(|| format!("Failed to parse input document {:?}", input_file))?;

        let (timelines, summary) = self
            .process_document_in(&document, audio_subdir)
            .await
            .with_context(|| format!("Failed to process {:?}", input_file))?;

        let output = document.to_output(Self::output_steps(&document, timelines));
        let json = serde_json::to_string_pretty(&output)
            .context("Failed to serialize output document")?;
        FileManager::write_to_file(&output_file, &json)?;

        Self::log_summary(&summary);
        info!(
            "Wrote {:?} in {:.1}s",
            output_file,
            start_time.elapsed().as_secs_f64()
        );

        Ok(Some(summary))
    }

    /// Process every input document in a directory
    pub async fn run_folder(&self, input_dir: PathBuf, force_overwrite: bool) -> Result<RunSummary> {
        let documents = FileManager::find_documents(&input_dir)?;
        if documents.is_empty() {
            warn!("No input documents found in {:?}", input_dir);
            return Ok(RunSummary::default());
        }

        info!("Found {} input documents in {:?}", documents.len(), input_dir);

        let audio_subdirs = Self::audio_subdirs(&input_dir, &documents)?;

        let mut total = RunSummary::default();
        let mut failures = 0;
        for (input_file, audio_subdir) in documents.into_iter().zip(audio_subdirs) {
            let output_file = FileManager::generate_output_path(&input_file);
            match self
                .run_document(input_file.clone(), output_file, force_overwrite, &audio_subdir)
                .await
            {
                Ok(Some(summary)) => total.merge(&summary),
                Ok(None) => {}
                Err(e) => {
                    failures += 1;
                    error!("Error processing {:?}: {:#}", input_file, e);
                }
            }
        }

        if failures > 0 {
            warn!("{} documents could not be processed", failures);
        }
        Ok(total)
    }

    /// One audio subdirectory per document, from its path below `input_dir`
    fn audio_subdirs(input_dir: &Path, documents: &[PathBuf]) -> Result<Vec<String>> {
        let mut seen: HashMap<String, &PathBuf> = HashMap::new();
        let mut subdirs = Vec::with_capacity(documents.len());
        for document in documents {
            let relative = document.strip_prefix(input_dir).unwrap_or(document);
            let subdir = FileManager::audio_namespace(relative);
            if let Some(previous) = seen.insert(subdir.clone(), document) {
                return Err(anyhow!(
                    "{:?} and {:?} would share the audio directory '{}'",
                    previous, document, subdir
                ));
            }
            subdirs.push(subdir);
        }
        Ok(subdirs)
    }

    fn output_steps(document: &InputDocument, timelines: Vec<StepTimeline>) -> Vec<OutputStep> {
        document
            .steps
            .iter()
            .zip(timelines)
            .map(|(input, timeline)| OutputStep {
                step_id: timeline.step_id,
                audio_file_scene: timeline.audio.to_output_string(),
                duration_scene_seconds: timeline.combined_audio_duration_seconds,
                sentences: timeline.sentences,
                consistency: timeline.consistency,
                extra: input.extra.clone(),
            })
            .collect()
    }

    fn log_summary(summary: &RunSummary) {
        info!(
            "{} steps, {} sentences: {} measured, {} estimated, {} silent",
            summary.steps, summary.sentences, summary.measured, summary.estimated, summary.silent
        );
        if summary.failed_stitches > 0 {
            warn!("{} steps could not be stitched", summary.failed_stitches);
        }
        if summary.drifting_steps > 0 {
            warn!(
                "{} steps drift from their stitched audio (expected when sentences fell back to estimates)",
                summary.drifting_steps
            );
        }
    }
}

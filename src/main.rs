// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::fs::File;
use std::io::BufReader;
use std::io::Write;
use std::path::{Path, PathBuf};

use narrasync::app_config::{self, Config};
use narrasync::file_utils::FileManager;
use narrasync::Controller;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize narration and build timelines (default command)
    Sync(SyncArgs),

    /// Generate shell completions for narrasync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug, Clone)]
struct SyncArgs {
    /// Input document or directory of documents
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output document (single input file only)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output documents
    #[arg(short, long)]
    force_overwrite: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Maximum number of synthesis requests in flight
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Gap between sentences, in seconds
    #[arg(long)]
    gap: Option<f64>,

    /// Voice identifier
    #[arg(long)]
    voice_id: Option<String>,

    /// Model identifier
    #[arg(long)]
    model_id: Option<String>,

    /// API key for the speech service
    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Only estimate durations; no speech is synthesized and no audio written
    #[arg(short, long)]
    estimate_only: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// narrasync - narration timing for step-by-step explanations
///
/// Synthesizes every sentence of a step-by-step explanation, builds a
/// step-local timeline and stitches each step into one audio file.
#[derive(Parser, Debug)]
#[command(name = "narrasync")]
#[command(version)]
#[command(about = "Narration timing for step-by-step explanations")]
#[command(long_about = "narrasync synthesizes the sentences of each step, times them and stitches one audio file per step.

EXAMPLES:
    narrasync proof.json                       # Process one document
    narrasync -f proof.json -o out.json        # Overwrite a chosen output file
    narrasync -e proof.json                    # Estimate durations without calling the API
    narrasync -j 2 --gap 0.2 problems/         # Process a directory of documents
    narrasync completions bash > narrasync.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file does
    not exist, a default one is created. The API key may also come from the
    ELEVENLABS_API_KEY environment variable.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input document or directory of documents
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output document (single input file only)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output documents
    #[arg(short, long)]
    force_overwrite: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Maximum number of synthesis requests in flight
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Gap between sentences, in seconds
    #[arg(long)]
    gap: Option<f64>,

    /// Voice identifier
    #[arg(long)]
    voice_id: Option<String>,

    /// Model identifier
    #[arg(long)]
    model_id: Option<String>,

    /// API key for the speech service
    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Only estimate durations; no speech is synthesized and no audio written
    #[arg(short, long)]
    estimate_only: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // The global max level is adjusted after the config is loaded
        metadata.level() <= self.level.max(log::max_level())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "narrasync", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Sync(args)) => run_sync(args).await,
        None => {
            // Default behavior - use top-level args
            let input_path = cli.input_path.ok_or_else(|| {
                anyhow!("INPUT_PATH is required when no subcommand is specified")
            })?;

            let sync_args = SyncArgs {
                input_path,
                output: cli.output,
                force_overwrite: cli.force_overwrite,
                config_path: cli.config_path,
                concurrency: cli.concurrency,
                gap: cli.gap,
                voice_id: cli.voice_id,
                model_id: cli.model_id,
                api_key: cli.api_key,
                estimate_only: cli.estimate_only,
                log_level: cli.log_level,
            };
            run_sync(sync_args).await
        }
    }
}

/// Load the configuration, creating a default file if none exists
fn load_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;
        Ok(config)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        Ok(config)
    }
}

/// Apply command line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, options: &SyncArgs) {
    if let Some(concurrency) = options.concurrency {
        config.tts.concurrent_requests = concurrency;
    }
    if let Some(gap) = options.gap {
        config.timeline.gap_secs = gap;
    }
    if let Some(voice_id) = &options.voice_id {
        config.tts.voice_id = voice_id.clone();
    }
    if let Some(model_id) = &options.model_id {
        config.tts.model_id = model_id.clone();
    }
    if let Some(api_key) = &options.api_key {
        if !api_key.is_empty() {
            config.tts.api_key = api_key.clone();
        }
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_sync(options: SyncArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = load_config(&options.config_path)?;
    apply_overrides(&mut config, &options);

    config.validate(!options.estimate_only)
        .context("Configuration validation failed")?;

    // Just update the max level without reinitializing the logger
    log::set_max_level(config.log_level.to_level_filter());

    let controller = if options.estimate_only {
        info!("Estimate-only run: no speech will be synthesized");
        Controller::estimate_only(config)
    } else {
        Controller::with_config(config)?
    };

    if options.input_path.is_file() {
        let output = options
            .output
            .clone()
            .unwrap_or_else(|| FileManager::generate_output_path(&options.input_path));
        controller
            .run(options.input_path.clone(), output, options.force_overwrite)
            .await?;
    } else if options.input_path.is_dir() {
        if options.output.is_some() {
            return Err(anyhow!("--output can only be used with a single input file"));
        }
        let summary = controller
            .run_folder(options.input_path.clone(), options.force_overwrite)
            .await?;
        info!(
            "Finished: {} steps, {} sentences ({} estimated)",
            summary.steps, summary.sentences, summary.estimated
        );
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    Ok(())
}

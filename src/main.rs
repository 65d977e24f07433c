// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
// Add other lints specific to this module that you want to allow but not auto-fix

use anyhow::{Result, anyhow, Context};
use log::{info, warn, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use textfix::app_config::{self, Config, CorrectionProvider};
use textfix::app_controller::Controller;

/// CLI Wrapper for CorrectionProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliCorrectionProvider {
    Ollama,
    Anthropic,
}

impl From<CliCorrectionProvider> for CorrectionProvider {
    fn from(cli_provider: CliCorrectionProvider) -> Self {
        match cli_provider {
            CliCorrectionProvider::Ollama => CorrectionProvider::Ollama,
            CliCorrectionProvider::Anthropic => CorrectionProvider::Anthropic,
        }
    }
}

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
    /// Generate shell completions for textfix
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// textfix - spelling and accent correction for long documents
///
/// Splits a text file into overlapping chunks, has an LLM correct each one
/// and stitches the results back into a single document.
#[derive(Parser, Debug)]
#[command(name = "textfix")]
#[command(version)]
#[command(about = "LLM-assisted spelling and accent correction for long text files")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "textfix corrects spelling, accents and basic formatting in long text files.
The text is split at sentence boundaries into overlapping chunks that fit the model's
context; the repeated overlap is matched and removed when the corrected chunks are joined.

EXAMPLES:
    textfix book.txt book.fixed.txt                 # Correct using default config
    textfix -l it book.txt book.txt                 # Correct in place, Italian hint
    textfix -p anthropic -m claude-3-5-haiku-latest in.txt out.txt
    textfix --chunk-chars 800 --output-fraction 0.8 in.txt out.txt
    textfix completions bash > textfix.bash         # Generate bash completions

CONFIGURATION:
    Configuration is stored in textfix.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically. Command line options override the file.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default model: gemma3n)
    anthropic - Anthropic API (requires API key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Text file to correct
    #[arg(value_name = "INPUT_FILE")]
    input_file: Option<PathBuf>,

    /// Where to write the corrected text (may be the input file)
    #[arg(value_name = "OUTPUT_FILE")]
    output_file: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "textfix.json")]
    config: PathBuf,

    /// Correction provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliCorrectionProvider>,

    /// Model name to use for correction
    #[arg(short, long)]
    model: Option<String>,

    /// Document language code (e.g., 'it', 'en', 'fra')
    #[arg(short, long)]
    language: Option<String>,

    /// Maximum characters per chunk, overlap included
    #[arg(long)]
    chunk_chars: Option<usize>,

    /// Share of each chunk that is new output (0 < f <= 1)
    #[arg(long)]
    output_fraction: Option<f64>,

    /// Largest accepted overlap dissimilarity (0 <= t <= 1)
    #[arg(long)]
    mismatch_threshold: Option<f64>,

    /// Set logging level
    #[arg(long, value_enum)]
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
        // The logger itself accepts everything; log::max_level does the filtering
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
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

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    // Handle subcommands
    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "textfix", &mut std::io::stdout());
        return Ok(());
    }

    run_correct(cli).await
}

async fn run_correct(options: CommandLineOptions) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(config_log_level.to_level_filter());
    }

    let (input_file, output_file) = match (&options.input_file, &options.output_file) {
        (Some(input), Some(output)) => (input.clone(), output.clone()),
        _ => return Err(anyhow!("INPUT_FILE and OUTPUT_FILE are required")),
    };

    // Load or create configuration
    if !options.config.exists() {
        warn!("Config file not found at '{}', creating default config.", options.config.display());
    }
    let mut config = Config::load_or_create(&options.config)?;
    apply_overrides(&mut config, &options);

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    // Create controller; validates the configuration after overrides
    let controller = Controller::with_config(config)
        .context("Configuration validation failed")?;
    let cancellation = controller.cancellation();

    tokio::select! {
        result = controller.run(&input_file, &output_file) => {
            let report = result?;
            if report.has_issues() {
                info!("Done with {} low-confidence join(s)", report.issues.len());
            }
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            cancellation.cancel();
            Err(anyhow!("Interrupted, no output written"))
        }
    }
}

/// Override config values with the ones given on the command line
fn apply_overrides(config: &mut Config, options: &CommandLineOptions) {
    if let Some(provider) = &options.provider {
        config.correction.provider = provider.clone().into();
    }

    if let Some(model) = &options.model {
        config.correction.active_provider_config_mut().model = model.clone();
    }

    if let Some(language) = &options.language {
        config.language = Some(language.clone());
    }

    if let Some(chunk_chars) = options.chunk_chars {
        config.chunking.chunk_char_limit = chunk_chars;
    }

    if let Some(output_fraction) = options.output_fraction {
        config.chunking.output_fraction = output_fraction;
    }

    if let Some(mismatch_threshold) = options.mismatch_threshold {
        config.chunking.mismatch_threshold = mismatch_threshold;
    }

    // Update log level in config if specified via command line
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

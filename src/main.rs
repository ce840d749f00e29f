// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use doctrans::app_config::{self, BackendKind, Config};
use doctrans::app_controller::{Controller, JobRequest, RunStatus};
use doctrans::file_utils::FileManager;

/// CLI Wrapper for BackendKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliBackend {
    /// OpenAI-compatible chat completions (Ollama /v1, LM Studio, vLLM)
    #[value(name = "openai")]
    OpenAI,
    /// Native Ollama chat API
    Ollama,
}

impl From<CliBackend> for BackendKind {
    fn from(cli_backend: CliBackend) -> Self {
        match cli_backend {
            CliBackend::OpenAI => BackendKind::OpenAI,
            CliBackend::Ollama => BackendKind::Ollama,
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
    /// Translate a text file (default command)
    Translate(TranslateArgs),

    /// Check that the configured backend is reachable
    Check(CommonArgs),

    /// Generate shell completions for doctrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by every command that talks to the backend
#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Backend protocol to use
    #[arg(short, long, value_enum)]
    backend: Option<CliBackend>,

    /// Backend base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// UTF-8 text file to translate
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Background about the document given to the model with every chunk
    #[arg(long)]
    context: Option<String>,

    /// Output file ('-' for stdout); defaults to <stem>.<lang>.txt next to the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target language code (e.g., 'ja', 'fr', 'de')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Ignore and overwrite any saved progress instead of resuming
    #[arg(long)]
    fresh: bool,

    /// Give up on a chunk after this many too-slow answers
    #[arg(long)]
    max_soft_timeouts: Option<u32>,

    /// Maximum chunk length in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared between consecutive chunks
    #[arg(long)]
    overlap: Option<usize>,

    /// File holding a custom task prompt (must contain {text})
    #[arg(long)]
    prompt_file: Option<PathBuf>,

    /// Progress file location
    #[arg(long)]
    progress_file: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    #[command(flatten)]
    common: CommonArgs,
}

/// doctrans - chunked document translation with local LLMs
///
/// Splits a long text into overlapping chunks, translates them one by one
/// through an LLM backend and reassembles the result. Progress is saved after
/// every chunk so an interrupted run resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "doctrans")]
#[command(version)]
#[command(about = "Chunked, resumable document translation with LLMs")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "doctrans translates long plain-text documents with an LLM, one chunk at a time.

EXAMPLES:
    doctrans novel.txt --context \"A 1920s detective novel\"      # Translate to Japanese (default)
    doctrans -t fr -o out.txt manual.txt --context \"User manual\"  # Translate to French
    doctrans --fresh novel.txt --context \"...\"                    # Discard saved progress
    doctrans -b ollama -m gemma3 novel.txt --context \"...\"        # Use the native Ollama API
    doctrans check                                               # Test the backend connection
    doctrans completions bash > doctrans.bash                    # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

RESUME:
    Progress is kept in progress.json. Rerunning the same command after an
    interruption skips the chunks already translated.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
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

    // @returns: Symbol and ANSI color for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌", "1;31"),
            Level::Warn => ("⚠️ ", "1;33"),
            Level::Info => ("  ", "1;32"),
            Level::Debug => ("🔍", "1;36"),
            Level::Trace => ("📋", "1;35"),
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
            let (symbol, color) = Self::decoration(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, symbol, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();

    let result = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "doctrans", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Check(common)) => run_check(common).await,
        Some(Commands::Translate(args)) => run_translate(args).await,
        // Default behavior - use top-level args
        None => run_translate(cli.translate).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Apply a log level chosen on the command line or in the config
fn apply_log_level(level: &app_config::LogLevel) {
    log::set_max_level(level.to_level_filter());
}

/// Load the configuration file, creating a default one if missing
fn load_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        let config: Config =
            serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?;
        Ok(config)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        Ok(config)
    }
}

/// Override config values with backend options from the command line
fn apply_common_args(config: &mut Config, args: &CommonArgs) {
    if let Some(backend) = &args.backend {
        let backend: BackendKind = backend.clone().into();
        // A backend switch invalidates an endpoint configured for the other protocol
        if backend != config.translation.backend && args.endpoint.is_none() {
            config.translation.endpoint.clear();
        }
        config.translation.backend = backend;
    }

    if let Some(endpoint) = &args.endpoint {
        config.translation.endpoint = endpoint.clone();
    }

    if let Some(model) = &args.model {
        config.translation.model = model.clone();
    }

    if let Some(log_level) = &args.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_check(args: CommonArgs) -> Result<()> {
    if let Some(level) = &args.log_level {
        apply_log_level(&level.clone().into());
    }

    let mut config = load_config(&args.config_path)?;
    apply_common_args(&mut config, &args);
    config.validate().context("Configuration validation failed")?;
    apply_log_level(&config.log_level);

    Controller::with_config(config)?.check_backend().await
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(level) = &options.common.log_level {
        apply_log_level(&level.clone().into());
    }

    let input_path = options
        .input_path
        .clone()
        .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

    let context = options
        .context
        .clone()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| anyhow!("--context is required and must not be blank"))?;

    let mut config = load_config(&options.common.config_path)?;
    apply_common_args(&mut config, &options.common);

    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }

    if let Some(chunk_size) = options.chunk_size {
        config.chunking.chunk_size = chunk_size;
    }

    if let Some(overlap) = options.overlap {
        config.chunking.overlap = overlap;
    }

    if let Some(max) = options.max_soft_timeouts {
        config.translation.max_soft_timeouts = Some(max);
    }

    if let Some(progress_file) = &options.progress_file {
        config.progress.path = progress_file.clone();
    }

    if let Some(prompt_file) = &options.prompt_file {
        config.translation.task_prompt = FileManager::read_to_string(prompt_file)?;
    }

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.common.log_level.is_none() {
        apply_log_level(&config.log_level);
    }

    let controller = Controller::with_config(config)?;
    let request = JobRequest {
        input: input_path,
        output: options.output.clone(),
        context,
        resume: !options.fresh,
        force_overwrite: options.force_overwrite,
    };

    match controller.run(request).await? {
        RunStatus::Translated { outcome, .. } if outcome.failed > 0 => {
            warn!(
                "{} of {} chunk(s) could not be translated and hold '{}'",
                outcome.failed,
                outcome.total_chunks,
                controller.config().translation.error_sentinel
            );
        }
        _ => {}
    }

    Ok(())
}

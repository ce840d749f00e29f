use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::progress_display::ProgressBarObserver;
use crate::providers::Provider;
use crate::translation::observer::{EventRecorder, LogEntry, LogObserver, ObserverSet, TranslationObserver};
use crate::translation::{BatchOutcome, BatchTranslator, TranslationService};

// @module: Application controller for document translation

/// File name of the issues log written next to the output
pub const ISSUES_LOG_FILE: &str = "doctrans.issues.log";

/// One document translation requested by the user
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// UTF-8 plain-text input file
    pub input: PathBuf,
    /// Output file; `-` for stdout, `None` for `<stem>.<lang>.txt` next to the input
    pub output: Option<PathBuf>,
    /// Background given to the model with every chunk
    pub context: String,
    /// Reuse chunks recorded in the progress file
    pub resume: bool,
    /// Replace an existing output file
    pub force_overwrite: bool,
}

/// Where the translated document goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

/// Result of a controller run
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// The document was translated and written
    Translated {
        output: OutputTarget,
        outcome: BatchOutcome,
    },
    /// The output already existed and overwriting was not requested
    Skipped { output: PathBuf },
}

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Draw a progress bar instead of per-chunk log lines
    show_progress: bool,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Ok(Self::with_config(Config::default())?.with_progress_bar(false))
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            show_progress: std::io::stderr().is_terminal(),
        })
    }

    /// Enable or disable the terminal progress bar
    pub fn with_progress_bar(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve where the translation of `request` is written
    pub fn output_target(&self, request: &JobRequest) -> OutputTarget {
        match &request.output {
            Some(path) if path.as_os_str() == "-" => OutputTarget::Stdout,
            Some(path) => OutputTarget::File(path.clone()),
            None => {
                let dir = request.input.parent().unwrap_or(Path::new(""));
                OutputTarget::File(FileManager::generate_output_path(
                    &request.input,
                    dir,
                    &self.config.target_language,
                    "txt",
                ))
            }
        }
    }

    /// Translate one document with the configured backend
    pub async fn run(&self, request: JobRequest) -> Result<RunStatus> {
        let translator = BatchTranslator::from_config(&self.config)?;
        self.run_with_translator(request, translator).await
    }

    /// Translate one document through the given provider
    pub async fn run_with_provider(&self, request: JobRequest, provider: Box<dyn Provider>) -> Result<RunStatus> {
        let target_language = language_utils::get_language_name(&self.config.target_language)?;
        let service = TranslationService::with_provider(provider, &self.config.translation, target_language);
        let translator = BatchTranslator::with_service(&self.config, service)?;
        self.run_with_translator(request, translator).await
    }

    async fn run_with_translator(&self, request: JobRequest, translator: BatchTranslator) -> Result<RunStatus> {
        let start_time = Instant::now();

        if request.context.trim().is_empty() {
            return Err(anyhow!("A translation context is required (--context)"));
        }

        if !FileManager::file_exists(&request.input) {
            return Err(anyhow!("Input file does not exist: {:?}", request.input));
        }

        let output = self.output_target(&request);
        if let OutputTarget::File(path) = &output {
            if path.exists() && !request.force_overwrite {
                warn!("Skipping {:?}, translation already exists (use -f to force overwrite)", path);
                return Ok(RunStatus::Skipped { output: path.clone() });
            }
        }

        let text = FileManager::read_to_string(&request.input)?;

        let recorder = Arc::new(EventRecorder::new());
        let display: Arc<dyn TranslationObserver> = if self.show_progress {
            Arc::new(ProgressBarObserver::new())
        } else {
            Arc::new(LogObserver)
        };
        let observers = ObserverSet::new().with(display).with(recorder.clone());
        let translator = translator.with_observer(Arc::new(observers));

        info!(
            "doctrans: {} - {} → {}",
            self.config.translation.backend.display_name(),
            self.config.translation.model,
            language_utils::describe_language(&self.config.target_language)?
        );
        debug!(
            "Input {:?}: {} characters, progress file {:?}",
            request.input,
            text.chars().count(),
            translator.store().path()
        );

        let outcome = translator
            .translate_document(&text, &request.context, request.resume)
            .await
            .context("Translation failed")?;

        match &output {
            OutputTarget::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(outcome.text.as_bytes())?;
                stdout.write_all(b"\n")?;
                stdout.flush()?;
            }
            OutputTarget::File(path) => FileManager::write_to_file(path, &outcome.text)?,
        }

        // Finished chunks stay on disk until the output is committed
        translator.clear_progress(&outcome)?;

        let issues = recorder.issues();
        if !issues.is_empty() {
            let log_path = self.issues_log_path(&output);
            self.write_logs_to_file(&issues, &log_path, &request.context)?;
            warn!(
                "{} issue(s) during translation ({} chunk(s) failed), see {:?}",
                issues.len(),
                outcome.failed,
                log_path
            );
        }

        debug!("{}", translator.service().usage().summary());

        match &output {
            OutputTarget::Stdout => info!("Translation complete in {}", Self::format_duration(start_time.elapsed())),
            OutputTarget::File(path) => info!(
                "Translation complete: {:?} in {}",
                path,
                Self::format_duration(start_time.elapsed())
            ),
        }

        Ok(RunStatus::Translated { output, outcome })
    }

    /// Check that the configured backend is reachable
    pub async fn check_backend(&self) -> Result<()> {
        let target_language = language_utils::get_language_name(&self.config.target_language)?;
        let service = TranslationService::new(&self.config.translation, target_language)?;

        info!(
            "Checking {} at {} (model {})",
            self.config.translation.backend.display_name(),
            self.config.translation.get_endpoint(),
            self.config.translation.model
        );

        service
            .test_connection()
            .await
            .with_context(|| format!("Cannot reach backend at {}", self.config.translation.get_endpoint()))?;

        info!("Backend is reachable");
        Ok(())
    }

    fn issues_log_path(&self, output: &OutputTarget) -> PathBuf {
        match output {
            OutputTarget::File(path) => path.parent().unwrap_or(Path::new("")).join(ISSUES_LOG_FILE),
            OutputTarget::Stdout => PathBuf::from(ISSUES_LOG_FILE),
        }
    }

    /// Append captured issues to the issues log
    fn write_logs_to_file(&self, logs: &[LogEntry], path: &Path, translation_context: &str) -> Result<()> {
        let mut log_content = String::new();
        log_content.push_str(&format!("Context: {}\n", translation_context.trim()));

        for entry in logs {
            log_content.push_str(&format!("[{}] {}\n", entry.level, entry.message));
        }

        FileManager::append_to_log_file(path, &log_content)
    }

    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

use anyhow::{Result, Context, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

use crate::app_config::Config;
use crate::correction::{
    CancellationFlag, CorrectionPipeline, CorrectionService, Corrector, PipelineEvent,
    PipelineOptions, PipelineReport, ReconciliationIssue,
};
use crate::file_utils::FileManager;

// @module: Application controller for file correction

/// Main application controller for document correction
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Stops the running pipeline between chunks
    cancellation: CancellationFlag,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        Ok(Self {
            config,
            cancellation: CancellationFlag::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flag that aborts the current run when set (e.g. on Ctrl-C)
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Run the main workflow with the configured correction provider
    pub async fn run(&self, input_file: &Path, output_file: &Path) -> Result<PipelineReport> {
        let service = CorrectionService::new(&self.config.correction, self.config.language.as_deref())?;

        if let Err(e) = service.test_connection().await {
            warn!(
                "Could not reach {} at {}: {}",
                self.config.correction.provider.display_name(),
                self.config.correction.get_endpoint(),
                e
            );
        }

        // Log that we're starting with provider and model info
        info!("🚀 textfix: {} - {}",
            self.config.correction.provider.display_name(),
            service.model());

        self.run_with_corrector(input_file, output_file, Arc::new(service)).await
    }

    /// Run the workflow with any corrector
    ///
    /// Nothing is written unless every chunk was corrected; the output file
    /// is replaced atomically, so the input may also be the output.
    pub async fn run_with_corrector(
        &self,
        input_file: &Path,
        output_file: &Path,
        corrector: Arc<dyn Corrector>,
    ) -> Result<PipelineReport> {
        // Check if the input file exists
        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let document = FileManager::read_to_string(input_file)?;
        let pipeline = CorrectionPipeline::new(corrector, PipelineOptions::from_config(&self.config))?
            .with_cancellation(self.cancellation.clone());

        // Create a progress bar for chunk tracking
        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Correcting");

        let pb = progress_bar.clone();
        let result = pipeline
            .run(&document, move |event| match event {
                PipelineEvent::Planned { chunks, .. } => pb.set_length(*chunks as u64),
                PipelineEvent::ChunkStarted { index, total } => {
                    pb.set_message(format!("Chunk {}/{}", index + 1, total));
                }
                PipelineEvent::ChunkRetry { attempt, .. } => {
                    pb.set_message(format!("Retrying ({})", attempt));
                }
                PipelineEvent::ChunkCompleted { index, .. } => pb.set_position(*index as u64 + 1),
                PipelineEvent::LowConfidence(_) | PipelineEvent::Finished { .. } => {}
            })
            .await;

        // Finish and clear the progress bar so log lines stay readable
        progress_bar.finish_and_clear();

        let report = result.context("Correction failed, no output written")?;

        FileManager::write_atomic(output_file, &report.output)?;

        let log_file_path = FileManager::issues_log_path(output_file);
        if report.has_issues() {
            let context = format!("{} - {} ({})",
                self.config.correction.provider.display_name(),
                self.config.correction.get_model(),
                input_file.display());

            warn!("{} chunk(s) could not be matched with confidence; check the output near them", report.issues.len());
            if let Err(e) = self.write_issues_to_file(&report.issues, &log_file_path, &context) {
                warn!("Failed to write issues to file: {}", e);
            } else {
                info!("Issues written to {}", log_file_path.display());
            }
        } else if log_file_path.exists() {
            // A stale log from an earlier run would describe other text
            if let Err(e) = std::fs::remove_file(&log_file_path) {
                warn!("Failed to remove old issues log {}: {}", log_file_path.display(), e);
            }
        }

        info!("Success: {} ({} chunk(s), {} retries, {} regeneration(s), {})",
            output_file.display(),
            report.chunk_count,
            report.retries,
            report.regenerations,
            Self::format_duration(report.elapsed));

        Ok(report)
    }

    // Format duration in a human-readable format (HH:MM:SS)
    pub fn format_duration(duration: std::time::Duration) -> String {
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

    /// Write low-confidence reconciliations to a log file
    fn write_issues_to_file(&self, issues: &[ReconciliationIssue], file_path: &Path, context: &str) -> Result<()> {
        let mut log_content = String::new();

        // Add header
        log_content.push_str(&format!("Correction Issues - {}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
        log_content.push_str(&format!("Context: {}\n\n", context));

        // Add each issue
        for issue in issues {
            log_content.push_str(&format!("[WARN] {}\n", issue));
        }

        // Write to file
        FileManager::write_to_file(file_path, &log_content)?;

        Ok(())
    }
}

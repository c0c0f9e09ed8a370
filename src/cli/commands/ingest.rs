//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::ErrorCategory;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(input: &str, force: bool, settings: Settings) -> Result<()> {
    preflight::check(Operation::Ingest)?;

    let orchestrator = Orchestrator::new(settings)?;

    Output::info(&format!("Ingesting {}", input));

    match orchestrator.ingest(input, force).await {
        Ok(report) if report.skipped => {
            Output::info(&format!(
                "'{}' is already ingested ({} chunks). Use --force to re-process.",
                report.title, report.chunks_persisted
            ));
            Ok(())
        }
        Ok(report) => {
            if report.is_partial() {
                Output::warning(&format!(
                    "Ingested '{}' with degraded coverage: {}/{} chunks embedded",
                    report.title, report.chunks_persisted, report.chunks_total
                ));
            } else {
                Output::success(&format!(
                    "Ingested '{}' ({} chunks, via {})",
                    report.title, report.chunks_persisted, report.source
                ));
            }
            Ok(())
        }
        Err(e) => {
            // Source-by-source detail lives in the logs; users get a
            // category with actionable guidance.
            match e.category() {
                ErrorCategory::Download => {
                    Output::error(&format!("{}", e));
                    Output::info("Check that yt-dlp is installed, or enable the hosted transcript API.");
                }
                ErrorCategory::Transcription => {
                    Output::error(&format!("{}", e));
                    Output::info("This video may have no captions in the configured languages.");
                }
                ErrorCategory::RateLimit => {
                    Output::error(&format!("{}", e));
                    Output::info("The embedding provider is throttling; try again later or lower embedding.requests_per_minute.");
                }
                ErrorCategory::Generic => {
                    Output::error(&format!("{}", e));
                }
            }
            Err(e.into())
        }
    }
}

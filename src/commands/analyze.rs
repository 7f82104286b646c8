use anyhow::Result;
use clap::Args;
use std::path::Path;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::analyzer::{self, AnalyzeError};
use crate::output::{emit, Envelope};

#[derive(Args, Debug, Clone, Default)]
pub struct AnalyzeCommand {
    /// File to analyze, relative to the shared directory or under it
    #[arg(long = "input_file", alias = "input-file", value_name = "PATH")]
    pub input_file: Option<String>,
}

impl AnalyzeCommand {
    /// Analyze the input file and describe the outcome as an envelope
    pub fn run(&self, shared_dir: &Path) -> Envelope {
        let Some(input) = self.input_file.as_deref().filter(|i| !i.trim().is_empty()) else {
            return Envelope::error("No input file provided");
        };

        match analyzer::analyze_file(shared_dir, input) {
            Ok(report) => {
                info!(
                    "Analyzed {file}: {words} words, {lines} lines",
                    file = report.input_file,
                    words = report.analysis.word_count,
                    lines = report.analysis.line_count
                );
                Envelope::success("File analyzed successfully")
                    .with_field("input_file", report.input_file)
                    .with_field("content_length", report.content_length)
                    .with_field("content_preview", report.content_preview)
                    .with_field(
                        "analysis",
                        serde_json::json!({
                            "word_count": report.analysis.word_count,
                            "line_count": report.analysis.line_count,
                            "has_numbers": report.analysis.has_numbers,
                        }),
                    )
            }
            Err(err) => {
                warn!("{err}");
                let envelope = Envelope::error(err.to_string());
                match err {
                    AnalyzeError::NotFound {
                        available_files, ..
                    } => envelope.with_field("available_files", available_files),
                    _ => envelope,
                }
            }
        }
    }

    pub fn execute(self, shared_dir: &Path) -> Result<ExitCode> {
        emit(&self.run(shared_dir), true)?;
        Ok(ExitCode::SUCCESS)
    }
}

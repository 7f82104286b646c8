use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Number of characters kept in `content_preview`
pub const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Input file {input_file} not found in {shared_dir}/")]
    NotFound {
        input_file: String,
        shared_dir: String,
        available_files: Vec<String>,
    },

    #[error("Input file {input_file} must stay inside the shared directory")]
    OutsideSharedDir { input_file: String },

    #[error("Error processing file: {0}")]
    Read(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub word_count: usize,
    pub line_count: usize,
    pub has_numbers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Path as displayed, relative to the shared directory
    pub input_file: String,
    /// Length in characters
    pub content_length: usize,
    pub content_preview: String,
    pub analysis: FileAnalysis,
}

pub fn analyze_content(content: &str) -> FileAnalysis {
    FileAnalysis {
        word_count: content.split_whitespace().count(),
        line_count: content.lines().count(),
        has_numbers: content.chars().any(char::is_numeric),
    }
}

/// First `PREVIEW_CHARS` characters, with `...` appended when the content is longer
pub fn content_preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Resolve `input` against the shared directory.
///
/// Returns the path to read and the name to display. A path already under
/// the shared directory is used as is; anything else is taken relative to it.
pub fn resolve_input_path(
    shared_dir: &Path,
    input: &str,
) -> Result<(PathBuf, String), AnalyzeError> {
    let relative = match Path::new(input).strip_prefix(shared_dir) {
        Ok(stripped) => stripped.to_path_buf(),
        Err(_) => PathBuf::from(input.trim_start_matches('/')),
    };

    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || relative.as_os_str().is_empty() {
        return Err(AnalyzeError::OutsideSharedDir {
            input_file: input.to_string(),
        });
    }

    let display = relative.to_string_lossy().into_owned();
    Ok((shared_dir.join(relative), display))
}

/// Sorted entry names of the shared directory, empty when it does not exist
pub fn list_available_files(shared_dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(shared_dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Read and analyze a file from the shared directory
pub fn analyze_file(shared_dir: &Path, input: &str) -> Result<AnalysisReport, AnalyzeError> {
    let (path, input_file) = resolve_input_path(shared_dir, input)?;
    debug!("Analyzing {path}", path = path.display());

    if !path.is_file() {
        return Err(AnalyzeError::NotFound {
            input_file,
            shared_dir: shared_dir.display().to_string(),
            available_files: list_available_files(shared_dir),
        });
    }

    let bytes = fs::read(&path)?;
    let content = String::from_utf8_lossy(&bytes);

    Ok(AnalysisReport {
        input_file,
        content_length: content.chars().count(),
        content_preview: content_preview(&content),
        analysis: analyze_content(&content),
    })
}

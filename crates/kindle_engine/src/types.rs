use std::path::PathBuf;

/// Scratch files owned by one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedJob {
    pub safe_file_name: String,
    pub source_path: PathBuf,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversionOutcome {
    pub output_exists: bool,
    /// Converter stdout with blank lines and benign warnings removed, in order.
    pub diagnostics: Vec<String>,
}

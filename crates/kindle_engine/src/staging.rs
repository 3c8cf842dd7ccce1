use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_warn};
use thiserror::Error;

use crate::filename::sanitize_file_name;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::StagedJob;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("cannot stage source file: {0}")]
    Persist(#[from] PersistError),
}

/// Scratch-file lifecycle for conversion jobs.
///
/// Paths derive from the sanitized title alone, so two runs with the same
/// title share files.
#[derive(Debug, Clone)]
pub struct StagingArea {
    scratch_dir: PathBuf,
    output_extension: String,
}

impl StagingArea {
    pub fn new(scratch_dir: impl Into<PathBuf>, output_extension: impl Into<String>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            output_extension: output_extension.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Paths for a title, without touching the filesystem.
    pub fn job_for(&self, title: &str) -> StagedJob {
        let safe_file_name = sanitize_file_name(title);
        let source_path = self.scratch_dir.join(format!("{safe_file_name}.html"));
        let output_path = self
            .scratch_dir
            .join(format!("{safe_file_name}.{}", self.output_extension));
        StagedJob {
            safe_file_name,
            source_path,
            output_path,
        }
    }

    /// Writes `html` verbatim as the job's source file, replacing any previous one.
    pub fn stage(&self, title: &str, html: &str) -> Result<StagedJob, StagingError> {
        let job = self.job_for(title);
        let writer = AtomicFileWriter::new(self.scratch_dir.clone());
        writer.write(&format!("{}.html", job.safe_file_name), html)?;
        engine_debug!("Staged {} bytes at {:?}", html.len(), job.source_path);
        Ok(job)
    }

    /// Best-effort removal of the source and output files. Never fails.
    pub fn cleanup(&self, job: &StagedJob) {
        remove_quietly(&job.source_path);
        remove_quietly(&job.output_path);
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => engine_debug!("Removed {:?}", path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => engine_warn!("Failed to remove {:?}: {}", path, err),
    }
}

use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use engine_logging::{engine_debug, engine_info, engine_warn};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStdout, Command};

use crate::config::ConverterSettings;
use crate::{ConversionOutcome, StagedJob};

/// Known-harmless converter warning, dropped from diagnostics.
pub const BENIGN_WARNING: &str = "Hyperlink not resolved:";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("not html file: staged source {0:?} is missing")]
    MissingSource(PathBuf),
    #[error("cannot start converter {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("converter io error: {0}")]
    Io(#[from] io::Error),
}

/// Turns a staged HTML file into an e-reader package beside it.
#[async_trait::async_trait]
pub trait PackageConverter: Send + Sync {
    async fn convert(&self, job: &StagedJob) -> Result<ConversionOutcome, ConvertError>;
}

/// Runs an external converter binary as `<program> <source>`.
///
/// Success is judged by the output file existing after the process ends;
/// the exit status is only logged, since the converter exits non-zero on
/// warnings while still producing a usable package.
#[derive(Debug, Clone)]
pub struct ExternalConverter {
    program: PathBuf,
}

impl ExternalConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_settings(settings: &ConverterSettings) -> Self {
        Self::new(settings.program.clone())
    }
}

#[async_trait::async_trait]
impl PackageConverter for ExternalConverter {
    async fn convert(&self, job: &StagedJob) -> Result<ConversionOutcome, ConvertError> {
        if !job.source_path.exists() {
            return Err(ConvertError::MissingSource(job.source_path.clone()));
        }

        // An existing package is reused as-is.
        if job.output_path.exists() {
            engine_info!("Reusing existing output {:?}", job.output_path);
            return Ok(ConversionOutcome {
                output_exists: true,
                diagnostics: Vec::new(),
            });
        }

        let mut child = Command::new(&self.program)
            .arg(&job.source_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ConvertError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut raw_lines = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            if let Err(err) = read_lines(stdout, &mut raw_lines).await {
                if let Err(kill_err) = child.kill().await {
                    engine_warn!("Cannot stop converter after read error: {}", kill_err);
                }
                return Err(err.into());
            }
        }

        let status = child.wait().await?;
        if status.success() {
            engine_debug!("Converter exited cleanly for {:?}", job.source_path);
        } else {
            engine_warn!(
                "Converter exited with {} for {:?}",
                status,
                job.source_path
            );
        }

        let diagnostics = filter_diagnostics(raw_lines);
        Ok(ConversionOutcome {
            output_exists: job.output_path.exists(),
            diagnostics,
        })
    }
}

async fn read_lines(stdout: ChildStdout, lines: &mut Vec<String>) -> io::Result<()> {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        lines.push(line.trim_end_matches(&['\r', '\n'][..]).to_string());
    }
}

/// Drops empty lines and benign warnings, keeping the rest in order.
pub fn filter_diagnostics<I>(lines: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    lines
        .into_iter()
        .map(|line| -> String { line.into() })
        .filter(|line| !line.is_empty() && !line.contains(BENIGN_WARNING))
        .collect()
}

//! Batch conversion of e-books through an external converter command
//!
//! The walk is recursive; excluded subtrees are pruned at the first matching
//! directory. Conversions run strictly one at a time, in traversal order, and
//! a file is only converted when its destination does not already exist, so
//! re-running against a converted tree spawns no processes.

use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ConvertConfig;
use crate::error::{CourierError, Result};
use crate::exclude::ExclusionSet;

/// One planned invocation of the external converter
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Result of planning a batch: what to convert and what already exists
#[derive(Debug, Default)]
pub struct ConversionPlan {
    pub jobs: Vec<ConversionJob>,
    /// Sources whose destination file already exists
    pub skipped: Vec<PathBuf>,
}

/// Outcome of running a batch. Failures do not abort the batch; they are
/// recorded here so the caller decides how loudly to surface them.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub converted: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl ConversionReport {
    pub fn total(&self) -> usize {
        self.converted.len() + self.skipped.len() + self.failed.len()
    }
}

/// Formats a failed converter invocation with both stdout and stderr.
fn format_command_error(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

    match (stderr.is_empty(), stdout.is_empty()) {
        (true, true) => format!(
            "Command failed with exit code {}",
            output.status.code().unwrap_or(-1)
        ),
        (true, false) => stdout,
        (false, true) => stderr,
        (false, false) => format!("{}\n{}", stderr, stdout),
    }
}

/// Walks a source tree and converts qualifying files into a flat output
/// directory with `<command> <source> <destination>`.
pub struct BatchConverter {
    command: String,
    source_extension: String,
    target_extension: String,
    exclusions: ExclusionSet,
}

impl BatchConverter {
    pub fn new(
        command: impl Into<String>,
        source_extension: impl Into<String>,
        target_extension: impl Into<String>,
        exclusions: ExclusionSet,
    ) -> Self {
        Self {
            command: command.into(),
            source_extension: source_extension.into(),
            target_extension: target_extension.into(),
            exclusions,
        }
    }

    pub fn from_config(config: &ConvertConfig) -> Self {
        Self::new(
            &config.command,
            &config.source_extension,
            &config.target_extension,
            ExclusionSet::new(config.exclude.clone()),
        )
    }

    /// Enumerate qualifying files and decide which need converting.
    ///
    /// Creates the output directory when missing. A nonexistent source
    /// directory yields an empty plan rather than an error.
    pub fn plan(&self, source_dir: &Path, output_dir: &Path) -> Result<ConversionPlan> {
        std::fs::create_dir_all(output_dir)?;

        if !source_dir.exists() {
            warn!("Source directory {:?} does not exist", source_dir);
            return Ok(ConversionPlan::default());
        }

        let mut plan = ConversionPlan::default();

        let walker = WalkDir::new(source_dir).into_iter().filter_entry(|entry| {
            // Prune excluded subtrees; exclusion is tested on directories only
            !(entry.file_type().is_dir() && self.exclusions.matches(entry.path()))
        });

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();

            match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext == self.source_extension => {}
                _ => continue,
            }

            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem,
                None => continue,
            };

            // Flat output directory: identically named sources in different
            // subdirectories collide and the last conversion wins
            let destination = output_dir.join(format!("{}.{}", stem, self.target_extension));

            if destination.exists() {
                debug!("Skipping {:?}, destination already exists", path);
                plan.skipped.push(path.to_path_buf());
            } else {
                plan.jobs.push(ConversionJob {
                    source: path.to_path_buf(),
                    destination,
                });
            }
        }

        info!(
            "Planned {} conversions ({} already converted) under {:?}",
            plan.jobs.len(),
            plan.skipped.len(),
            source_dir
        );
        Ok(plan)
    }

    /// Run one converter invocation synchronously.
    pub async fn convert_one(&self, job: &ConversionJob) -> Result<()> {
        debug!("Converting {:?} -> {:?}", job.source, job.destination);

        let output = Command::new(&self.command)
            .arg(&job.source)
            .arg(&job.destination)
            .output()
            .await
            .map_err(|e| {
                CourierError::ConverterError(format!(
                    "Failed to spawn {}: {}",
                    self.command, e
                ))
            })?;

        if !output.status.success() {
            return Err(CourierError::ConverterError(format_command_error(&output)));
        }

        Ok(())
    }

    /// Execute a plan, one conversion at a time, invoking `on_file` after
    /// each job. Individual failures are recorded and the batch continues.
    pub async fn run_with_progress(
        &self,
        plan: ConversionPlan,
        on_file: impl Fn(),
    ) -> ConversionReport {
        let mut report = ConversionReport {
            skipped: plan.skipped,
            ..Default::default()
        };

        for job in plan.jobs {
            match self.convert_one(&job).await {
                Ok(()) => report.converted.push(job.destination),
                Err(e) => {
                    warn!("Conversion of {:?} failed: {}", job.source, e);
                    report.failed.push((job.source, e.to_string()));
                }
            }
            on_file();
        }

        info!(
            "Converted {} files, {} skipped, {} failed",
            report.converted.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    pub async fn run(&self, plan: ConversionPlan) -> ConversionReport {
        self.run_with_progress(plan, || {}).await
    }
}

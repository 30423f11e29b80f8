//! Batch driver for one day's intake directory
//!
//! Supports:
//! - Sequential processing of every case folder, in name order
//! - A pacing delay between folders
//! - Relocation into `<YYYYMMDD>-finished` / `<YYYYMMDD>-error`
//! - Error resilience (a failed folder never stops the batch)
//! - A JSON summary of the run

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::error::{FolderError, Issue};
use crate::logger::RunLogger;
use crate::pipeline::CasePipeline;
use crate::workflow::{folder_name, WorkflowKind};

/// Result of processing a single case folder
#[derive(Debug, Clone, Serialize)]
pub struct FolderResult {
    /// Folder name as found in the intake directory
    pub folder: String,
    pub workflow: WorkflowKind,
    /// Whether the folder ended up in the finished area
    pub success: bool,
    /// Error message if processing failed
    pub error: Option<String>,
    /// Advisory issues, whether or not they held the folder
    pub issues: Vec<String>,
    /// How many of `issues` compare the tables against the order text
    pub reconciliation_issues: usize,
    pub document_number: Option<String>,
    pub domain_count: usize,
    /// Path to the canonical CSV (if written)
    pub output_csv: Option<String>,
    pub mailed: bool,
    /// Where the folder was moved to, if it was moved
    pub relocated_to: Option<String>,
    pub duration_secs: f64,
}

/// Summary of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub intake_dir: String,
    /// Case folders processed (recognized or not)
    pub total_folders: usize,
    pub successful: usize,
    pub failed: usize,
    /// Failed folders whose failure was an issue-policy hold
    pub held: usize,
    pub total_domains: usize,
    pub folder_results: Vec<FolderResult>,
    pub total_duration_secs: f64,
    pub started_at: String,
    pub completed_at: String,
}

/// What the driver does with a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Process(WorkflowKind),
    /// Case folder of an unknown order type: logged and moved to finished
    Unrecognized,
    /// Not a case folder at all
    Skip,
}

fn count_reconciliation(issues: &[Issue]) -> usize {
    issues.iter().filter(|i| i.is_reconciliation()).count()
}

/// Decide how to treat the directory entry `name`
pub fn classify_entry(name: &str, config: &AppConfig) -> EntryAction {
    match WorkflowKind::resolve(name, config) {
        WorkflowKind::Unrecognized if name.ends_with(config.batch.case_folder_suffix.as_str()) => {
            EntryAction::Unrecognized
        }
        WorkflowKind::Unrecognized => EntryAction::Skip,
        kind => EntryAction::Process(kind),
    }
}

/// `<root>/<YYYYMMDD>`
pub fn intake_dir(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(date.format("%Y%m%d").to_string())
}

/// `<intake>/logs/<YYYYMMDD>.log`
pub fn daily_log_path(intake_dir: &Path, date: NaiveDate) -> PathBuf {
    intake_dir.join("logs").join(format!("{}.log", date.format("%Y%m%d")))
}

/// Sub-directories of `intake_dir`, sorted by name
pub fn list_entries(intake_dir: &Path) -> Result<Vec<PathBuf>> {
    if !intake_dir.is_dir() {
        bail!("Intake directory not found: {}", intake_dir.display());
    }
    let mut entries: Vec<PathBuf> = fs::read_dir(intake_dir)
        .with_context(|| format!("Failed to read intake directory: {}", intake_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    entries.sort();
    Ok(entries)
}

/// Move `folder` into `<intake>/<area>/`, creating the area on demand
pub fn relocate(folder: &Path, intake_dir: &Path, area: &str) -> Result<PathBuf> {
    let area_dir = intake_dir.join(area);
    fs::create_dir_all(&area_dir)
        .with_context(|| format!("Failed to create directory: {}", area_dir.display()))?;

    let target = area_dir.join(folder.file_name().context("Folder path has no name")?);
    if target.exists() {
        bail!("Cannot move {}: {} already exists", folder.display(), target.display());
    }
    fs::rename(folder, &target)
        .with_context(|| format!("Failed to move {} to {}", folder.display(), target.display()))?;
    Ok(target)
}

/// Runs the case pipeline over an intake directory
pub struct BatchDriver<'a> {
    config: &'a AppConfig,
    pipeline: &'a CasePipeline<'a>,
    logger: &'a RunLogger,
    delay: Duration,
}

impl<'a> BatchDriver<'a> {
    pub fn new(config: &'a AppConfig, pipeline: &'a CasePipeline<'a>, logger: &'a RunLogger, delay: Duration) -> Self {
        Self { config, pipeline, logger, delay }
    }

    fn area_name(&self, date: NaiveDate, suffix: &str) -> String {
        format!("{}{}", date.format("%Y%m%d"), suffix)
    }

    /// Process every case folder of `intake_dir` and relocate it afterwards
    pub fn run(&self, intake_dir: &Path, today: NaiveDate) -> Result<BatchSummary> {
        let entries = list_entries(intake_dir)?;
        let mut summary = new_batch_summary(intake_dir);
        let started = Instant::now();

        self.logger.log_run_start(intake_dir, entries.len());
        self.logger.start_progress(entries.len() as u64);

        let finished_area = self.area_name(today, &self.config.batch.finished_suffix);
        let error_area = self.area_name(today, &self.config.batch.error_suffix);

        let mut processed = 0usize;
        for path in &entries {
            let name = folder_name(path);
            let action = classify_entry(&name, self.config);
            if action == EntryAction::Skip {
                self.logger.log_folder_skipped(&name, "not a case folder");
                self.logger.advance_progress();
                continue;
            }

            if processed > 0 && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            processed += 1;

            let mut result = self.process_entry(path, action, intake_dir, today);
            let area = if result.success { &finished_area } else { &error_area };
            match relocate(path, intake_dir, area) {
                Ok(target) => {
                    self.logger.log_relocation(path, &target);
                    result.relocated_to = Some(target.display().to_string());
                }
                Err(e) => self.logger.error(&format!("{:#}", e)),
            }

            summary.folder_results.push(result);
            self.logger.advance_progress();
        }

        summary.total_duration_secs = started.elapsed().as_secs_f64();
        finalize_batch_summary(&mut summary);
        self.logger.finish_progress(&format!(
            "Batch complete: {} succeeded, {} failed",
            summary.successful, summary.failed
        ));
        Ok(summary)
    }

    /// Process one case folder in place, without relocation
    pub fn run_single(&self, folder: &Path, today: NaiveDate) -> Result<FolderResult> {
        if !folder.is_dir() {
            bail!("Case folder not found: {}", folder.display());
        }
        let name = folder_name(folder);
        let intake_dir = folder.parent().unwrap_or(Path::new("."));
        let action = match classify_entry(&name, self.config) {
            EntryAction::Skip => EntryAction::Unrecognized,
            other => other,
        };
        Ok(self.process_entry(folder, action, intake_dir, today))
    }

    fn process_entry(&self, path: &Path, action: EntryAction, intake_dir: &Path, today: NaiveDate) -> FolderResult {
        let name = folder_name(path);
        let started = Instant::now();

        let kind = match action {
            EntryAction::Process(kind) => kind,
            EntryAction::Unrecognized | EntryAction::Skip => {
                self.logger.warn(&format!("Unknown order type, not processed: {}", name));
                return FolderResult {
                    folder: name,
                    workflow: WorkflowKind::Unrecognized,
                    success: true,
                    error: None,
                    issues: Vec::new(),
                    reconciliation_issues: 0,
                    document_number: None,
                    domain_count: 0,
                    output_csv: None,
                    mailed: false,
                    relocated_to: None,
                    duration_secs: started.elapsed().as_secs_f64(),
                };
            }
        };

        self.logger.log_folder_start(&name, kind.config_key());
        match self.pipeline.process(path, kind, intake_dir, today) {
            Ok(report) => {
                for issue in &report.issues {
                    self.logger.log_issue(&name, &issue.to_string());
                }
                self.logger.log_folder_success(&name, report.domain_count, report.issues.len());
                FolderResult {
                    folder: name,
                    workflow: kind,
                    success: true,
                    error: None,
                    issues: report.issues.iter().map(|i| i.to_string()).collect(),
                    reconciliation_issues: count_reconciliation(&report.issues),
                    document_number: Some(report.document_number),
                    domain_count: report.domain_count,
                    output_csv: Some(report.report.canonical.display().to_string()),
                    mailed: report.mailed,
                    relocated_to: None,
                    duration_secs: started.elapsed().as_secs_f64(),
                }
            }
            Err(e) => {
                let held = matches!(e, FolderError::HeldForReview(_));
                for issue in e.held_issues() {
                    self.logger.log_issue(&name, &issue.to_string());
                }
                self.logger.log_folder_failed(&name, &e.to_string(), held);
                FolderResult {
                    folder: name,
                    workflow: kind,
                    success: false,
                    error: Some(e.to_string()),
                    issues: e.held_issues().iter().map(|i| i.to_string()).collect(),
                    reconciliation_issues: count_reconciliation(e.held_issues()),
                    document_number: None,
                    domain_count: 0,
                    output_csv: None,
                    mailed: false,
                    relocated_to: None,
                    duration_secs: started.elapsed().as_secs_f64(),
                }
            }
        }
    }
}

/// Path of the JSON summary for a run finishing now
pub fn summary_path(intake_dir: &Path) -> PathBuf {
    intake_dir
        .join("logs")
        .join(format!("batch_summary_{}.json", Local::now().format("%H%M%S")))
}

/// Export batch summary to JSON file
pub fn export_batch_summary(summary: &BatchSummary, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize batch summary")?;
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write batch summary to: {}", output_path.display()))?;
    Ok(())
}

/// Create a new batch summary
pub fn new_batch_summary(intake_dir: &Path) -> BatchSummary {
    BatchSummary {
        intake_dir: intake_dir.display().to_string(),
        total_folders: 0,
        successful: 0,
        failed: 0,
        held: 0,
        total_domains: 0,
        folder_results: Vec::new(),
        total_duration_secs: 0.0,
        started_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        completed_at: String::new(),
    }
}

/// Finalize a batch summary with end time and totals
pub fn finalize_batch_summary(summary: &mut BatchSummary) {
    summary.completed_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    summary.total_folders = summary.folder_results.len();
    summary.successful = summary.folder_results.iter().filter(|r| r.success).count();
    summary.failed = summary.folder_results.iter().filter(|r| !r.success).count();
    summary.held = summary
        .folder_results
        .iter()
        .filter(|r| !r.success && !r.issues.is_empty())
        .count();
    summary.total_domains = summary.folder_results.iter().map(|r| r.domain_count).sum();
}

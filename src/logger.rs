use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Silent = 0,    // Only show progress bar and final summary
    Summary = 1,   // One line per folder (default)
    Detailed = 2,  // Issues and relocations
    Debug = 3,     // Everything
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }

    /// Matching `tracing` filter directive for library events
    pub fn tracing_filter(&self) -> &'static str {
        match self {
            VerbosityLevel::Silent => "error",
            VerbosityLevel::Summary => "warn",
            VerbosityLevel::Detailed => "info",
            VerbosityLevel::Debug => "debug",
        }
    }
}

/// Operator-facing log for one batch run
#[derive(Clone)]
pub struct RunLogger {
    verbosity: VerbosityLevel,
    progress_bar: Arc<Mutex<Option<ProgressBar>>>,
    run_metadata: Arc<Mutex<RunMetadata>>,
    log_buffer: Arc<Mutex<Vec<String>>>,
    log_file_path: Option<PathBuf>,
}

#[derive(Default, Clone)]
struct RunMetadata {
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    intake_dir: String,
    folders_seen: usize,
    succeeded: usize,
    failed: usize,
    held: usize,
    skipped: usize,
    domains_written: usize,
    issues_raised: usize,
    summary_file: String,
}

impl RunLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Arc::new(Mutex::new(None)),
            run_metadata: Arc::new(Mutex::new(RunMetadata::default())),
            log_buffer: Arc::new(Mutex::new(Vec::new())),
            log_file_path: None,
        }
    }

    /// Log lines are also appended to `log_file_path` by `export_logs`
    pub fn with_log_file(verbosity: VerbosityLevel, log_file_path: PathBuf) -> Self {
        Self {
            log_file_path: Some(log_file_path),
            ..Self::new(verbosity)
        }
    }

    pub fn info(&self, message: &str) {
        self.record("INFO", message);
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", message);
        }
    }

    pub fn warn(&self, message: &str) {
        self.record("WARNING", message);
        if self.verbosity >= VerbosityLevel::Detailed {
            self.print_message("WARN", message);
        }
    }

    pub fn error(&self, message: &str) {
        // Errors are shown at every verbosity
        self.record("ERROR", message);
        self.print_message("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.record("DEBUG", message);
            self.print_message("DEBUG", message);
        }
    }

    /// Buffer a line in the daily log file format
    fn record(&self, level: &str, message: &str) {
        if self.log_file_path.is_none() {
            return;
        }
        let line = format!("{} [{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), level, message);
        if let Ok(mut buffer) = self.log_buffer.lock() {
            buffer.push(line);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let msg = format!("[{}] {}: {}", Local::now().format("%H:%M:%S%.3f"), level, message);

        // Print above an active progress bar so it keeps its position
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.println(msg);
                return;
            }
        }

        eprintln!("{}", msg);
    }

    pub fn start_progress(&self, total_folders: u64) {
        let pb = if self.verbosity == VerbosityLevel::Silent || total_folders == 0 {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total_folders)
        };

        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb.set_message("Scanning...");

        if let Ok(mut guard) = self.progress_bar.lock() {
            *guard = Some(pb);
        }
        self.with_metadata(|m| m.start_time = Some(Instant::now()));
    }

    pub fn update_progress(&self, message: &str) {
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(message.to_string());
            }
        }
    }

    pub fn advance_progress(&self) {
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.inc(1);
            }
        }
    }

    pub fn finish_progress(&self, final_message: &str) {
        if let Ok(mut guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        self.with_metadata(|m| m.end_time = Some(Instant::now()));
        self.info(final_message);
    }

    fn with_metadata(&self, f: impl FnOnce(&mut RunMetadata)) {
        if let Ok(mut metadata) = self.run_metadata.lock() {
            f(&mut metadata);
        }
    }

    // Run bookkeeping

    pub fn log_run_start(&self, intake_dir: &Path, folder_count: usize) {
        self.with_metadata(|m| {
            m.intake_dir = intake_dir.display().to_string();
            m.folders_seen = folder_count;
        });
        self.info(&format!("Processing intake directory {} ({} entries)", intake_dir.display(), folder_count));
    }

    pub fn log_folder_start(&self, name: &str, workflow: &str) {
        self.update_progress(name);
        self.info(&format!("Processing folder: {} ({})", name, workflow));
    }

    pub fn log_folder_success(&self, name: &str, domain_count: usize, issue_count: usize) {
        self.with_metadata(|m| {
            m.succeeded += 1;
            m.domains_written += domain_count;
            m.issues_raised += issue_count;
        });
        self.info(&format!("Folder {} finished: {} domain(s), {} issue(s)", name, domain_count, issue_count));
    }

    pub fn log_folder_failed(&self, name: &str, error: &str, held: bool) {
        self.with_metadata(|m| {
            m.failed += 1;
            if held {
                m.held += 1;
            }
        });
        self.error(&format!("Folder {} failed: {}", name, error));
    }

    pub fn log_folder_skipped(&self, name: &str, reason: &str) {
        self.with_metadata(|m| m.skipped += 1);
        self.debug(&format!("Skipping {}: {}", name, reason));
    }

    pub fn log_issue(&self, name: &str, issue: &str) {
        self.warn(&format!("{}: {}", name, issue));
    }

    pub fn log_relocation(&self, from: &Path, to: &Path) {
        self.debug(&format!("Moved {} -> {}", from.display(), to.display()));
    }

    pub fn log_summary_written(&self, path: &Path) {
        self.with_metadata(|m| m.summary_file = path.display().to_string());
        self.info(&format!("Batch summary written: {}", path.display()));
    }

    pub fn print_final_summary(&self) {
        let Ok(metadata) = self.run_metadata.lock() else {
            return;
        };

        // Always printed, regardless of verbosity
        println!("\n=== RPZ INTAKE SUMMARY ===");
        if let (Some(start), Some(end)) = (metadata.start_time, metadata.end_time) {
            println!("Run Duration: {:.2}s", end.duration_since(start).as_secs_f64());
        }
        if !metadata.intake_dir.is_empty() {
            println!("Intake Directory: {}", metadata.intake_dir);
        }
        println!("Entries Seen: {}", metadata.folders_seen);
        println!("Succeeded: {}", metadata.succeeded);
        println!("Failed: {} ({} held for review)", metadata.failed, metadata.held);
        println!("Skipped: {}", metadata.skipped);
        println!("Domains Written: {}", metadata.domains_written);
        println!("Issues Raised: {}", metadata.issues_raised);
        if !metadata.summary_file.is_empty() {
            println!("Summary File: {}", metadata.summary_file);
        }
        println!("==========================\n");

        if metadata.failed == 0 {
            println!("✅ All case folders processed.");
        } else {
            println!("⚠️  {} case folder(s) moved to the error area.", metadata.failed);
        }
    }

    /// Append all buffered lines to the log file
    pub fn export_logs(&self) -> io::Result<()> {
        let Some(ref log_file_path) = self.log_file_path else {
            return Ok(());
        };
        let Ok(mut buffer) = self.log_buffer.lock() else {
            return Ok(());
        };

        if let Some(parent) = log_file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(log_file_path)?;
        for entry in buffer.drain(..) {
            writeln!(file, "{}", entry)?;
        }
        file.flush()
    }

    pub fn is_log_export_enabled(&self) -> bool {
        self.log_file_path.is_some()
    }

    pub fn get_log_count(&self) -> usize {
        self.log_buffer.lock().map(|b| b.len()).unwrap_or(0)
    }
}

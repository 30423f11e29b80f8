use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rpzintake")]
#[command(about = "Process RPZ takedown-request folders into normalized domain lists")]
#[command(version)]
pub struct Cli {
    /// Create default configuration file at ./config/rpzintake.toml
    #[arg(long)]
    pub init: bool,

    /// Configuration file (defaults to ./config/rpzintake.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Batch root holding one intake directory per day (overrides paths.root)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Intake date as YYYYMMDD (defaults to today)
    #[arg(short, long, value_name = "YYYYMMDD", value_parser = parse_intake_date)]
    pub date: Option<NaiveDate>,

    /// Process a single case folder in place, without relocating it
    #[arg(long, value_name = "DIR")]
    pub folder: Option<PathBuf>,

    /// Verbose logging (use -v for INFO, -vv for DEBUG)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log file (defaults to <intake>/logs/<YYYYMMDD>.log)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Compose mails but only log them instead of writing them to the outbox
    #[arg(long)]
    pub dry_run: bool,

    /// Pause between case folders in milliseconds (overrides batch.folder_delay_ms)
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Skip writing the JSON batch summary
    #[arg(long)]
    pub no_summary: bool,
}

/// Accepts `YYYYMMDD` or `YYYY-MM-DD`
pub fn parse_intake_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| format!("Invalid date '{}': expected YYYYMMDD", value))
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(folder) = &self.folder {
            if folder.as_os_str().is_empty() {
                return Err("Folder path cannot be empty".to_string());
            }
            if self.date.is_some() {
                return Err("--date has no effect with --folder".to_string());
            }
        }
        Ok(())
    }
}

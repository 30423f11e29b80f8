use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use rpzintake::batch::{daily_log_path, export_batch_summary, intake_dir, summary_path, BatchDriver};
use rpzintake::cli::Cli;
use rpzintake::config::{self, AppConfig};
use rpzintake::document::PdfTextReader;
use rpzintake::logger::{RunLogger, VerbosityLevel};
use rpzintake::mail::{DryRunDispatcher, MailDispatcher, OutboxDispatcher};
use rpzintake::pipeline::CasePipeline;
use rpzintake::reference::load_reference_sets;

fn load_config(path: Option<&Path>) -> AppConfig {
    let result = match path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    };

    match result {
        Ok(cfg) => cfg,
        Err(config::ConfigError::FileNotFound(path)) => {
            // Config not found - prompt to create if interactive
            match AppConfig::prompt_create_config() {
                Ok(Some(created_path)) => {
                    println!("✅ Created default configuration file at: {}", created_path.display());
                    println!("   Edit this file to customize settings, then run rpzintake again.");
                    std::process::exit(0);
                }
                Ok(None) => {
                    eprintln!("❌ Configuration file not found at: {}", path.display());
                    eprintln!("   Run with --init to create a default configuration file.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Failed to create configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.tracing_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        eprintln!("❌ {}", e);
        std::process::exit(2);
    }

    // Handle --init flag first (before any other processing)
    if cli.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("✅ Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize settings, then run rpzintake again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    let app_config = load_config(cli.config.as_deref());

    let verbosity = VerbosityLevel::from_verbose_count(cli.verbose);
    init_tracing(verbosity);

    let root = match &cli.root {
        Some(root) => root.clone(),
        None => app_config.batch_root().context("Failed to resolve batch root")?,
    };
    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());
    let intake = match &cli.folder {
        Some(folder) => folder
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        None => intake_dir(&root, date),
    };

    let log_file = cli.log_file.clone().unwrap_or_else(|| daily_log_path(&intake, date));
    let logger = RunLogger::with_log_file(verbosity, log_file);
    logger.debug(&format!("Batch root: {}", root.display()));

    let encodings = app_config.text_encodings().context("Invalid tables.encodings")?;
    let references = load_reference_sets(&app_config.tld_table_path(&root), &app_config.whitelist_path(), &encodings)
        .context("Failed to load reference tables")?;
    for issue in &references.issues {
        logger.warn(&issue.to_string());
    }

    let mailer: Box<dyn MailDispatcher> = if cli.dry_run {
        logger.info("Dry run: mails are logged, not queued");
        Box::new(DryRunDispatcher)
    } else {
        Box::new(OutboxDispatcher::new(&root.join(&app_config.mail.outbox_dir)))
    };

    let reader = PdfTextReader;
    let pipeline = CasePipeline::new(&app_config, &references.value, references.issues.clone(), &reader, mailer.as_ref())
        .context("Failed to set up case pipeline")?;

    let delay = cli
        .delay_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| app_config.folder_delay());
    let driver = BatchDriver::new(&app_config, &pipeline, &logger, delay);

    if let Some(folder) = &cli.folder {
        let result = driver.run_single(folder, date);
        if let Err(e) = logger.export_logs() {
            eprintln!("⚠️  Failed to write log file: {}", e);
        }
        let result = result?;
        if !result.success {
            std::process::exit(1);
        }
        println!("✅ {} processed ({} domains)", result.folder, result.domain_count);
        return Ok(());
    }

    let summary = match driver.run(&intake, date) {
        Ok(summary) => summary,
        Err(e) => {
            logger.error(&format!("{:#}", e));
            if let Err(e) = logger.export_logs() {
                eprintln!("⚠️  Failed to write log file: {}", e);
            }
            std::process::exit(1);
        }
    };

    if !cli.no_summary {
        let path = summary_path(&intake);
        match export_batch_summary(&summary, &path) {
            Ok(()) => logger.log_summary_written(&path),
            Err(e) => logger.error(&format!("{:#}", e)),
        }
    }

    if let Err(e) = logger.export_logs() {
        eprintln!("⚠️  Failed to write log file: {}", e);
    }
    logger.print_final_summary();

    Ok(())
}

//! Batch driver tests over a full intake directory.

mod common;

use chrono::NaiveDate;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use common::fixtures::*;
use rpzintake::batch::{export_batch_summary, summary_path, BatchDriver};
use rpzintake::logger::{RunLogger, VerbosityLevel};
use rpzintake::pipeline::CasePipeline;
use rpzintake::reference::load_reference_sets;
use rpzintake::workflow::WorkflowKind;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
}

#[test]
fn test_batch_relocates_every_case_folder() {
    let tmp = TempDir::new().expect("create temp dir");
    let root = tmp.path().join("RPZ_auto");
    write_reference_files(&root);
    let intake = root.join("20240105");

    write_case(
        &intake,
        "001 刑詐防字第11號",
        ("刑詐防字第11號.pdf", "刑詐防字第11號"),
        &[("list.csv", "domain\na.com\nb.net\n")],
    );
    write_case(
        &intake,
        "002 警署刑毒緝字第22號",
        ("公文.pdf", "警署刑毒緝字第22號 有關：x.com 等 3 個"),
        &[("list.csv", "domain\nx.com\n")],
    );
    fs::create_dir_all(intake.join("003 北市警字第33號")).unwrap();
    fs::create_dir_all(intake.join("備份")).unwrap();

    let config = test_config(&root);
    let encodings = config.text_encodings().unwrap();
    let refs = load_reference_sets(&config.tld_table_path(&root), &config.whitelist_path(), &encodings).unwrap();
    let mailer = RecordingMailer::default();
    let pipeline = CasePipeline::new(&config, &refs.value, refs.issues.clone(), &PlainTextReader, &mailer).unwrap();
    let logger = RunLogger::new(VerbosityLevel::Silent);
    let driver = BatchDriver::new(&config, &pipeline, &logger, Duration::ZERO);

    let summary = driver.run(&intake, today()).unwrap();

    assert_eq!(summary.total_folders, 3);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.held, 1);
    assert_eq!(summary.total_domains, 2);

    let finished = intake.join("20240105-finished");
    let error = intake.join("20240105-error");
    assert!(finished.join("001 刑詐防字第11號").is_dir());
    assert!(finished.join("003 北市警字第33號").is_dir());
    assert!(error.join("002 警署刑毒緝字第22號").is_dir());
    assert!(intake.join("備份").is_dir(), "non-case folders stay in place");

    let unknown = summary
        .folder_results
        .iter()
        .find(|r| r.folder.starts_with("003"))
        .unwrap();
    assert_eq!(unknown.workflow, WorkflowKind::Unrecognized);
    assert!(unknown.success);

    let held = summary.folder_results.iter().find(|r| r.folder.starts_with("002")).unwrap();
    assert!(!held.success);
    assert_eq!(held.issues.len(), 1);
    assert_eq!(held.reconciliation_issues, 1);
    assert!(held.relocated_to.as_deref().is_some_and(|p| p.contains("20240105-error")));

    assert_eq!(mailer.count(), 1);

    let path = summary_path(&intake);
    export_batch_summary(&summary, &path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["successful"], 2);
    assert_eq!(json["folder_results"][1]["workflow"], "toxic");
}

#[test]
fn test_run_single_leaves_folder_in_place() {
    let tmp = TempDir::new().expect("create temp dir");
    let root = tmp.path().join("RPZ_auto");
    write_reference_files(&root);
    let intake = root.join("20240105");
    let case = write_case(
        &intake,
        "001 衛授國字第1號",
        ("衛授國字第1號.pdf", "衛授國字第1號"),
        &[("list.csv", "domain\nvape.com\n")],
    );

    let config = test_config(&root);
    let encodings = config.text_encodings().unwrap();
    let refs = load_reference_sets(&config.tld_table_path(&root), &config.whitelist_path(), &encodings).unwrap();
    let mailer = RecordingMailer::default();
    let pipeline = CasePipeline::new(&config, &refs.value, vec![], &PlainTextReader, &mailer).unwrap();
    let logger = RunLogger::new(VerbosityLevel::Silent);
    let driver = BatchDriver::new(&config, &pipeline, &logger, Duration::ZERO);

    let result = driver.run_single(&case, today()).unwrap();

    assert!(result.success);
    assert_eq!(result.workflow, WorkflowKind::Smoke);
    assert_eq!(result.domain_count, 1);
    assert!(case.is_dir());
    assert!(result.relocated_to.is_none());
    assert!(intake.join("自動化CSV檔").join("RPZ 1.0 1130105-001.csv").exists());
}

#[test]
fn test_run_single_twice_ignores_generated_lists() {
    let tmp = TempDir::new().expect("create temp dir");
    let root = tmp.path().join("RPZ_auto");
    write_reference_files(&root);
    let intake = root.join("20240105");
    let case = write_case(
        &intake,
        "001 刑詐防字第1號",
        ("刑詐防字第1號.pdf", "刑詐防字第1號"),
        &[("list.csv", "domain\na.com\nhttp://bad.com\n")],
    );

    let config = test_config(&root);
    let encodings = config.text_encodings().unwrap();
    let refs = load_reference_sets(&config.tld_table_path(&root), &config.whitelist_path(), &encodings).unwrap();
    let mailer = RecordingMailer::default();
    let pipeline = CasePipeline::new(&config, &refs.value, vec![], &PlainTextReader, &mailer).unwrap();
    let logger = RunLogger::new(VerbosityLevel::Silent);
    let driver = BatchDriver::new(&config, &pipeline, &logger, Duration::ZERO);

    let first = driver.run_single(&case, today()).unwrap();
    assert!(first.success);
    assert!(case.join("格式錯誤domain_1130105-001.csv").exists());

    let second = driver.run_single(&case, today()).unwrap();
    assert!(second.success, "second run failed: {:?}", second.error);
    assert_eq!(second.domain_count, 2);
    assert_eq!(mailer.count(), 2);
}

#[test]
fn test_missing_intake_directory_fails() {
    let tmp = TempDir::new().expect("create temp dir");
    let root = tmp.path().to_path_buf();
    write_reference_files(&root);

    let config = test_config(&root);
    let refs = rpzintake::reference::ReferenceSets::default();
    let mailer = RecordingMailer::default();
    let pipeline = CasePipeline::new(&config, &refs, vec![], &PlainTextReader, &mailer).unwrap();
    let logger = RunLogger::new(VerbosityLevel::Silent);
    let driver = BatchDriver::new(&config, &pipeline, &logger, Duration::ZERO);

    assert!(driver.run(&root.join("20240105"), today()).is_err());
}

//! Processing of a single case folder
//!
//! Order of work for one folder:
//! 1. classify its files for the workflow
//! 2. extract the case identifiers from the order document
//! 3. merge the domain tables into canonical rows
//! 4. reconcile against the order text (workflows that declare patterns)
//! 5. validate every domain against the reference sets
//! 6. write the report CSVs and the ZIP bundle
//! 7. apply the issue policy, then mail
//!
//! Advisory issues accumulate along the way. Under a `hold` policy they fail
//! the folder only after every artifact has been written.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::bundle::{bundle_name, write_bundle};
use crate::case_id::CaseIdentifierExtractor;
use crate::config::{AppConfig, ConfigError, IssuePolicy};
use crate::document::DocumentReader;
use crate::error::{FolderError, Issue};
use crate::export::{ReportWriter, WrittenReport};
use crate::mail::{MailDispatcher, OutboundMail};
use crate::reconcile::reconcile;
use crate::record::{build_records, CaseMetadata};
use crate::reference::ReferenceSets;
use crate::table::TableNormalizer;
use crate::validator::Validator;
use crate::workflow::{folder_name, CaseFolder, WorkflowKind};

/// Everything produced for one successfully processed folder
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub folder: CaseFolder,
    pub document_number: String,
    pub domain_count: usize,
    pub report: WrittenReport,
    pub bundle: PathBuf,
    pub issues: Vec<Issue>,
    pub mailed: bool,
}

/// Shared state for processing the folders of one run
pub struct CasePipeline<'a> {
    config: &'a AppConfig,
    references: &'a ReferenceSets,
    reference_issues: Vec<Issue>,
    normalizer: TableNormalizer,
    reader: &'a dyn DocumentReader,
    mailer: &'a dyn MailDispatcher,
}

impl<'a> CasePipeline<'a> {
    /// `reference_issues` are raised while loading the reference sets and are
    /// reported again for every folder, since they affect every validation.
    pub fn new(
        config: &'a AppConfig,
        references: &'a ReferenceSets,
        reference_issues: Vec<Issue>,
        reader: &'a dyn DocumentReader,
        mailer: &'a dyn MailDispatcher,
    ) -> Result<Self, ConfigError> {
        let normalizer = TableNormalizer::new(config.text_encodings()?, config.tables.domain_headers.clone());
        Ok(Self { config, references, reference_issues, normalizer, reader, mailer })
    }

    /// Process the case folder at `path`. Shared artifacts go under `intake_dir`.
    pub fn process(
        &self,
        path: &Path,
        kind: WorkflowKind,
        intake_dir: &Path,
        today: NaiveDate,
    ) -> Result<CaseReport, FolderError> {
        let profile = self
            .config
            .profile(kind)
            .ok_or_else(|| FolderError::UnknownWorkflow(folder_name(path)))?;

        let folder = CaseFolder::discover(path, kind, profile)?;
        info!("Processing {} case folder: {}", kind, folder.name);

        let mut issues = self.reference_issues.clone();

        let text = self.reader.extract_text(&folder.document)?;
        let case = CaseIdentifierExtractor::from_profile(profile)?
            .extract(&text)?
            .drain_into(&mut issues);
        info!("Document number: {}", case.document_number);

        let rows = self.normalizer.normalize(&folder.tables)?;
        let metadata = CaseMetadata::from_first_row(rows.first(), &profile.defaults);
        let records = build_records(&rows, &profile.defaults);
        info!("Merged {} domain(s) from {} table(s)", records.len(), folder.tables.len());

        if profile.reconciles() {
            issues.extend(reconcile(&records, &case));
        }

        let findings = Validator::from_sets(self.references).validate(records);
        issues.extend(findings.issues());

        let writer = ReportWriter::new(
            intake_dir,
            &self.config.batch.csv_output_dir,
            &self.config.batch.invalid_tld_dir,
            &self.config.report.request_type,
        );
        let report = writer.write(&folder.path, &folder.serial, &findings, &metadata, &case.document_number, today)?;

        let first_table = folder
            .tables
            .first()
            .ok_or_else(|| FolderError::MissingTables { extensions: profile.table_extensions.join("|") })?;
        let bundle_path = folder.path.join(bundle_name(first_table));
        let sources: Vec<PathBuf> = std::iter::once(folder.document.clone())
            .chain(folder.attachments.iter().cloned())
            .chain(folder.tables.iter().cloned())
            .collect();
        let bundle = write_bundle(&bundle_path, &sources)?;

        for issue in &issues {
            warn!("{}: {}", folder.name, issue);
        }

        if profile.issue_policy == IssuePolicy::Hold && !issues.is_empty() {
            warn!("{} held for review with {} issue(s), mail skipped", folder.name, issues.len());
            return Err(FolderError::HeldForReview(issues));
        }

        let mailed = if profile.send_mail {
            let mail = OutboundMail::new(
                &self.config.mail.recipients,
                &folder.name,
                vec![bundle.clone(), report.canonical.clone()],
            );
            self.mailer
                .dispatch(&mail)
                .map_err(|e| FolderError::Mail(format!("{:#}", e)))?;
            true
        } else {
            info!("Mail disabled for {} workflow", kind);
            false
        };

        Ok(CaseReport {
            domain_count: findings.records.len(),
            document_number: case.document_number,
            folder,
            report,
            bundle,
            issues,
            mailed,
        })
    }
}

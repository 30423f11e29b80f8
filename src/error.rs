//! Fatal and advisory error types for case-folder processing
//!
//! A `FolderError` aborts the folder. An `Issue` is collected into an
//! `Outcome` and only becomes fatal when the workflow's issue policy says so.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to pull text out of an order document
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to open document {path}: {reason}")]
    Open { path: PathBuf, reason: String },
}

/// Conditions that abort a whole case folder
#[derive(Error, Debug)]
pub enum FolderError {
    #[error("No workflow profile for folder '{0}'")]
    UnknownWorkflow(String),

    #[error("Case folder has no order document (*{suffix})")]
    MissingDocument { suffix: String },

    #[error("Case folder has no domain table (*.{extensions})")]
    MissingTables { extensions: String },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Unreadable table {path}: no encoding worked (tried {tried})")]
    UnreadableTable { path: PathBuf, tried: String },

    #[error("Failed to open spreadsheet {path}: {reason}")]
    Spreadsheet { path: PathBuf, reason: String },

    #[error("No domain column in {path} (headers: {headers})")]
    MissingDomainColumn { path: PathBuf, headers: String },

    #[error("Could not extract a case number from the order document")]
    MissingCaseNumber,

    #[error("Invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write bundle {path}: {reason}")]
    Bundle { path: PathBuf, reason: String },

    #[error("Mail dispatch failed: {0}")]
    Mail(String),

    #[error("{}", join_issues(.0))]
    HeldForReview(Vec<Issue>),
}

impl FolderError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        FolderError::Io { path: path.to_path_buf(), source }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        FolderError::Csv { path: path.to_path_buf(), source }
    }

    /// Issues that caused a hold, empty for every other variant
    pub fn held_issues(&self) -> &[Issue] {
        match self {
            FolderError::HeldForReview(issues) => issues,
            _ => &[],
        }
    }
}

fn join_issues(issues: &[Issue]) -> String {
    issues.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; ")
}

/// Advisory finding collected while processing a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    MissingReferenceFile { path: PathBuf },
    MissingQuantity,
    MissingReferenceDomain,
    QuantityMismatch { declared: u64, actual: usize },
    FirstDomainMismatch { table: Option<String>, document: String },
    MalformedDomains(usize),
    WhitelistHits(usize),
    InvalidTlds(usize),
}

impl Issue {
    /// Reconciliation issues compare the tables against the order text
    pub fn is_reconciliation(&self) -> bool {
        matches!(
            self,
            Issue::MissingQuantity
                | Issue::MissingReferenceDomain
                | Issue::QuantityMismatch { .. }
                | Issue::FirstDomainMismatch { .. }
        )
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingReferenceFile { path } => {
                write!(f, "Reference file not found: {}", path.display())
            }
            Issue::MissingQuantity => write!(f, "Order document does not declare a domain quantity"),
            Issue::MissingReferenceDomain => {
                write!(f, "Could not extract the referenced domain from the order document")
            }
            Issue::QuantityMismatch { declared, actual } => write!(
                f,
                "Domain count {} does not match the {} declared in the order document",
                actual, declared
            ),
            Issue::FirstDomainMismatch { table, document } => match table {
                Some(table) => write!(
                    f,
                    "First table domain [{}] does not match order document domain [{}]",
                    table, document
                ),
                None => write!(f, "Tables are empty; order document names [{}]", document),
            },
            Issue::MalformedDomains(n) => write!(f, "Found {} malformed domain(s)", n),
            Issue::WhitelistHits(n) => write!(f, "Found {} whitelisted domain(s)", n),
            Issue::InvalidTlds(n) => write!(f, "Found {} domain(s) with a suspicious TLD", n),
        }
    }
}

/// A value together with the advisory issues raised while producing it
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub issues: Vec<Issue>,
}

impl<T> Outcome<T> {
    pub fn clean(value: T) -> Self {
        Self { value, issues: Vec::new() }
    }

    pub fn with_issues(value: T, issues: Vec<Issue>) -> Self {
        Self { value, issues }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Move this outcome's issues into `sink` and return the bare value
    pub fn drain_into(self, sink: &mut Vec<Issue>) -> T {
        sink.extend(self.issues);
        self.value
    }
}

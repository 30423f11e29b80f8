//! Reference sets consulted by the domain validator
//!
//! Both sets are loaded once per run by the driver and handed to the
//! `Validator`; nothing below reads a fixed path on its own.

use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::domain_utils::normalize_tld;
use crate::error::{FolderError, Issue, Outcome};
use crate::table::{read_csv_table, RawTable, TextEncoding};

/// Header of the TLD column in the reference table
pub const TLD_COLUMN: &str = "TLD";

/// Valid top-level domains, lower-cased
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TldSet(HashSet<String>);

impl TldSet {
    pub fn from_table(table: &RawTable) -> Self {
        let Some(col) = table.headers.iter().position(|h| h.trim() == TLD_COLUMN) else {
            return Self::default();
        };
        Self(
            table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|v| normalize_tld(v))
                .filter(|v| !v.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, tld: &str) -> bool {
        self.0.contains(&tld.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|s| normalize_tld(s.as_ref())).filter(|s| !s.is_empty()).collect())
    }
}

/// Sensitive domains that must never be taken down, lower-cased
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhitelistSet(HashSet<String>);

impl WhitelistSet {
    /// First column of every data row; the header row is ignored
    pub fn from_table(table: &RawTable) -> Self {
        table
            .rows
            .iter()
            .filter_map(|row| row.first())
            .collect()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.0.contains(&domain.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for WhitelistSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

/// Both reference sets plus the issues raised while loading them
#[derive(Debug, Clone, Default)]
pub struct ReferenceSets {
    pub tlds: TldSet,
    pub whitelist: WhitelistSet,
}

/// Load the TLD table. A missing file yields an empty set and an issue.
pub fn load_tlds(path: &Path, encodings: &[TextEncoding]) -> Result<Outcome<TldSet>, FolderError> {
    if !path.exists() {
        warn!("TLD reference table not found: {}", path.display());
        return Ok(Outcome::with_issues(
            TldSet::default(),
            vec![Issue::MissingReferenceFile { path: path.to_path_buf() }],
        ));
    }
    let tlds = TldSet::from_table(&read_csv_table(path, encodings)?);
    if tlds.is_empty() {
        warn!("TLD reference table {} has no '{}' entries", path.display(), TLD_COLUMN);
    }
    info!("Loaded {} TLDs from {}", tlds.len(), path.display());
    Ok(Outcome::clean(tlds))
}

/// Load the whitelist table. A missing file yields an empty set and an issue.
pub fn load_whitelist(path: &Path, encodings: &[TextEncoding]) -> Result<Outcome<WhitelistSet>, FolderError> {
    if !path.exists() {
        warn!("Whitelist not found: {}", path.display());
        return Ok(Outcome::with_issues(
            WhitelistSet::default(),
            vec![Issue::MissingReferenceFile { path: path.to_path_buf() }],
        ));
    }
    let whitelist = WhitelistSet::from_table(&read_csv_table(path, encodings)?);
    info!("Loaded {} whitelist entries from {}", whitelist.len(), path.display());
    Ok(Outcome::clean(whitelist))
}

/// Load both sets, collecting missing-file issues into one outcome
pub fn load_reference_sets(
    tld_path: &Path,
    whitelist_path: &Path,
    encodings: &[TextEncoding],
) -> Result<Outcome<ReferenceSets>, FolderError> {
    let mut issues = Vec::new();
    let tlds = load_tlds(tld_path, encodings)?.drain_into(&mut issues);
    let whitelist = load_whitelist(whitelist_path, encodings)?.drain_into(&mut issues);
    Ok(Outcome::with_issues(ReferenceSets { tlds, whitelist }, issues))
}

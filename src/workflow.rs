//! Workflow dispatch and case-folder discovery
//!
//! A folder name is resolved once into a `WorkflowKind`; everything after
//! that point works from the matching `WorkflowProfile` in the config.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{AppConfig, WorkflowProfile};
use crate::error::FolderError;
use crate::export::is_side_channel_file;

/// Kind of takedown order a case folder carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    Fraud,
    Toxic,
    Smoke,
    Unrecognized,
}

impl WorkflowKind {
    /// Workflows that have a profile in the config
    pub const RECOGNIZED: [WorkflowKind; 3] = [WorkflowKind::Fraud, WorkflowKind::Toxic, WorkflowKind::Smoke];

    /// Order in which folder tokens are tested
    const DISPATCH_ORDER: [WorkflowKind; 3] = [WorkflowKind::Toxic, WorkflowKind::Fraud, WorkflowKind::Smoke];

    pub fn config_key(&self) -> &'static str {
        match self {
            WorkflowKind::Fraud => "fraud",
            WorkflowKind::Toxic => "toxic",
            WorkflowKind::Smoke => "smoke",
            WorkflowKind::Unrecognized => "unrecognized",
        }
    }

    /// Resolve a folder name against the configured folder tokens
    pub fn resolve(folder_name: &str, config: &AppConfig) -> Self {
        Self::DISPATCH_ORDER
            .into_iter()
            .find(|kind| config.profile(*kind).is_some_and(|p| p.matches_folder(folder_name)))
            .unwrap_or(WorkflowKind::Unrecognized)
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// Files of one case folder, classified for its workflow
#[derive(Debug, Clone, PartialEq)]
pub struct CaseFolder {
    pub path: PathBuf,
    pub name: String,
    /// Leading whitespace-delimited token of the folder name
    pub serial: String,
    pub kind: WorkflowKind,
    pub document: PathBuf,
    pub attachments: Vec<PathBuf>,
    pub tables: Vec<PathBuf>,
}

impl CaseFolder {
    /// Classify the files of `path` according to `profile`.
    ///
    /// The order document is the first PDF (by name) ending with the profile's
    /// document suffix; every other PDF is an attachment. Table sources are all
    /// files carrying one of the profile's table extensions, in name order,
    /// except the side-channel lists an earlier run left behind.
    pub fn discover(path: &Path, kind: WorkflowKind, profile: &WorkflowProfile) -> Result<Self, FolderError> {
        let name = folder_name(path);
        let serial = serial_of(&name);

        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .map_err(|e| FolderError::io(path, e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let suffix = profile.document_suffix.to_lowercase();
        let mut document = None;
        let mut attachments = Vec::new();
        let mut tables = Vec::new();

        for file in files {
            let file_name = folder_name(&file);
            if is_side_channel_file(&file_name) {
                debug!("Skipping generated list {}", file_name);
                continue;
            }
            let file_name = file_name.to_lowercase();
            if has_extension(&file, "pdf") {
                if document.is_none() && file_name.ends_with(&suffix) {
                    document = Some(file);
                } else {
                    attachments.push(file);
                }
            } else if profile.table_extensions.iter().any(|ext| has_extension(&file, ext)) {
                tables.push(file);
            }
        }

        let document = document.ok_or_else(|| FolderError::MissingDocument {
            suffix: profile.document_suffix.clone(),
        })?;
        if tables.is_empty() {
            return Err(FolderError::MissingTables {
                extensions: profile.table_extensions.join("|"),
            });
        }

        debug!(
            "Case folder {}: document {}, {} attachment(s), {} table(s)",
            name,
            document.display(),
            attachments.len(),
            tables.len()
        );

        Ok(Self { path: path.to_path_buf(), name, serial, kind, document, attachments, tables })
    }
}

/// Final path component as a string, empty when there is none
pub fn folder_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Leading whitespace-delimited token of a folder name
pub fn serial_of(name: &str) -> String {
    name.split_whitespace().next().unwrap_or_default().to_string()
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext.trim_start_matches('.')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONFIG;
    use tempfile::tempdir;

    fn config() -> AppConfig {
        toml::from_str(DEFAULT_CONFIG).unwrap()
    }

    #[test]
    fn test_resolve_by_folder_token() {
        let config = config();
        assert_eq!(WorkflowKind::resolve("001 警署刑毒緝字第1130001號", &config), WorkflowKind::Toxic);
        assert_eq!(WorkflowKind::resolve("002 刑詐防字第1130002號", &config), WorkflowKind::Fraud);
        assert_eq!(WorkflowKind::resolve("003 調資肆字第5號", &config), WorkflowKind::Fraud);
        assert_eq!(WorkflowKind::resolve("004 衛授國字第7號", &config), WorkflowKind::Smoke);
        assert_eq!(WorkflowKind::resolve("005 北市警字第9號", &config), WorkflowKind::Unrecognized);
    }

    #[test]
    fn test_toxic_token_checked_first() {
        let config = config();
        assert_eq!(WorkflowKind::resolve("警署刑毒緝字 刑詐防字 號", &config), WorkflowKind::Toxic);
    }

    #[test]
    fn test_serial_is_first_token() {
        assert_eq!(serial_of("017 刑詐防字第1號"), "017");
        assert_eq!(serial_of("  A12\t其他"), "A12");
        assert_eq!(serial_of(""), "");
    }

    #[test]
    fn test_discover_fraud_folder() {
        let dir = tempdir().unwrap();
        let case = dir.path().join("001 刑詐防字第1130001號");
        fs::create_dir(&case).unwrap();
        fs::write(case.join("附件一.pdf"), b"").unwrap();
        fs::write(case.join("刑詐防字第1130001號.pdf"), b"").unwrap();
        fs::write(case.join("b.csv"), b"domain\n").unwrap();
        fs::write(case.join("a.csv"), b"domain\n").unwrap();
        fs::write(case.join("notes.txt"), b"").unwrap();

        let config = config();
        let folder = CaseFolder::discover(&case, WorkflowKind::Fraud, config.profile(WorkflowKind::Fraud).unwrap()).unwrap();

        assert_eq!(folder.serial, "001");
        assert!(folder.document.ends_with("刑詐防字第1130001號.pdf"));
        assert_eq!(folder.attachments.len(), 1);
        assert_eq!(folder.tables, vec![case.join("a.csv"), case.join("b.csv")]);
    }

    #[test]
    fn test_discover_toxic_takes_first_pdf() {
        let dir = tempdir().unwrap();
        let case = dir.path().join("002 警署刑毒緝字第9號");
        fs::create_dir(&case).unwrap();
        fs::write(case.join("b.pdf"), b"").unwrap();
        fs::write(case.join("a.pdf"), b"").unwrap();
        fs::write(case.join("list.ods"), b"").unwrap();
        fs::write(case.join("ignored.csv"), b"").unwrap();

        let config = config();
        let folder = CaseFolder::discover(&case, WorkflowKind::Toxic, config.profile(WorkflowKind::Toxic).unwrap()).unwrap();

        assert!(folder.document.ends_with("a.pdf"));
        assert_eq!(folder.attachments, vec![case.join("b.pdf")]);
        assert_eq!(folder.tables, vec![case.join("list.ods")]);
    }

    #[test]
    fn test_discover_missing_document_and_tables() {
        let dir = tempdir().unwrap();
        let config = config();
        let profile = config.profile(WorkflowKind::Fraud).unwrap();

        fs::write(dir.path().join("list.csv"), b"domain\n").unwrap();
        fs::write(dir.path().join("attachment.pdf"), b"").unwrap();
        let err = CaseFolder::discover(dir.path(), WorkflowKind::Fraud, profile).unwrap_err();
        assert!(matches!(err, FolderError::MissingDocument { .. }));

        fs::remove_file(dir.path().join("list.csv")).unwrap();
        fs::write(dir.path().join("刑詐防字第1號.pdf"), b"").unwrap();
        let err = CaseFolder::discover(dir.path(), WorkflowKind::Fraud, profile).unwrap_err();
        assert!(matches!(err, FolderError::MissingTables { .. }));
    }

    #[test]
    fn test_discover_skips_generated_lists() {
        let dir = tempdir().unwrap();
        let case = dir.path().join("003 衛授國字第3號");
        fs::create_dir(&case).unwrap();
        fs::write(case.join("衛授國字第3號.pdf"), b"").unwrap();
        fs::write(case.join("list.csv"), b"domain\n").unwrap();
        fs::write(case.join("格式錯誤domain_1130105-003.csv"), b"x\n").unwrap();
        fs::write(case.join("白名單命中domain_1130105-003.csv"), b"x\n").unwrap();

        let config = config();
        let folder = CaseFolder::discover(&case, WorkflowKind::Smoke, config.profile(WorkflowKind::Smoke).unwrap()).unwrap();

        assert_eq!(folder.tables, vec![case.join("list.csv")]);
    }
}

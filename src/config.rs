//! Configuration management for rpzintake
//!
//! All configuration is loaded from `./config/rpzintake.toml`.
//! No hardcoded defaults exist in source code - all defaults are in the config template.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use regex::Regex;

use crate::table::TextEncoding;
use crate::workflow::WorkflowKind;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/rpzintake.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/rpzintake.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid regex pattern '{pattern_name}': {error}\n  Pattern: {pattern}")]
    InvalidRegex {
        pattern_name: String,
        pattern: String,
        error: String,
    },

    #[error("Unsupported text encoding '{0}' in tables.encodings")]
    UnsupportedEncoding(String),

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Workflow profile '{0}' is missing from [workflows]")]
    MissingWorkflow(String),

    #[error("Batch root could not be determined (no Desktop directory); set paths.root")]
    NoBatchRoot,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub batch: BatchConfig,
    pub tables: TablesConfig,
    pub report: ReportConfig,
    pub mail: MailConfig,
    pub workflows: HashMap<String, WorkflowProfile>,
}

/// Reference file and batch root locations
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Batch root; empty resolves to <Desktop>/RPZ/RPZ_auto
    #[serde(default)]
    pub root: String,
    /// TLD table, relative paths resolve against the batch root
    pub tld_table: String,
    /// Whitelist table, relative paths resolve against the working directory
    pub whitelist: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    pub folder_delay_ms: u64,
    pub csv_output_dir: String,
    pub invalid_tld_dir: String,
    pub case_folder_suffix: String,
    pub finished_suffix: String,
    pub error_suffix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TablesConfig {
    pub encodings: Vec<String>,
    pub domain_headers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub request_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub recipients: Vec<String>,
    pub outbox_dir: String,
}

/// What to do with advisory issues once a folder's artifacts are written
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssuePolicy {
    /// Any issue fails the folder and skips the mail step
    Hold,
    /// Issues are logged but never gate the mail step
    Advisory,
}

/// Per-workflow extraction patterns, file layout and reconciliation rules
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowProfile {
    /// Folder-name substrings that select this workflow
    pub folder_tokens: Vec<String>,
    /// File-name suffix of the order document (matched case-insensitively)
    pub document_suffix: String,
    /// Extensions of domain-table sources, without the dot
    pub table_extensions: Vec<String>,
    /// Ordered case-number patterns; first match wins
    pub case_number_patterns: Vec<String>,
    /// Declared-quantity pattern; capture group 1 holds the digits
    #[serde(default)]
    pub quantity_pattern: Option<String>,
    /// Reference-domain pattern; capture group 1 holds the domain
    #[serde(default)]
    pub reference_domain_pattern: Option<String>,
    pub issue_policy: IssuePolicy,
    #[serde(default = "default_send_mail")]
    pub send_mail: bool,
    pub defaults: MetadataDefaults,
}

fn default_send_mail() -> bool {
    true
}

/// Fallback values for metadata columns absent from a workflow's tables
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetadataDefaults {
    pub category: String,
    pub contact_email: String,
    pub legal_basis: String,
    pub requesting_unit: String,
    pub complaint_channel: String,
}

impl WorkflowProfile {
    /// True when this workflow cross-checks the tables against the order text
    pub fn reconciles(&self) -> bool {
        self.quantity_pattern.is_some() || self.reference_domain_pattern.is_some()
    }

    pub fn matches_folder(&self, folder_name: &str) -> bool {
        self.folder_tokens.iter().any(|t| folder_name.contains(t.as_str()))
    }
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.tld_table.trim().is_empty() {
            return Err(ConfigError::EmptyRequired { field: "paths.tld_table".to_string() });
        }
        if self.paths.whitelist.trim().is_empty() {
            return Err(ConfigError::EmptyRequired { field: "paths.whitelist".to_string() });
        }
        if self.batch.csv_output_dir.trim().is_empty() {
            return Err(ConfigError::EmptyRequired { field: "batch.csv_output_dir".to_string() });
        }
        if self.batch.invalid_tld_dir.trim().is_empty() {
            return Err(ConfigError::EmptyRequired { field: "batch.invalid_tld_dir".to_string() });
        }
        if self.tables.domain_headers.is_empty() {
            return Err(ConfigError::EmptyRequired { field: "tables.domain_headers".to_string() });
        }
        if self.tables.encodings.is_empty() {
            return Err(ConfigError::EmptyRequired { field: "tables.encodings".to_string() });
        }
        self.text_encodings()?;

        for kind in WorkflowKind::RECOGNIZED {
            let name = kind.config_key();
            let profile = self
                .workflows
                .get(name)
                .ok_or_else(|| ConfigError::MissingWorkflow(name.to_string()))?;

            if profile.folder_tokens.is_empty() {
                return Err(ConfigError::EmptyRequired {
                    field: format!("workflows.{}.folder_tokens", name),
                });
            }
            if profile.table_extensions.is_empty() {
                return Err(ConfigError::EmptyRequired {
                    field: format!("workflows.{}.table_extensions", name),
                });
            }
            if profile.case_number_patterns.is_empty() {
                return Err(ConfigError::EmptyRequired {
                    field: format!("workflows.{}.case_number_patterns", name),
                });
            }
            for (i, pattern) in profile.case_number_patterns.iter().enumerate() {
                self.validate_regex(&format!("workflows.{}.case_number_patterns[{}]", name, i), pattern)?;
            }
            if let Some(pattern) = &profile.quantity_pattern {
                self.validate_regex(&format!("workflows.{}.quantity_pattern", name), pattern)?;
            }
            if let Some(pattern) = &profile.reference_domain_pattern {
                self.validate_regex(&format!("workflows.{}.reference_domain_pattern", name), pattern)?;
            }
        }

        Ok(())
    }

    fn validate_regex(&self, name: &str, pattern: &str) -> Result<(), ConfigError> {
        Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
            pattern_name: name.to_string(),
            pattern: pattern.to_string(),
            error: e.to_string(),
        })?;
        Ok(())
    }

    /// Parsed encoding fallback list for CSV tables
    pub fn text_encodings(&self) -> Result<Vec<TextEncoding>, ConfigError> {
        self.tables
            .encodings
            .iter()
            .map(|label| {
                TextEncoding::from_label(label)
                    .ok_or_else(|| ConfigError::UnsupportedEncoding(label.clone()))
            })
            .collect()
    }

    /// Profile for a recognized workflow
    pub fn profile(&self, kind: WorkflowKind) -> Option<&WorkflowProfile> {
        self.workflows.get(kind.config_key())
    }

    /// Resolve the batch root, falling back to the Desktop layout
    pub fn batch_root(&self) -> Result<PathBuf, ConfigError> {
        if !self.paths.root.trim().is_empty() {
            return Ok(PathBuf::from(&self.paths.root));
        }
        dirs::desktop_dir()
            .map(|desktop| desktop.join("RPZ").join("RPZ_auto"))
            .ok_or(ConfigError::NoBatchRoot)
    }

    /// TLD table path; relative paths are taken from the batch root
    pub fn tld_table_path(&self, batch_root: &Path) -> PathBuf {
        let path = PathBuf::from(&self.paths.tld_table);
        if path.is_absolute() {
            path
        } else {
            batch_root.join(path)
        }
    }

    /// Whitelist path; relative paths stay relative to the working directory
    pub fn whitelist_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.whitelist)
    }

    pub fn folder_delay(&self) -> Duration {
        Duration::from_millis(self.batch.folder_delay_ms)
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        io::stdin().is_terminal()
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config() -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config()?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}

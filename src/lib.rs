pub mod batch;
pub mod bundle;
pub mod case_id;
pub mod cli;
pub mod config;
pub mod document;
pub mod domain_utils;
pub mod error;
pub mod export;
pub mod logger;
pub mod mail;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod reference;
pub mod table;
pub mod validator;
pub mod workflow;

pub use config::AppConfig;
pub use error::{FolderError, Issue, Outcome};
pub use pipeline::{CasePipeline, CaseReport};
pub use workflow::{CaseFolder, WorkflowKind};

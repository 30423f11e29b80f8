// mail.rs - Outbound mail for processed case folders
//
// No mail client is embedded. A composed message is either dropped into an
// outbox directory as a JSON manifest, for the sending host to pick up, or
// only logged in dry-run mode.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// A composed mail: folder name as subject, artifacts as attachments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

impl OutboundMail {
    pub fn new(recipients: &[String], subject: &str, attachments: Vec<PathBuf>) -> Self {
        Self {
            recipients: recipients.to_vec(),
            subject: subject.to_string(),
            body: String::new(),
            attachments,
        }
    }
}

/// Hands a composed mail to whatever sends it
pub trait MailDispatcher {
    fn dispatch(&self, mail: &OutboundMail) -> Result<()>;
}

/// Writes each mail as `<outbox>/<timestamp>-<serial>.json`
#[derive(Debug)]
pub struct OutboxDispatcher {
    outbox: PathBuf,
    serial: AtomicU64,
}

impl OutboxDispatcher {
    pub fn new(outbox: &Path) -> Self {
        Self { outbox: outbox.to_path_buf(), serial: AtomicU64::new(0) }
    }
}

impl MailDispatcher for OutboxDispatcher {
    fn dispatch(&self, mail: &OutboundMail) -> Result<()> {
        fs::create_dir_all(&self.outbox)
            .with_context(|| format!("Failed to create outbox directory: {}", self.outbox.display()))?;

        let serial = self.serial.fetch_add(1, Ordering::Relaxed);
        let file_name = format!("{}-{:04}.json", Local::now().format("%Y%m%d%H%M%S"), serial);
        let path = self.outbox.join(file_name);

        let json = serde_json::to_string_pretty(mail).context("Failed to serialize mail manifest")?;
        fs::write(&path, json).with_context(|| format!("Failed to write mail manifest: {}", path.display()))?;

        info!("Mail '{}' queued for {} recipient(s): {}", mail.subject, mail.recipients.len(), path.display());
        Ok(())
    }
}

/// Logs the mail and sends nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunDispatcher;

impl MailDispatcher for DryRunDispatcher {
    fn dispatch(&self, mail: &OutboundMail) -> Result<()> {
        info!(
            "[dry-run] Would mail '{}' to {} with {} attachment(s)",
            mail.subject,
            mail.recipients.join("; "),
            mail.attachments.len()
        );
        Ok(())
    }
}

use chrono::{Datelike, NaiveDate};
use csv::Writer;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::FolderError;
use crate::record::{CaseMetadata, DomainRecord};
use crate::validator::ValidationFindings;

pub const CANONICAL_HEADERS: [&str; 10] = [
    "編號",
    "domain",
    "網站性質",
    "承辦人email",
    "法律依據",
    "聲請單位",
    "申訴管道",
    "文號",
    "收文日期",
    "類型",
];

pub const INVALID_TLD_HEADER: &str = "疑似不正確的域名TLD";
pub const MALFORMED_HEADER: &str = "格式錯誤domain";
pub const WHITELIST_HEADER: &str = "白名單命中domain";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// ROC calendar date as `YYYMMDD` (year = Gregorian year - 1911)
pub fn roc_date(date: NaiveDate) -> String {
    format!("{}{:02}{:02}", date.year() - 1911, date.month(), date.day())
}

/// Receipt date as `Y/M/D` without zero padding
pub fn receipt_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.year(), date.month(), date.day())
}

pub fn canonical_file_name(roc: &str, serial: &str) -> String {
    format!("RPZ 1.0 {}-{}.csv", roc, serial)
}

/// Name of a side-channel list written back into the case folder
pub fn side_channel_file_name(header: &str, roc: &str, serial: &str) -> String {
    format!("{}_{}-{}.csv", header, roc, serial)
}

/// True for lists this crate writes into a case folder, which must never be
/// read back as table sources
pub fn is_side_channel_file(file_name: &str) -> bool {
    [MALFORMED_HEADER, WHITELIST_HEADER]
        .into_iter()
        .any(|header| file_name.strip_prefix(header).is_some_and(|rest| rest.starts_with('_')))
}

/// Folder-level values written on the first output row
#[derive(Debug, Clone)]
pub struct ReportHeader<'a> {
    pub metadata: &'a CaseMetadata,
    pub document_number: &'a str,
    pub received: NaiveDate,
    pub request_type: &'a str,
}

/// Output rows in canonical column order; header-context cells only on the first row
pub fn canonical_rows(records: &[DomainRecord], header: &ReportHeader<'_>) -> Vec<Vec<String>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut row = vec![record.index.to_string(), record.domain.clone(), record.category.clone()];
            if i == 0 {
                row.extend([
                    header.metadata.contact_email.clone(),
                    header.metadata.legal_basis.clone(),
                    header.metadata.requesting_unit.clone(),
                    header.metadata.complaint_channel.clone(),
                    header.document_number.to_string(),
                    receipt_date(header.received),
                    header.request_type.to_string(),
                ]);
            } else {
                row.resize(CANONICAL_HEADERS.len(), String::new());
            }
            row
        })
        .collect()
}

/// Write UTF-8 CSV with a byte-order mark, the encoding spreadsheet tools expect
fn write_csv_with_bom<I, R>(path: &Path, headers: &[&str], rows: I) -> Result<(), FolderError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut file = File::create(path).map_err(|e| FolderError::io(path, e))?;
    file.write_all(UTF8_BOM).map_err(|e| FolderError::io(path, e))?;

    let mut wtr = Writer::from_writer(file);
    wtr.write_record(headers).map_err(|e| FolderError::csv(path, e))?;
    for row in rows {
        wtr.write_record(row).map_err(|e| FolderError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| FolderError::io(path, e))?;
    Ok(())
}

pub fn export_canonical_csv(
    records: &[DomainRecord],
    header: &ReportHeader<'_>,
    output_path: &Path,
) -> Result<(), FolderError> {
    debug!("Exporting {} domains to CSV: {}", records.len(), output_path.display());
    write_csv_with_bom(output_path, &CANONICAL_HEADERS, canonical_rows(records, header))?;
    info!("Canonical CSV written: {}", output_path.display());
    Ok(())
}

/// Single-column domain list; nothing is written for an empty list
pub fn export_domain_list(domains: &[String], header: &str, output_path: &Path) -> Result<Option<PathBuf>, FolderError> {
    if domains.is_empty() {
        return Ok(None);
    }
    write_csv_with_bom(output_path, &[header], domains.iter().map(|d| [d.as_str()]))?;
    info!("{} list written ({} entries): {}", header, domains.len(), output_path.display());
    Ok(Some(output_path.to_path_buf()))
}

/// Directories the report artifacts of one intake day land in
#[derive(Debug, Clone)]
pub struct ReportWriter {
    pub csv_dir: PathBuf,
    pub invalid_tld_dir: PathBuf,
    pub request_type: String,
}

/// Paths of the artifacts actually written for one folder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrittenReport {
    pub canonical: PathBuf,
    pub invalid_tld: Option<PathBuf>,
    pub malformed: Option<PathBuf>,
    pub whitelist: Option<PathBuf>,
}

impl ReportWriter {
    pub fn new(intake_dir: &Path, csv_output_dir: &str, invalid_tld_dir: &str, request_type: &str) -> Self {
        Self {
            csv_dir: intake_dir.join(csv_output_dir),
            invalid_tld_dir: intake_dir.join(invalid_tld_dir),
            request_type: request_type.to_string(),
        }
    }

    /// Write the canonical CSV and every non-empty side-channel list
    pub fn write(
        &self,
        case_dir: &Path,
        serial: &str,
        findings: &ValidationFindings,
        metadata: &CaseMetadata,
        document_number: &str,
        today: NaiveDate,
    ) -> Result<WrittenReport, FolderError> {
        let roc = roc_date(today);

        fs::create_dir_all(&self.csv_dir).map_err(|e| FolderError::io(&self.csv_dir, e))?;
        let canonical = self.csv_dir.join(canonical_file_name(&roc, serial));
        let header = ReportHeader {
            metadata,
            document_number,
            received: today,
            request_type: &self.request_type,
        };
        export_canonical_csv(&findings.records, &header, &canonical)?;

        let invalid_tld = if findings.invalid_tlds.is_empty() {
            None
        } else {
            fs::create_dir_all(&self.invalid_tld_dir).map_err(|e| FolderError::io(&self.invalid_tld_dir, e))?;
            let path = self
                .invalid_tld_dir
                .join(format!("{}紀錄_{}-{}.csv", INVALID_TLD_HEADER, roc, serial));
            export_domain_list(&findings.invalid_tlds, INVALID_TLD_HEADER, &path)?
        };

        let malformed = export_domain_list(
            &findings.malformed,
            MALFORMED_HEADER,
            &case_dir.join(side_channel_file_name(MALFORMED_HEADER, &roc, serial)),
        )?;
        let whitelist = export_domain_list(
            &findings.whitelist_hits,
            WHITELIST_HEADER,
            &case_dir.join(side_channel_file_name(WHITELIST_HEADER, &roc, serial)),
        )?;

        Ok(WrittenReport { canonical, invalid_tld, malformed, whitelist })
    }
}

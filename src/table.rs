//! Domain table loading and normalization
//!
//! Case folders carry domain lists as CSV exports or spreadsheets whose
//! headers vary between agencies and even between pages of one export.
//! This module:
//! - decodes CSV files through an ordered encoding fallback list
//! - reads the first worksheet of `.ods`/`.xlsx`/`.xls` workbooks
//! - locates the domain column under its accepted spellings
//! - reindexes every table onto the first non-empty table's columns
//! - maps known metadata columns once per table into a canonical row

use calamine::{open_workbook_auto, Data, Reader};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::domain_utils::normalize_domain;
use crate::error::FolderError;

pub const CATEGORY_COLUMN: &str = "網站性質";
pub const CONTACT_EMAIL_COLUMNS: &[&str] = &["承辦人email", "警政署承辦人E-mail"];
pub const LEGAL_BASIS_COLUMN: &str = "法律依據";
pub const REQUESTING_UNIT_COLUMN: &str = "聲請單位";
pub const COMPLAINT_CHANNEL_COLUMN: &str = "申訴管道";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encodings accepted for CSV tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8 with an optional byte-order mark
    Utf8Sig,
    Utf8,
    /// Windows Traditional Chinese code page
    Cp950,
    Big5,
}

impl TextEncoding {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().replace('_', "-").as_str() {
            "utf-8-sig" | "utf8-sig" => Some(Self::Utf8Sig),
            "utf-8" | "utf8" => Some(Self::Utf8),
            "cp950" | "windows-950" => Some(Self::Cp950),
            "big5" | "big5-hkscs" => Some(Self::Big5),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8Sig => "utf-8-sig",
            Self::Utf8 => "utf-8",
            Self::Cp950 => "cp950",
            Self::Big5 => "big5",
        }
    }

    /// Strict decode; `None` when the bytes are not valid in this encoding
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_string)
            }
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            // encoding_rs' Big5 is the WHATWG superset that also covers cp950
            Self::Cp950 | Self::Big5 => encoding_rs::BIG5
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
        }
    }
}

/// Kind of table source, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Spreadsheet,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref() {
            Some("csv") => Some(Self::Csv),
            Some("ods") | Some("xlsx") | Some("xls") | Some("xlsm") => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

/// Header row plus data rows, every row the same width as the header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table, trimming headers and squaring ragged rows to the header width
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let width = headers.len();
        let rows = rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Parse CSV text with a header row
pub fn parse_csv(text: &str) -> Result<RawTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format!("Failed to read CSV headers: {}", e))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err("CSV has no header row".to_string());
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| format!("Failed to parse CSV record: {}", e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable::new(headers, rows))
}

/// Read a CSV file, trying each encoding in order until one decodes and parses
pub fn read_csv_table(path: &Path, encodings: &[TextEncoding]) -> Result<RawTable, FolderError> {
    let bytes = fs::read(path).map_err(|e| FolderError::io(path, e))?;

    for encoding in encodings {
        let Some(text) = encoding.decode(&bytes) else {
            debug!("{} is not valid {}", path.display(), encoding.label());
            continue;
        };
        match parse_csv(&text) {
            Ok(table) => {
                debug!(
                    "Read {} as {} ({} columns, {} rows)",
                    path.display(),
                    encoding.label(),
                    table.headers.len(),
                    table.rows.len()
                );
                return Ok(table);
            }
            Err(e) => debug!("{} decoded as {} but did not parse: {}", path.display(), encoding.label(), e),
        }
    }

    Err(FolderError::UnreadableTable {
        path: path.to_path_buf(),
        tried: encodings.iter().map(|e| e.label()).collect::<Vec<_>>().join(", "),
    })
}

/// Read the first worksheet of a workbook; the first row is the header
pub fn read_sheet_table(path: &Path) -> Result<RawTable, FolderError> {
    let spreadsheet_err = |reason: String| FolderError::Spreadsheet { path: path.to_path_buf(), reason };

    let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_err(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| spreadsheet_err("no worksheet found".to_string()))?
        .map_err(|e| spreadsheet_err(e.to_string()))?;

    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
    let headers = rows.next().unwrap_or_default();
    Ok(RawTable::new(headers, rows.collect()))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Index of the domain column, matched trimmed and case-insensitively
pub fn find_domain_column(headers: &[String], accepted: &[String]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim().to_lowercase();
        accepted.iter().any(|a| a.trim().to_lowercase() == h)
    })
}

/// Reindex `table` onto `columns`: missing columns become empty, extra columns are dropped.
/// The table's own domain column is carried into `columns[domain_target]` regardless of spelling.
pub fn align_table(table: &RawTable, domain_col: usize, columns: &[String], domain_target: usize) -> RawTable {
    let mapping: Vec<Option<usize>> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i == domain_target {
                Some(domain_col)
            } else {
                table.column(name).filter(|&j| j != domain_col)
            }
        })
        .collect();

    let rows = table
        .rows
        .iter()
        .map(|row| {
            mapping
                .iter()
                .map(|src| src.and_then(|j| row.get(j)).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    RawTable { headers: columns.to_vec(), rows }
}

/// Row in the canonical schema; metadata is `None` when the column is absent or blank
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRow {
    pub domain: String,
    pub category: Option<String>,
    pub contact_email: Option<String>,
    pub legal_basis: Option<String>,
    pub requesting_unit: Option<String>,
    pub complaint_channel: Option<String>,
}

/// Column indices of the canonical fields within one table
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMap {
    pub domain: usize,
    pub category: Option<usize>,
    pub contact_email: Option<usize>,
    pub legal_basis: Option<usize>,
    pub requesting_unit: Option<usize>,
    pub complaint_channel: Option<usize>,
}

impl SchemaMap {
    pub fn resolve(headers: &[String], domain: usize) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            domain,
            category: find(CATEGORY_COLUMN),
            contact_email: CONTACT_EMAIL_COLUMNS.iter().find_map(|name| find(name)),
            legal_basis: find(LEGAL_BASIS_COLUMN),
            requesting_unit: find(REQUESTING_UNIT_COLUMN),
            complaint_channel: find(COMPLAINT_CHANNEL_COLUMN),
        }
    }

    pub fn map_row(&self, row: &[String]) -> CanonicalRow {
        let field = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        CanonicalRow {
            domain: normalize_domain(row.get(self.domain).map(String::as_str).unwrap_or("")),
            category: field(self.category),
            contact_email: field(self.contact_email).map(|e| e.to_lowercase()),
            legal_basis: field(self.legal_basis),
            requesting_unit: field(self.requesting_unit),
            complaint_channel: field(self.complaint_channel),
        }
    }
}

/// Reads and merges the domain tables of one case folder
#[derive(Debug, Clone)]
pub struct TableNormalizer {
    encodings: Vec<TextEncoding>,
    domain_headers: Vec<String>,
}

impl TableNormalizer {
    pub fn new(encodings: Vec<TextEncoding>, domain_headers: Vec<String>) -> Self {
        Self { encodings, domain_headers }
    }

    pub fn load(&self, path: &Path) -> Result<RawTable, FolderError> {
        match SourceFormat::from_path(path) {
            Some(SourceFormat::Spreadsheet) => read_sheet_table(path),
            _ => read_csv_table(path, &self.encodings),
        }
    }

    /// Load every source in order and merge them into canonical rows
    pub fn normalize(&self, sources: &[PathBuf]) -> Result<Vec<CanonicalRow>, FolderError> {
        let mut tables = Vec::with_capacity(sources.len());
        for path in sources {
            tables.push((path.clone(), self.load(path)?));
        }
        self.merge(tables)
    }

    /// Merge already-loaded tables, preserving source and row order without de-duplication
    pub fn merge(&self, tables: Vec<(PathBuf, RawTable)>) -> Result<Vec<CanonicalRow>, FolderError> {
        let mut standard: Option<(Vec<String>, SchemaMap)> = None;
        let mut rows = Vec::new();

        for (path, table) in tables {
            let domain_col = find_domain_column(&table.headers, &self.domain_headers).ok_or_else(|| {
                FolderError::MissingDomainColumn {
                    path: path.clone(),
                    headers: table.headers.join(", "),
                }
            })?;

            if table.is_empty() {
                warn!("Table {} has no rows, skipping", path.display());
                continue;
            }

            let (columns, schema) = standard.get_or_insert_with(|| {
                let schema = SchemaMap::resolve(&table.headers, domain_col);
                (table.headers.clone(), schema)
            });

            let aligned = align_table(&table, domain_col, columns, schema.domain);
            debug!("Merged {} rows from {}", aligned.rows.len(), path.display());
            rows.extend(aligned.rows.iter().map(|row| schema.map_row(row)));
        }

        Ok(rows)
    }
}

use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use rpzintake::config::{AppConfig, DEFAULT_CONFIG};
use rpzintake::document::DocumentReader;
use rpzintake::error::ExtractionError;
use rpzintake::mail::{MailDispatcher, OutboundMail};

pub const TLDS_CSV: &str = "Type,TLD\ngeneric,com\ngeneric,net\ncountry-code,tw\n";
pub const WHITELIST_CSV: &str = "domain\ngov.tw\ngoogle.com\n";

/// Reads the "order document" as plain UTF-8 text, so fixtures can hold
/// readable order text under a `.pdf` name.
#[derive(Debug, Default)]
pub struct PlainTextReader;

impl DocumentReader for PlainTextReader {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        fs::read_to_string(path).map_err(|e| ExtractionError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Keeps every dispatched mail in memory
#[derive(Debug, Default)]
pub struct RecordingMailer {
    pub sent: RefCell<Vec<OutboundMail>>,
}

impl MailDispatcher for RecordingMailer {
    fn dispatch(&self, mail: &OutboundMail) -> anyhow::Result<()> {
        self.sent.borrow_mut().push(mail.clone());
        Ok(())
    }
}

impl RecordingMailer {
    pub fn count(&self) -> usize {
        self.sent.borrow().len()
    }
}

/// Default config rooted at `root`, no pacing delay, toxic tables read as CSV
pub fn test_config(root: &Path) -> AppConfig {
    let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).expect("default config should parse");
    config.paths.root = root.display().to_string();
    config.paths.whitelist = root.join("白名單.csv").display().to_string();
    config.batch.folder_delay_ms = 0;
    if let Some(toxic) = config.workflows.get_mut("toxic") {
        toxic.table_extensions = vec!["csv".to_string()];
    }
    config
}

/// Write the TLD table and whitelist into the batch root
pub fn write_reference_files(root: &Path) {
    fs::create_dir_all(root).unwrap();
    fs::write(root.join("TLDs.csv"), TLDS_CSV).unwrap();
    fs::write(root.join("白名單.csv"), WHITELIST_CSV).unwrap();
}

/// Create a case folder holding an order document and the given tables
pub fn write_case(intake: &Path, name: &str, document: (&str, &str), tables: &[(&str, &str)]) -> PathBuf {
    let folder = intake.join(name);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join(document.0), document.1).unwrap();
    for (file, content) in tables {
        fs::write(folder.join(file), content).unwrap();
    }
    folder
}

/// Canonical CSV content without its byte-order mark
pub fn read_output(path: &Path) -> String {
    let text = fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    text.trim_start_matches('\u{feff}').to_string()
}

/// Parse CSV text into rows of cells, header included
pub fn csv_rows(text: &str) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

const ODS_MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

const ODS_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">
 <manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>
 <manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>
"#;

fn ods_cell(value: &str) -> String {
    if value.is_empty() {
        "<table:table-cell/>".to_string()
    } else if value.parse::<f64>().is_ok() {
        format!(r#"<table:table-cell office:value-type="float" office:value="{0}"><text:p>{0}</text:p></table:table-cell>"#, value)
    } else {
        format!(r#"<table:table-cell office:value-type="string"><text:p>{}</text:p></table:table-cell>"#, value)
    }
}

/// Write a one-sheet OpenDocument spreadsheet; cells that parse as numbers
/// are stored as float cells, the way a spreadsheet app saves a 編號 column
pub fn write_ods(path: &Path, rows: &[&[&str]]) {
    let mut body = String::new();
    for row in rows {
        body.push_str("<table:table-row>");
        for cell in row.iter() {
            body.push_str(&ods_cell(cell));
        }
        body.push_str("</table:table-row>");
    }
    let content = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" office:version="1.2"><office:body><office:spreadsheet><table:table table:name="工作表1">{}</table:table></office:spreadsheet></office:body></office:document-content>"#,
        body
    );

    let mut zip = ZipWriter::new(fs::File::create(path).unwrap());
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in [
        ("mimetype", ODS_MIMETYPE),
        ("META-INF/manifest.xml", ODS_MANIFEST),
        ("content.xml", content.as_str()),
    ] {
        zip.start_file(name, stored).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

//! ZIP bundle of a case folder's source files

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::FolderError;

/// Bundle file name: the first table's name up to its first dot, plus `.zip`
pub fn bundle_name(first_table: &Path) -> String {
    let name = first_table.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    format!("{}.zip", stem)
}

/// Write a deflate ZIP at `output_path`; each file is stored under its bare name
pub fn write_bundle(output_path: &Path, files: &[PathBuf]) -> Result<PathBuf, FolderError> {
    let bundle_err = |reason: String| FolderError::Bundle { path: output_path.to_path_buf(), reason };

    let file = File::create(output_path).map_err(|e| FolderError::io(output_path, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| bundle_err(format!("{} has no file name", path.display())))?;
        zip.start_file(name, options).map_err(|e| bundle_err(e.to_string()))?;
        let mut source = File::open(path).map_err(|e| FolderError::io(path, e))?;
        io::copy(&mut source, &mut zip).map_err(|e| FolderError::io(path, e))?;
    }

    zip.finish().map_err(|e| bundle_err(e.to_string()))?;
    info!("Bundle written with {} file(s): {}", files.len(), output_path.display());
    Ok(output_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_bundle_name_stops_at_first_dot() {
        assert_eq!(bundle_name(Path::new("/x/名單.2024.01.csv")), "名單.zip");
        assert_eq!(bundle_name(Path::new("list.ods")), "list.zip");
    }

    #[test]
    fn test_bundle_contains_bare_names() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("case");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("order.pdf"), b"%PDF").unwrap();
        fs::write(sub.join("list.csv"), "domain\na.com\n").unwrap();

        let out = sub.join("list.zip");
        write_bundle(&out, &[sub.join("order.pdf"), sub.join("list.csv")]).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive.by_name("list.csv").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "domain\na.com\n");
        assert!(archive.by_name("order.pdf").is_ok());
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = tempdir().unwrap();
        let err = write_bundle(&dir.path().join("b.zip"), &[dir.path().join("absent.pdf")]).unwrap_err();
        assert!(matches!(err, FolderError::Io { .. }));
    }
}

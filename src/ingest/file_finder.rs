use crate::constants::XML_EXTENSIONS;
use crate::errors::{IngestError, IngestResult};
use std::path::{Path, PathBuf};

/// Resolves an input path to the XML files it names.
///
/// A file is returned as-is, whatever its extension. A directory is walked
/// recursively and every `.xml` file (case-insensitive) is collected, sorted by
/// path so runs are reproducible.
///
/// # Errors
///
/// Returns `Io` if the path does not exist and `InvalidInput` if a directory
/// contains no XML files.
pub fn find_xml_files(path: &Path) -> IngestResult<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(IngestError::Io(format!("Input path {path:?} does not exist")));
    }

    let mut files = collect_xmls(path);
    if files.is_empty() {
        return Err(IngestError::InvalidInput(format!(
            "No XML files found under {path:?}"
        )));
    }
    files.sort();
    Ok(files)
}

fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| XML_EXTENSIONS.iter().any(|x| ext.eq_ignore_ascii_case(x)))
}

/// XML files anywhere under `dir`. Unreadable entries are skipped.
fn collect_xmls(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file() && has_xml_extension(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

use crate::errors::{IngestError, IngestResult};
use crate::ingest::table::Table;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

/// Writes a table to a Parquet file, creating parent directories as needed.
///
/// Returns the size of the written file in bytes.
///
/// # Errors
///
/// Returns `Io` if the file or its directory cannot be created and `Table` if
/// the DataFrame conversion or the Parquet encoding fails.
pub fn write_parquet(table: &Table, path: &Path) -> IngestResult<u64> {
    let mut df = table.to_dataframe()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| IngestError::Io(format!("Failed to create output directory: {e}")))?;
    }

    let mut file = File::create(path)
        .map_err(|e| IngestError::Io(format!("Failed to create Parquet file {path:?}: {e}")))?;

    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .map_err(|e| IngestError::Table(format!("Failed to write Parquet file: {e}")))?;

    let metadata = fs::metadata(path).map_err(|e| {
        IngestError::Io(format!("Failed to read Parquet file metadata {path:?}: {e}"))
    })?;

    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        bytes = metadata.len(),
        "Parquet file written"
    );
    Ok(metadata.len())
}

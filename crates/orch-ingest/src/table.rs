//! Raw and parquet table readers, trimmed from `sdtm_ingest::csv_table`
//! down to a plain Polars `DataFrame` load — no row-identity hashing, no
//! double-header handling, since the orchestrator treats the frame as an
//! opaque input for agents/the comparator rather than as first-class
//! domain rows.

use std::path::Path;

use polars::prelude::*;

use crate::error::{IngestError, Result};

/// Reads a raw submission CSV into a `DataFrame`, inferring the schema
/// and treating every column as read eagerly (callers needing the lazy
/// scan can build their own `LazyCsvReader` against `path`).
pub fn read_csv_table(path: &Path) -> Result<DataFrame> {
    LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()
        .and_then(LazyFrame::collect)
        .map_err(|source| IngestError::TableRead {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads a production/QC parquet dataset produced by a generated
/// programming script.
pub fn read_parquet_table(path: &Path) -> Result<DataFrame> {
    LazyFrame::scan_parquet(path, ScanArgsParquet::default())
        .and_then(LazyFrame::collect)
        .map_err(|source| IngestError::TableRead {
            path: path.to_path_buf(),
            source,
        })
}

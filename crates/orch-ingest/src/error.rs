use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("raw input directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },
    #[error("could not read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read table at {path}: {source}")]
    TableRead {
        path: PathBuf,
        #[source]
        source: polars::error::PolarsError,
    },
}

pub type Result<T> = std::result::Result<T, IngestError>;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IgError {
    #[error("could not read IG content directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed IG content file {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, IgError>;

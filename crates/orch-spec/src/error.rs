use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("could not read spec at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse spec at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not write spec at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no draft spec found for domain {domain}")]
    DraftNotFound { domain: String },
    #[error("no approved spec found for domain {domain}")]
    ApprovedNotFound { domain: String },
}

pub type Result<T> = std::result::Result<T, SpecError>;

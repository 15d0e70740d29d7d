use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CtError {
    #[error("vocabulary service request for codelist {code} failed: {source}")]
    Network {
        code: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("vocabulary service returned {status} for codelist {code}: {body}")]
    Service {
        code: String,
        status: u16,
        body: String,
    },
    #[error("vocabulary service has no codelist {code}")]
    NotFound { code: String },
    #[error("could not read CT overlay table {path}: {source}")]
    OverlayRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse CT overlay table {path}: {source}")]
    OverlayParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, CtError>;

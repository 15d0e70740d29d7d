use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("model service at {endpoint} returned {status}: {body}")]
    Service {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("could not write prompt log at {path}: {source}")]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no template available for domain {domain}")]
    NoTemplate { domain: String },
}

pub type Result<T> = std::result::Result<T, LlmError>;

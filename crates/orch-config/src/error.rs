use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("required path {role} does not resolve to an existing directory: {path}")]
    MissingPath { role: String, path: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("could not read function registry manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse function registry manifest {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unsupported manifest schema: {schema:?} (schema_version {schema_version})")]
    UnsupportedSchema { schema: String, schema_version: u32 },
    #[error("duplicate function name in manifest: {name}")]
    DuplicateFunction { name: String },
    #[error("function {name:?} depends on unknown function {dependency:?}")]
    UnknownDependency { name: String, dependency: String },
    #[error("function registry contains a dependency cycle involving: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },
    #[error("function {name:?} is not present in the registry")]
    NotFound { name: String },
}

pub type Result<T> = std::result::Result<T, RegistryError>;

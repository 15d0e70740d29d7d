//! Conventions Manager: loads base + study convention files (pre-configured
//! decisions with rationale and source attribution), merged per key with
//! study precedence (`SPEC_FULL.md` §4.9). Consulted only at the
//! human-review gate and by the spec-builder for defaulting — it never
//! writes, unlike the Memory Store.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConventionsError {
    #[error("could not read conventions file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse conventions file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConventionsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Company,
    Study,
}

/// A single pre-configured convention: a recommended option with its
/// justification and where it came from.
#[derive(Debug, Clone)]
pub struct Convention {
    pub recommended_option: String,
    pub rationale: String,
    pub source: Source,
}

#[derive(Debug, Clone, Deserialize)]
struct ConventionsFile {
    #[serde(default)]
    conventions: BTreeMap<String, RawConvention>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawConvention {
    recommended_option: String,
    rationale: String,
}

fn load_file(path: &Path) -> Result<BTreeMap<String, RawConvention>> {
    let text = fs::read_to_string(path).map_err(|source| ConventionsError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let file: ConventionsFile = toml::from_str(&text).map_err(|source| ConventionsError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(file.conventions)
}

/// The merged view of company and study conventions for one run.
#[derive(Debug, Clone, Default)]
pub struct ConventionsStore {
    entries: BTreeMap<String, Convention>,
}

impl ConventionsStore {
    /// Loads the base (company) file, then the study overlay if present,
    /// with the study entry for a given key replacing the company entry
    /// for that key entirely (§4.9: "merges per key with study
    /// precedence").
    pub fn load(base_path: &Path, study_path: Option<&Path>) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (key, raw) in load_file(base_path)? {
            entries.insert(
                key,
                Convention {
                    recommended_option: raw.recommended_option,
                    rationale: raw.rationale,
                    source: Source::Company,
                },
            );
        }
        if let Some(study_path) = study_path {
            if study_path.exists() {
                for (key, raw) in load_file(study_path)? {
                    entries.insert(
                        key,
                        Convention {
                            recommended_option: raw.recommended_option,
                            rationale: raw.rationale,
                            source: Source::Study,
                        },
                    );
                }
            }
        }
        Ok(Self { entries })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Convention> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Convention)> {
        self.entries.iter()
    }
}

//! Study-specific abbreviation mappings missing from the vocabulary
//! service, modeled on `sdtm_model::ct::Codelist`'s case-insensitive
//! synonym lookup but kept as a flat local table (§4.7).

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CtError, Result};

#[derive(Debug, serde::Deserialize)]
struct OverlayRow {
    codelist_code: String,
    alias: String,
    submission_value: String,
}

/// Case-insensitive `(codelist_code, alias) -> submission_value` lookup.
#[derive(Debug, Clone, Default)]
pub struct OverlayTable {
    entries: BTreeMap<(String, String), String>,
}

impl OverlayTable {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|source| match source.into_kind() {
            csv::ErrorKind::Io(io_err) => CtError::OverlayRead {
                path: path.to_path_buf(),
                source: io_err,
            },
            other => CtError::OverlayParse {
                path: path.to_path_buf(),
                source: csv::Error::from(other),
            },
        })?;
        let mut entries = BTreeMap::new();
        for row in reader.deserialize::<OverlayRow>() {
            let row = row.map_err(|source| CtError::OverlayParse {
                path: path.to_path_buf(),
                source,
            })?;
            entries.insert(
                (row.codelist_code.to_uppercase(), row.alias.to_uppercase()),
                row.submission_value,
            );
        }
        Ok(Self { entries })
    }

    #[must_use]
    pub fn lookup(&self, codelist_code: &str, alias: &str) -> Option<&str> {
        self.entries
            .get(&(codelist_code.to_uppercase(), alias.to_uppercase()))
            .map(String::as_str)
    }

    /// Whether the overlay carries any synonym entries for `codelist_code`,
    /// regardless of alias.
    #[must_use]
    pub fn has_codelist(&self, codelist_code: &str) -> bool {
        let code = codelist_code.to_uppercase();
        self.entries.keys().any(|(c, _)| *c == code)
    }
}

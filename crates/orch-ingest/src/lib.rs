pub mod discovery;
pub mod error;
pub mod polars_utils;
pub mod table;

pub use discovery::{group_by_domain, list_csv_files};
pub use error::{IngestError, Result};
pub use polars_utils::{any_to_f64, any_to_i64, any_to_string, any_to_string_non_empty, format_numeric};
pub use table::{read_csv_table, read_parquet_table};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;

/// A raw input table discovered on disk but not yet loaded into memory.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub domain: String,
    pub path: PathBuf,
}

/// Discovers all raw CSV files under `dir` whose filename stem matches one
/// of `known_domains`, returning them sorted by domain code.
pub fn discover_files(dir: &Path, known_domains: &[String]) -> Result<Vec<DiscoveredFile>> {
    let files = list_csv_files(dir)?;
    let grouped = group_by_domain(&files, known_domains);
    let mut discovered = Vec::new();
    for (domain, paths) in grouped {
        for path in paths {
            discovered.push(DiscoveredFile {
                domain: domain.clone(),
                path,
            });
        }
    }
    Ok(discovered)
}

/// Loads every discovered file into a domain-keyed map of `DataFrame`s.
pub fn load_raw_tables(files: &[DiscoveredFile]) -> Result<BTreeMap<String, DataFrame>> {
    let mut tables = BTreeMap::new();
    for file in files {
        let df = read_csv_table(&file.path)?;
        tables.insert(file.domain.clone(), df);
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_and_loads_known_domains_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("DM.csv"), "USUBJID\n001\n").unwrap();
        std::fs::write(dir.path().join("scratch.csv"), "X\n1\n").unwrap();

        let known = vec!["DM".to_string(), "AE".to_string()];
        let discovered = discover_files(dir.path(), &known).unwrap();
        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].domain, "DM");

        let tables = load_raw_tables(&discovered).unwrap();
        assert!(tables.contains_key("DM"));
        assert_eq!(tables["DM"].height(), 1);
    }
}

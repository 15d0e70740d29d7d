//! Raw tabular input discovery, trimmed from the teacher's
//! `sdtm_ingest::discovery` (domain-variant suffix matching and metadata-
//! file skipping are SDTM-specific and not part of this crate's job —
//! domain assignment here is a plain filename-to-domain-code match).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};

pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|source| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Groups discovered CSV files by the domain code their filename stem
/// matches exactly (case-insensitive), ignoring files that match none of
/// `known_domains`.
pub fn group_by_domain(files: &[PathBuf], known_domains: &[String]) -> BTreeMap<String, Vec<PathBuf>> {
    let known: Vec<String> = known_domains.iter().map(|d| d.to_uppercase()).collect();
    let mut grouped: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let stem_upper = stem.to_uppercase();
        if known.contains(&stem_upper) {
            grouped.entry(stem_upper).or_default().push(path.clone());
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_csv_files_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("DM.csv"), "a\n1\n").unwrap();
        std::fs::write(dir.path().join("AE.csv"), "a\n1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let files = list_csv_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["AE.csv".to_string(), "DM.csv".to_string()]);
    }

    #[test]
    fn groups_by_exact_domain_match_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let dm = dir.path().join("dm.csv");
        std::fs::write(&dm, "a\n1\n").unwrap();
        let unknown = dir.path().join("zz.csv");
        std::fs::write(&unknown, "a\n1\n").unwrap();

        let files = vec![dm, unknown];
        let grouped = group_by_domain(&files, &["DM".to_string(), "AE".to_string()]);
        assert_eq!(grouped.len(), 1);
        assert!(grouped.contains_key("DM"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let result = list_csv_files(Path::new("/does/not/exist"));
        assert!(matches!(result, Err(IngestError::DirectoryNotFound { .. })));
    }
}

//! Comparator (`SPEC_FULL.md` §4.11): column-wise diff of two tabular
//! outputs, aligned on an identity key. Grounded on
//! `sdtm_validate::validator::Validator`'s `DataFrame`/`AnyValue`
//! iteration style and `orch_ingest::any_to_string` for stringified
//! sampling — structural mismatches (missing columns, differing row/
//! column counts) are always reported, never silently normalized away.

pub mod error;

use std::collections::{BTreeMap, BTreeSet};

pub use error::{CompareError, Result};
use orch_ingest::{any_to_f64, any_to_string};
use orch_model::{ColumnDiff, ComparisonReport, SampleMismatch, Side, StructuralMismatch};
use polars::prelude::{AnyValue, DataFrame, DataType as PolarsDataType};

pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct CompareConfig {
    pub identity_key: String,
    /// Tolerance for float columns; exact (`0.0`) by default (§9 Open
    /// Question 2). Integer/string/bool columns are always exact.
    pub float_epsilon: f64,
    pub max_samples: usize,
}

impl CompareConfig {
    #[must_use]
    pub fn new(identity_key: impl Into<String>) -> Self {
        Self {
            identity_key: identity_key.into(),
            float_epsilon: 0.0,
            max_samples: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

pub fn compare(production: &DataFrame, qc: &DataFrame, config: &CompareConfig) -> Result<ComparisonReport> {
    if production.column(&config.identity_key).is_err() {
        return Err(CompareError::MissingIdentityKey {
            side: "production",
            key: config.identity_key.clone(),
        });
    }
    if qc.column(&config.identity_key).is_err() {
        return Err(CompareError::MissingIdentityKey {
            side: "qc",
            key: config.identity_key.clone(),
        });
    }

    let production_columns: BTreeSet<String> = column_names(production);
    let qc_columns: BTreeSet<String> = column_names(qc);

    let mut structural_mismatches = Vec::new();
    for column in production_columns.difference(&qc_columns) {
        structural_mismatches.push(StructuralMismatch::MissingColumn {
            side: Side::Qc,
            column: column.clone(),
        });
    }
    for column in qc_columns.difference(&production_columns) {
        structural_mismatches.push(StructuralMismatch::MissingColumn {
            side: Side::Production,
            column: column.clone(),
        });
    }
    if production_columns.len() != qc_columns.len() {
        structural_mismatches.push(StructuralMismatch::ColumnCountMismatch {
            production: production_columns.len(),
            qc: qc_columns.len(),
        });
    }
    if production.height() != qc.height() {
        structural_mismatches.push(StructuralMismatch::RowCountMismatch {
            production: production.height(),
            qc: qc.height(),
        });
    }

    let production_index = index_by_identity(production, &config.identity_key);
    let qc_index = index_by_identity(qc, &config.identity_key);
    let common_keys: Vec<&String> = production_index.keys().filter(|k| qc_index.contains_key(*k)).collect();

    let common_columns: Vec<&String> = production_columns
        .intersection(&qc_columns)
        .filter(|c| **c != config.identity_key)
        .collect();

    let mut column_diffs = Vec::with_capacity(common_columns.len());
    for column in common_columns {
        let production_series = production.column(column).expect("column in production_columns");
        let qc_series = qc.column(column).expect("column in qc_columns");
        let is_float = matches!(
            production_series.dtype(),
            PolarsDataType::Float32 | PolarsDataType::Float64
        );

        let mut mismatch_count = 0u64;
        let mut samples = Vec::new();
        for key in &common_keys {
            let production_row = production_index[*key];
            let qc_row = qc_index[*key];
            let production_value = production_series.get(production_row).unwrap_or(AnyValue::Null);
            let qc_value = qc_series.get(qc_row).unwrap_or(AnyValue::Null);

            let matches = if is_float {
                match (any_to_f64(&production_value), any_to_f64(&qc_value)) {
                    (Some(p), Some(q)) => (p - q).abs() <= config.float_epsilon,
                    (None, None) => true,
                    _ => false,
                }
            } else {
                any_to_string(&production_value) == any_to_string(&qc_value)
            };

            if !matches {
                mismatch_count += 1;
                if samples.len() < config.max_samples {
                    samples.push(SampleMismatch {
                        row_key: (*key).clone(),
                        production_value: any_to_string(&production_value),
                        qc_value: any_to_string(&qc_value),
                    });
                }
            }
        }

        column_diffs.push(ColumnDiff {
            column: column.clone(),
            mismatch_count,
            samples,
        });
    }

    Ok(ComparisonReport {
        structural_mismatches,
        column_diffs,
        rows_compared: common_keys.len() as u64,
    })
}

fn column_names(df: &DataFrame) -> BTreeSet<String> {
    df.get_column_names_owned().into_iter().map(|name| name.to_string()).collect()
}

/// First-occurrence index from stringified identity-key value to row
/// position, used to align production/QC rows that may be in different
/// physical order.
fn index_by_identity(df: &DataFrame, identity_key: &str) -> BTreeMap<String, usize> {
    let mut index = BTreeMap::new();
    let Ok(series) = df.column(identity_key) else {
        return index;
    };
    for row in 0..df.height() {
        let value = any_to_string(&series.get(row).unwrap_or(AnyValue::Null));
        index.entry(value).or_insert(row);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn identical_frames_match() {
        let production = df! {
            "USUBJID" => ["001", "002"],
            "AGE" => [34i64, 41i64],
        }
        .unwrap();
        let qc = production.clone();
        let report = compare(&production, &qc, &CompareConfig::new("USUBJID")).unwrap();
        assert!(report.is_match());
        assert_eq!(report.rows_compared, 2);
    }

    #[test]
    fn a_value_mismatch_is_reported_with_a_sample() {
        let production = df! {
            "USUBJID" => ["001", "002"],
            "AGE" => [34i64, 41i64],
        }
        .unwrap();
        let qc = df! {
            "USUBJID" => ["001", "002"],
            "AGE" => [34i64, 99i64],
        }
        .unwrap();
        let report = compare(&production, &qc, &CompareConfig::new("USUBJID")).unwrap();
        assert!(!report.is_match());
        assert_eq!(report.total_value_mismatches(), 1);
        let age_diff = report.column_diffs.iter().find(|d| d.column == "AGE").unwrap();
        assert_eq!(age_diff.samples[0].row_key, "002");
    }

    #[test]
    fn missing_column_is_a_structural_mismatch_not_a_value_mismatch() {
        let production = df! {
            "USUBJID" => ["001"],
            "AGE" => [34i64],
            "SEX" => ["F"],
        }
        .unwrap();
        let qc = df! {
            "USUBJID" => ["001"],
            "AGE" => [34i64],
        }
        .unwrap();
        let report = compare(&production, &qc, &CompareConfig::new("USUBJID")).unwrap();
        assert!(!report.is_match());
        assert!(report
            .structural_mismatches
            .iter()
            .any(|m| matches!(m, StructuralMismatch::MissingColumn { side: Side::Qc, column } if column == "SEX")));
    }

    #[test]
    fn float_epsilon_tolerates_small_differences() {
        let production = df! {
            "USUBJID" => ["001"],
            "SCORE" => [1.000001f64],
        }
        .unwrap();
        let qc = df! {
            "USUBJID" => ["001"],
            "SCORE" => [1.000002f64],
        }
        .unwrap();
        let mut config = CompareConfig::new("USUBJID");
        config.float_epsilon = 0.0001;
        let report = compare(&production, &qc, &config).unwrap();
        assert!(report.is_match());
    }

    #[test]
    fn missing_identity_key_is_an_error() {
        let production = df! { "AGE" => [34i64] }.unwrap();
        let qc = df! { "AGE" => [34i64] }.unwrap();
        let result = compare(&production, &qc, &CompareConfig::new("USUBJID"));
        assert!(result.is_err());
    }
}

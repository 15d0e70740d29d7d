//! Report shape produced by the Comparator (`SPEC_FULL.md` §4.11).

use serde::{Deserialize, Serialize};

/// A structural difference between production and QC output: never
/// normalized away, always reported distinctly from value mismatches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StructuralMismatch {
    MissingColumn { side: Side, column: String },
    ColumnCountMismatch { production: usize, qc: usize },
    RowCountMismatch { production: usize, qc: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Production,
    Qc,
}

/// One sample row where a column's values disagreed, for operator triage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleMismatch {
    pub row_key: String,
    pub production_value: String,
    pub qc_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDiff {
    pub column: String,
    pub mismatch_count: u64,
    pub samples: Vec<SampleMismatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub structural_mismatches: Vec<StructuralMismatch>,
    pub column_diffs: Vec<ColumnDiff>,
    pub rows_compared: u64,
}

impl ComparisonReport {
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.structural_mismatches.is_empty()
            && self.column_diffs.iter().all(|d| d.mismatch_count == 0)
    }

    #[must_use]
    pub fn total_value_mismatches(&self) -> u64 {
        self.column_diffs.iter().map(|d| d.mismatch_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_a_match() {
        let report = ComparisonReport {
            structural_mismatches: Vec::new(),
            column_diffs: Vec::new(),
            rows_compared: 100,
        };
        assert!(report.is_match());
    }

    #[test]
    fn a_structural_mismatch_is_never_a_match_even_with_zero_column_diffs() {
        let report = ComparisonReport {
            structural_mismatches: vec![StructuralMismatch::RowCountMismatch {
                production: 100,
                qc: 99,
            }],
            column_diffs: Vec::new(),
            rows_compared: 99,
        };
        assert!(!report.is_match());
    }

    #[test]
    fn nonzero_column_mismatch_count_fails_the_match() {
        let report = ComparisonReport {
            structural_mismatches: Vec::new(),
            column_diffs: vec![ColumnDiff {
                column: "AGE".into(),
                mismatch_count: 1,
                samples: vec![SampleMismatch {
                    row_key: "101".into(),
                    production_value: "34".into(),
                    qc_value: "35".into(),
                }],
            }],
            rows_compared: 100,
        };
        assert!(!report.is_match());
        assert_eq!(report.total_value_mismatches(), 1);
    }

    #[test]
    fn comparison_report_shape_matches_the_recorded_snapshot() {
        let report = ComparisonReport {
            structural_mismatches: vec![StructuralMismatch::MissingColumn {
                side: Side::Qc,
                column: "SEX".into(),
            }],
            column_diffs: vec![ColumnDiff {
                column: "AGE".into(),
                mismatch_count: 1,
                samples: vec![SampleMismatch {
                    row_key: "002".into(),
                    production_value: "34".into(),
                    qc_value: "41".into(),
                }],
            }],
            rows_compared: 2,
        };
        insta::assert_debug_snapshot!(report);
    }
}

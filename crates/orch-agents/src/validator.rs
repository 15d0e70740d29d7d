//! Validator agent (`spec.md` §4.4.6): not an LLM agent. Runs structural
//! checks over the matched production dataset against the approved spec
//! and emits three artifacts — a validation report, a codelist/VLM
//! sheet, and a define-metadata document. Grounded on the teacher's
//! `sdtm_validate::Validator::validate` (`Severity`/`Issue`/
//! `ValidationReport` shape, one check function per rule, CT/format
//! checks iterating `AnyValue`s column-by-column).

use std::path::{Path, PathBuf};

use orch_ingest::{any_to_string, read_parquet_table};
use orch_model::{DataType, Origin, SpecDocument, VariableMapping};
use polars::prelude::{AnyValue, DataFrame};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::agent::Agent;
use crate::context::ContextPack;
use crate::error::{AgentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub category: &'static str,
    pub variable: Option<String>,
    pub message: String,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub domain: String,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}

/// One row of the codelist/value-level-metadata sheet: a variable's
/// declared codelist and the controlled terms actually observed in the
/// dataset, for reviewers to cross-check against the published codelist.
#[derive(Debug, Clone, Serialize)]
pub struct CodelistSheetRow {
    pub variable: String,
    pub codelist_code: Option<String>,
    pub codelist_name: Option<String>,
    pub controlled_terms: Vec<String>,
}

/// One entry of the submission define-metadata document: the shape a
/// define.xml variable-level metadata table would need, derived directly
/// from the approved spec rather than the dataset (data_type/length are
/// the spec's declared values, not the dataset's observed ones).
#[derive(Debug, Clone, Serialize)]
pub struct DefineMetadataEntry {
    pub variable: String,
    pub label: String,
    pub data_type: DataType,
    pub length: u32,
    pub origin: Origin,
    pub codelist_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub report: ValidationReport,
    pub codelist_sheet: Vec<CodelistSheetRow>,
    pub define_metadata: Vec<DefineMetadataEntry>,
}

pub struct ValidatorAgent<'a> {
    pub spec: &'a SpecDocument,
    pub dataset_path: &'a Path,
    pub identity_variables: &'a [String],
    /// When true, any `Severity::Error` issue is returned as a hard
    /// `Err` instead of merely being recorded in the report — the
    /// configuration flag `spec.md` §4.4.6 describes ("a configuration
    /// flag decides whether a violation aborts the pipeline or is
    /// recorded as a finding").
    pub abort_on_violation: bool,
    pub ctx: &'a ContextPack,
}

impl ValidatorAgent<'_> {
    fn check_presence_and_shape(&self, df: &DataFrame, variable: &VariableMapping) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let Ok(column) = df.column(&variable.target_variable) else {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                category: "required-variable-missing",
                variable: Some(variable.target_variable.clone()),
                message: format!("required variable {} not found in output dataset", variable.target_variable),
                count: None,
            });
            return issues;
        };

        if variable.data_type == DataType::Char {
            let mut over_length = 0u64;
            for idx in 0..df.height() {
                let value = any_to_string(&column.get(idx).unwrap_or(AnyValue::Null));
                if value.len() as u32 > variable.length {
                    over_length += 1;
                }
            }
            if over_length > 0 {
                issues.push(ValidationIssue {
                    severity: Severity::Error,
                    category: "length-exceeded",
                    variable: Some(variable.target_variable.clone()),
                    message: format!(
                        "{} has {over_length} value(s) longer than its declared length of {}",
                        variable.target_variable, variable.length
                    ),
                    count: Some(over_length),
                });
            }
        }

        issues
    }

    fn check_controlled_terminology(&self, df: &DataFrame, variable: &VariableMapping) -> Vec<ValidationIssue> {
        if variable.controlled_terms.is_empty() {
            return Vec::new();
        }
        let Ok(column) = df.column(&variable.target_variable) else {
            return Vec::new();
        };
        let allowed: BTreeSet<String> = variable.controlled_terms.iter().map(|t| t.to_uppercase()).collect();
        let mut invalid: BTreeSet<String> = BTreeSet::new();
        for idx in 0..df.height() {
            let value = any_to_string(&column.get(idx).unwrap_or(AnyValue::Null));
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !allowed.contains(&trimmed.to_uppercase()) {
                invalid.insert(trimmed.to_string());
            }
        }
        if invalid.is_empty() {
            return Vec::new();
        }
        vec![ValidationIssue {
            severity: Severity::Error,
            category: "codelist-membership",
            variable: Some(variable.target_variable.clone()),
            message: format!(
                "{} has {} value(s) not in its declared controlled terms: {}",
                variable.target_variable,
                invalid.len(),
                invalid.iter().take(5).cloned().collect::<Vec<_>>().join(", ")
            ),
            count: Some(invalid.len() as u64),
        }]
    }

    fn check_date_grammar(&self, df: &DataFrame, variable: &VariableMapping) -> Vec<ValidationIssue> {
        if !variable.target_variable.to_uppercase().ends_with("DTC") {
            return Vec::new();
        }
        let Ok(column) = df.column(&variable.target_variable) else {
            return Vec::new();
        };
        let mut invalid = 0u64;
        for idx in 0..df.height() {
            let value = any_to_string(&column.get(idx).unwrap_or(AnyValue::Null));
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !is_valid_iso8601(trimmed) {
                invalid += 1;
            }
        }
        if invalid == 0 {
            return Vec::new();
        }
        vec![ValidationIssue {
            severity: Severity::Error,
            category: "invalid-iso8601",
            variable: Some(variable.target_variable.clone()),
            message: format!("{} has {invalid} value(s) not in ISO 8601 date/datetime format", variable.target_variable),
            count: Some(invalid),
        }]
    }

    fn check_identity_variables(&self, df: &DataFrame) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for key in self.identity_variables {
            let Ok(column) = df.column(key) else {
                issues.push(ValidationIssue {
                    severity: Severity::Error,
                    category: "identity-variable-missing",
                    variable: Some(key.clone()),
                    message: format!("identity variable {key} not found in output dataset"),
                    count: None,
                });
                continue;
            };
            let mut seen = BTreeSet::new();
            let mut empty = 0u64;
            let mut duplicate = 0u64;
            for idx in 0..df.height() {
                let value = any_to_string(&column.get(idx).unwrap_or(AnyValue::Null));
                let trimmed = value.trim().to_string();
                if trimmed.is_empty() {
                    empty += 1;
                    continue;
                }
                if !seen.insert(trimmed) {
                    duplicate += 1;
                }
            }
            if empty > 0 {
                issues.push(ValidationIssue {
                    severity: Severity::Error,
                    category: "identity-variable-empty",
                    variable: Some(key.clone()),
                    message: format!("identity variable {key} has {empty} empty value(s)"),
                    count: Some(empty),
                });
            }
            if duplicate > 0 {
                issues.push(ValidationIssue {
                    severity: Severity::Error,
                    category: "identity-variable-not-unique",
                    variable: Some(key.clone()),
                    message: format!("identity variable {key} has {duplicate} duplicate value(s)"),
                    count: Some(duplicate),
                });
            }
        }
        issues
    }

    fn codelist_sheet(&self) -> Vec<CodelistSheetRow> {
        self.spec
            .variables
            .iter()
            .filter(|v| v.codelist_code.is_some())
            .map(|v| CodelistSheetRow {
                variable: v.target_variable.clone(),
                codelist_code: v.codelist_code.clone(),
                codelist_name: v.codelist_name.clone(),
                controlled_terms: v.controlled_terms.clone(),
            })
            .collect()
    }

    fn define_metadata(&self) -> Vec<DefineMetadataEntry> {
        self.spec
            .variables
            .iter()
            .map(|v| DefineMetadataEntry {
                variable: v.target_variable.clone(),
                label: v.mapping_logic.clone(),
                data_type: v.data_type,
                length: v.length,
                origin: v.origin(),
                codelist_code: v.codelist_code.clone(),
            })
            .collect()
    }
}

impl Agent for ValidatorAgent<'_> {
    type Output = ValidationOutcome;

    fn name(&self) -> &'static str {
        "validator"
    }

    fn invoke(&self) -> Result<Self::Output> {
        let df = read_parquet_table(self.dataset_path)?;

        let mut issues = Vec::new();
        for variable in &self.spec.variables {
            issues.extend(self.check_presence_and_shape(&df, variable));
            issues.extend(self.check_controlled_terminology(&df, variable));
            issues.extend(self.check_date_grammar(&df, variable));
        }
        issues.extend(self.check_identity_variables(&df));

        let report = ValidationReport {
            domain: self.ctx.domain.clone(),
            issues,
        };

        if self.abort_on_violation && report.has_errors() {
            let count = report.issues.iter().filter(|i| i.severity == Severity::Error).count();
            return Err(AgentError::SchemaViolation {
                message: format!("validation found {count} error-level issue(s) for domain {}", self.ctx.domain),
            });
        }

        Ok(ValidationOutcome {
            report,
            codelist_sheet: self.codelist_sheet(),
            define_metadata: self.define_metadata(),
        })
    }
}

fn is_valid_iso8601(value: &str) -> bool {
    let patterns = [
        r"^\d{4}$",
        r"^\d{4}-\d{2}$",
        r"^\d{4}-\d{2}-\d{2}$",
        r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}$",
        r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}$",
        r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+$",
        r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}[+-]\d{2}:\d{2}$",
    ];
    patterns
        .iter()
        .any(|pattern| regex::Regex::new(pattern).map(|r| r.is_match(value)).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::collections::BTreeMap;

    fn variable(target_variable: &str, data_type: DataType, length: u32) -> VariableMapping {
        VariableMapping {
            target_variable: target_variable.to_string(),
            target_domain: "DM".to_string(),
            source_variable: Some(target_variable.to_string()),
            source_dataset: Some("dm.csv".to_string()),
            data_type,
            length,
            codelist_code: None,
            codelist_name: None,
            controlled_terms: Vec::new(),
            mapping_logic: "copy".to_string(),
            macro_used: None,
            function_parameters: BTreeMap::new(),
            assumptions: Vec::new(),
            human_decision_required: false,
            decision_options: Vec::new(),
        }
    }

    fn ctx() -> ContextPack {
        ContextPack::for_validation("DM".to_string(), Vec::new(), PathBuf::from("/study"))
    }

    #[test]
    fn flags_a_missing_required_variable() {
        let study_dir = tempfile::tempdir().unwrap();
        let dataset_path = study_dir.path().join("dm.parquet");
        let mut df = df!("USUBJID" => ["S1", "S2"]).unwrap();
        let mut file = std::fs::File::create(&dataset_path).unwrap();
        ParquetWriter::new(&mut file).finish(&mut df).unwrap();

        let spec = SpecDocument {
            study_id: "STUDY01".to_string(),
            domain: "DM".to_string(),
            spec_version: "1.0".to_string(),
            created_by: "human-review-gate".to_string(),
            created_at: chrono::Utc::now(),
            variables: vec![variable("AGE", DataType::Num, 3)],
        };
        let ctx = ctx();
        let identity = vec!["USUBJID".to_string()];
        let agent = ValidatorAgent {
            spec: &spec,
            dataset_path: &dataset_path,
            identity_variables: &identity,
            abort_on_violation: false,
            ctx: &ctx,
        };

        let outcome = agent.invoke().unwrap();
        assert!(outcome.report.has_errors());
        assert!(outcome.report.issues.iter().any(|i| i.category == "required-variable-missing"));
    }

    #[test]
    fn aborts_with_an_error_when_configured_to() {
        let study_dir = tempfile::tempdir().unwrap();
        let dataset_path = study_dir.path().join("dm.parquet");
        let mut df = df!("USUBJID" => ["S1"]).unwrap();
        let mut file = std::fs::File::create(&dataset_path).unwrap();
        ParquetWriter::new(&mut file).finish(&mut df).unwrap();

        let spec = SpecDocument {
            study_id: "STUDY01".to_string(),
            domain: "DM".to_string(),
            spec_version: "1.0".to_string(),
            created_by: "human-review-gate".to_string(),
            created_at: chrono::Utc::now(),
            variables: vec![variable("AGE", DataType::Num, 3)],
        };
        let ctx = ctx();
        let identity = vec!["USUBJID".to_string()];
        let agent = ValidatorAgent {
            spec: &spec,
            dataset_path: &dataset_path,
            identity_variables: &identity,
            abort_on_violation: true,
            ctx: &ctx,
        };

        assert!(agent.invoke().is_err());
    }

    #[test]
    fn passes_clean_data_with_a_satisfied_identity_variable() {
        let study_dir = tempfile::tempdir().unwrap();
        let dataset_path = study_dir.path().join("dm.parquet");
        let mut df = df!("USUBJID" => ["S1", "S2"], "AGE" => [34i64, 51i64]).unwrap();
        let mut file = std::fs::File::create(&dataset_path).unwrap();
        ParquetWriter::new(&mut file).finish(&mut df).unwrap();

        let spec = SpecDocument {
            study_id: "STUDY01".to_string(),
            domain: "DM".to_string(),
            spec_version: "1.0".to_string(),
            created_by: "human-review-gate".to_string(),
            created_at: chrono::Utc::now(),
            variables: vec![variable("AGE", DataType::Num, 3)],
        };
        let ctx = ctx();
        let identity = vec!["USUBJID".to_string()];
        let agent = ValidatorAgent {
            spec: &spec,
            dataset_path: &dataset_path,
            identity_variables: &identity,
            abort_on_violation: false,
            ctx: &ctx,
        };

        let outcome = agent.invoke().unwrap();
        assert!(!outcome.report.has_errors());
    }
}

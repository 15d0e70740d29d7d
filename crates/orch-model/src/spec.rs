//! The mapping specification: the sole source of truth for generated code,
//! output data, and submission metadata (`SPEC_FULL.md` §3).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Char,
    Num,
}

/// Where a variable's value comes from, inferred from whether
/// `source_variable` is populated (`SPEC_FULL.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    FromSource,
    Derived,
    Constant,
}

/// One option offered to a human at the review gate for a variable with
/// `human_decision_required = true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOption {
    pub id: String,
    pub description: String,
    pub ig_reference: Option<String>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// A single target-variable mapping record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableMapping {
    pub target_variable: String,
    pub target_domain: String,
    pub source_variable: Option<String>,
    pub source_dataset: Option<String>,
    pub data_type: DataType,
    pub length: u32,
    pub codelist_code: Option<String>,
    pub codelist_name: Option<String>,
    pub controlled_terms: Vec<String>,
    pub mapping_logic: String,
    pub macro_used: Option<String>,
    pub function_parameters: BTreeMap<String, String>,
    pub assumptions: Vec<String>,
    pub human_decision_required: bool,
    pub decision_options: Vec<DecisionOption>,
}

impl VariableMapping {
    /// Origin is derived, not stored independently, so it can never drift
    /// from `source_variable` (`SPEC_FULL.md` §3).
    #[must_use]
    pub fn origin(&self) -> Origin {
        if self.source_variable.is_some() {
            Origin::FromSource
        } else if self.macro_used.is_some() {
            Origin::Derived
        } else {
            Origin::Constant
        }
    }
}

/// The mapping specification document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecDocument {
    pub study_id: String,
    pub domain: String,
    pub spec_version: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub variables: Vec<VariableMapping>,
}

impl SpecDocument {
    #[must_use]
    pub fn find(&self, target_variable: &str) -> Option<&VariableMapping> {
        self.variables
            .iter()
            .find(|v| v.target_variable == target_variable)
    }

    /// All distinct `macro_used` names referenced by this spec, for P3
    /// (every macro used must be present in the function registry).
    #[must_use]
    pub fn referenced_macros(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .variables
            .iter()
            .filter_map(|v| v.macro_used.as_deref())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// All distinct `codelist_code` values referenced, for P4.
    #[must_use]
    pub fn referenced_codelists(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self
            .variables
            .iter()
            .filter_map(|v| v.codelist_code.as_deref())
            .collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }
}

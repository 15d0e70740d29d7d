//! The six spec-consistency checks of `SPEC_FULL.md` §4.3, composed in
//! [`validate`]. Each is a private function mirroring the teacher's
//! `checks::{datatype, sequence, expected, ...}` module-per-rule layout,
//! and none of them panics on bad data — a malformed spec produces
//! findings, not a crash.

use std::collections::BTreeMap;

use orch_ct::CtResolver;
use orch_ig::IgClient;
use orch_model::{DecisionRecord, SpecDocument, VariableMapping};
use orch_registry::FunctionRegistry;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub rule: &'static str,
    pub variable: Option<String>,
    pub message: String,
}

impl Finding {
    fn new(severity: Severity, rule: &'static str, variable: Option<&str>, message: String) -> Self {
        Self {
            severity,
            rule,
            variable: variable.map(str::to_string),
            message,
        }
    }
}

/// Set `require_approval_readiness` when validating a spec about to move
/// to `approved` — this additionally enforces rule 4 (decision records for
/// every `human_decision_required` variable).
pub fn validate(
    spec: &SpecDocument,
    ig: &dyn IgClient,
    registry: &FunctionRegistry,
    ct: &CtResolver,
    decisions: &BTreeMap<String, DecisionRecord>,
    require_approval_readiness: bool,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(check_codelists_resolve(spec, ct));
    findings.extend(check_macros_registered(spec, registry));
    findings.extend(check_required_variables_present(spec, ig));
    if require_approval_readiness {
        findings.extend(check_human_decisions_recorded(spec, decisions));
    }
    findings.extend(check_length_covers_controlled_terms(spec));
    findings.extend(check_no_duplicate_target_variables(spec));
    findings
}

/// Rule 1: every `codelist_code` referenced resolves via the CT Resolver.
fn check_codelists_resolve(spec: &SpecDocument, ct: &CtResolver) -> Vec<Finding> {
    let mut findings = Vec::new();
    for variable in &spec.variables {
        let Some(code) = &variable.codelist_code else {
            continue;
        };
        if !ct.codelist_resolves(code) {
            findings.push(Finding::new(
                Severity::Error,
                "codelist-resolves",
                Some(&variable.target_variable),
                format!("codelist {code:?} referenced by {} does not resolve", variable.target_variable),
            ));
        }
    }
    findings
}

/// Rule 2: every `macro_used` exists in the registry, and its bound
/// `function_parameters` satisfy that entry's parameter schema.
fn check_macros_registered(spec: &SpecDocument, registry: &FunctionRegistry) -> Vec<Finding> {
    let mut findings = Vec::new();
    for variable in &spec.variables {
        let Some(macro_name) = &variable.macro_used else {
            continue;
        };
        match registry.get(macro_name) {
            None => findings.push(Finding::new(
                Severity::Error,
                "macro-registered",
                Some(&variable.target_variable),
                format!("macro {macro_name:?} is not in the function registry"),
            )),
            Some(entry) => {
                if let Err(reason) = entry.validate_parameters(&variable.function_parameters) {
                    findings.push(Finding::new(
                        Severity::Error,
                        "macro-parameters",
                        Some(&variable.target_variable),
                        reason,
                    ));
                }
            }
        }
    }
    findings
}

/// Rule 3: every required variable (from the IG) has a record with a
/// non-null mapping.
fn check_required_variables_present(spec: &SpecDocument, ig: &dyn IgClient) -> Vec<Finding> {
    let Ok(required) = ig.get_required_variables(&spec.domain) else {
        return vec![Finding::new(
            Severity::Error,
            "required-variables-present",
            None,
            format!("IG unavailable for domain {}", spec.domain),
        )];
    };
    let mut findings = Vec::new();
    for variable in required {
        match spec.find(&variable) {
            None => findings.push(Finding::new(
                Severity::Error,
                "required-variables-present",
                Some(&variable),
                format!("required variable {variable} has no mapping record"),
            )),
            Some(mapping) if is_null_mapping(mapping) => findings.push(Finding::new(
                Severity::Error,
                "required-variables-present",
                Some(&variable),
                format!("required variable {variable} has a null mapping"),
            )),
            Some(_) => {}
        }
    }
    findings
}

fn is_null_mapping(mapping: &VariableMapping) -> bool {
    mapping.source_variable.is_none() && mapping.macro_used.is_none() && mapping.mapping_logic.trim().is_empty()
}

/// Rule 4: for any variable marked `human_decision_required`, a decision
/// record exists and its `option_id` is among that variable's
/// `decision_options`. Only checked when approaching `approved`.
fn check_human_decisions_recorded(
    spec: &SpecDocument,
    decisions: &BTreeMap<String, DecisionRecord>,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for variable in &spec.variables {
        if !variable.human_decision_required {
            continue;
        }
        let Some(decision) = decisions.get(&variable.target_variable) else {
            findings.push(Finding::new(
                Severity::Error,
                "human-decision-recorded",
                Some(&variable.target_variable),
                format!("{} requires a human decision but none is recorded", variable.target_variable),
            ));
            continue;
        };
        // `option_id = None` means a free-text human override, which is
        // valid and not checked against `decision_options`.
        if let Some(option_id) = &decision.option_id {
            let known = variable.decision_options.iter().any(|o| &o.id == option_id);
            if !known {
                findings.push(Finding::new(
                    Severity::Error,
                    "human-decision-recorded",
                    Some(&variable.target_variable),
                    format!(
                        "recorded option {option_id:?} for {} is not among its decision_options",
                        variable.target_variable
                    ),
                ));
            }
        }
    }
    findings
}

/// Rule 5: `length` is at least the max length of all declared
/// `controlled_terms`.
fn check_length_covers_controlled_terms(spec: &SpecDocument) -> Vec<Finding> {
    let mut findings = Vec::new();
    for variable in &spec.variables {
        let Some(max_term_len) = variable.controlled_terms.iter().map(|t| t.len()).max() else {
            continue;
        };
        if (variable.length as usize) < max_term_len {
            findings.push(Finding::new(
                Severity::Error,
                "length-covers-controlled-terms",
                Some(&variable.target_variable),
                format!(
                    "{} length {} is shorter than its longest controlled term ({max_term_len})",
                    variable.target_variable, variable.length
                ),
            ));
        }
    }
    findings
}

/// Rule 6: no duplicate `target_variable` within the spec.
fn check_no_duplicate_target_variables(spec: &SpecDocument) -> Vec<Finding> {
    let mut seen = std::collections::BTreeSet::new();
    let mut findings = Vec::new();
    for variable in &spec.variables {
        if !seen.insert(variable.target_variable.clone()) {
            findings.push(Finding::new(
                Severity::Error,
                "no-duplicate-target-variables",
                Some(&variable.target_variable),
                format!("{} appears more than once in the spec", variable.target_variable),
            ));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_duplicate_target_variables() {
        let mut spec = empty_spec();
        spec.variables.push(mapping("AGE"));
        spec.variables.push(mapping("AGE"));
        let findings = check_no_duplicate_target_variables(&spec);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "no-duplicate-target-variables");
    }

    #[test]
    fn flags_length_shorter_than_controlled_term() {
        let mut spec = empty_spec();
        let mut v = mapping("SEX");
        v.length = 1;
        v.controlled_terms = vec!["FEMALE".to_string()];
        spec.variables.push(v);
        let findings = check_length_covers_controlled_terms(&spec);
        assert_eq!(findings.len(), 1);
    }

    fn empty_spec() -> SpecDocument {
        SpecDocument {
            study_id: "STUDY1".into(),
            domain: "DM".into(),
            spec_version: "0.1".into(),
            created_by: "spec-builder".into(),
            created_at: chrono::Utc::now(),
            variables: Vec::new(),
        }
    }

    fn mapping(name: &str) -> VariableMapping {
        VariableMapping {
            target_variable: name.to_string(),
            target_domain: "DM".into(),
            source_variable: Some("RAW".into()),
            source_dataset: None,
            data_type: orch_model::DataType::Char,
            length: 10,
            codelist_code: None,
            codelist_name: None,
            controlled_terms: Vec::new(),
            mapping_logic: "copy".into(),
            macro_used: None,
            function_parameters: BTreeMap::new(),
            assumptions: Vec::new(),
            human_decision_required: false,
            decision_options: Vec::new(),
        }
    }
}

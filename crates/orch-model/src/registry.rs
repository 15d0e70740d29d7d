//! Shared shape for a Function Registry catalog entry (`SPEC_FULL.md` §4.5).
//!
//! `orch-registry` owns loading, DAG validation and prompt rendering; this
//! crate only owns the entry shape so `orch-model::spec` validation and
//! `orch-agents` context packs can refer to it without depending on the
//! loader.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    /// Type tag, e.g. `"string"`, `"date"`, `"codelist-code"` (spec.md §3).
    #[serde(default)]
    pub type_tag: String,
    pub required: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionRegistryEntry {
    pub name: String,
    pub purpose: String,
    pub when_to_use: Vec<String>,
    pub parameters: Vec<ParameterSpec>,
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub usage_examples: Vec<String>,
    /// Present only for CT-mapping entries (spec.md §3: "optional for
    /// CT-mapping entries").
    #[serde(default)]
    pub supported_codelists: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl FunctionRegistryEntry {
    /// Validates the given parameter bindings against this entry's schema:
    /// every required parameter bound, no unknown names bound.
    pub fn validate_parameters(&self, bound: &BTreeMap<String, String>) -> Result<(), String> {
        for param in &self.parameters {
            if param.required && !bound.contains_key(&param.name) {
                return Err(format!(
                    "missing required parameter {:?} for function {:?}",
                    param.name, self.name
                ));
            }
        }
        let known: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        for key in bound.keys() {
            if !known.contains(&key.as_str()) {
                return Err(format!(
                    "unknown parameter {:?} for function {:?}",
                    key, self.name
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> FunctionRegistryEntry {
        FunctionRegistryEntry {
            name: "impute_partial_date".into(),
            purpose: "fills partial dates to full ISO 8601".into(),
            when_to_use: vec!["date fields with day/month missing".into()],
            parameters: vec![ParameterSpec {
                name: "strategy".into(),
                type_tag: "string".into(),
                required: true,
                default: None,
                example: Some("first-of-period".into()),
                description: "first-of-period | last-of-period".into(),
            }],
            dependencies: Vec::new(),
            usage_examples: Vec::new(),
            supported_codelists: Vec::new(),
            notes: Vec::new(),
        }
    }

    #[test]
    fn rejects_missing_required_parameter() {
        let e = entry();
        let bound = BTreeMap::new();
        assert!(e.validate_parameters(&bound).is_err());
    }

    #[test]
    fn rejects_unknown_parameter() {
        let e = entry();
        let mut bound = BTreeMap::new();
        bound.insert("strategy".to_string(), "first-of-period".to_string());
        bound.insert("bogus".to_string(), "x".to_string());
        assert!(e.validate_parameters(&bound).is_err());
    }

    #[test]
    fn accepts_well_formed_bindings() {
        let e = entry();
        let mut bound = BTreeMap::new();
        bound.insert("strategy".to_string(), "first-of-period".to_string());
        assert!(e.validate_parameters(&bound).is_ok());
    }
}

//! Spec-builder agent (`SPEC_FULL.md` §4.4.1): produces a draft mapping
//! spec from the raw data, the implementation guide, the function
//! registry, and controlled terminology. Model-driven — the heavy
//! lifting of matching raw columns to target variables happens inside
//! the prompt, this module's job is building that prompt, parsing the
//! response against the shared [`orch_model::VariableMapping`] schema,
//! and enriching it with what only Rust-side state knows (IG
//! completeness, CT resolution against the actual raw values).

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::Utc;
use orch_ct::CtResolver;
use orch_ig::IgClient;
use orch_llm::{CompletionKind, CompletionRequest, LlmClient};
use orch_model::{DataType, DecisionOption, SpecDocument, VariableMapping};
use orch_registry::FunctionRegistry;
use serde::Deserialize;

use crate::agent::Agent;
use crate::context::ContextPack;
use crate::error::{AgentError, Result};

#[derive(Debug, Deserialize)]
struct DraftSpecResponse {
    #[serde(default)]
    variables: Vec<VariableMapping>,
}

pub struct SpecBuilderAgent<'a> {
    pub study_id: &'a str,
    pub llm: &'a LlmClient,
    pub ig: &'a dyn IgClient,
    pub ct: &'a CtResolver,
    pub registry: &'a FunctionRegistry,
    pub ctx: &'a ContextPack,
    /// Distinct raw values observed for each already-known target
    /// variable's source column, keyed by `target_variable`. Only
    /// variables backed by a non-extensible codelist are worth sampling;
    /// the orchestrator is free to pass an empty map when raw data
    /// hasn't been ingested yet.
    pub raw_value_samples: &'a BTreeMap<String, Vec<String>>,
}

impl SpecBuilderAgent<'_> {
    fn build_prompt(&self) -> CompletionRequest {
        let mut user_prompt = String::new();
        let _ = writeln!(user_prompt, "Domain: {}", self.ctx.domain);
        let _ = writeln!(user_prompt, "Required variables: {:?}", self.ctx.ig_required_variables);
        let _ = writeln!(user_prompt, "Conditional variables: {:?}", self.ctx.ig_conditional_variables);
        let _ = writeln!(user_prompt, "Controlled-terminology variables: {:?}", self.ctx.ig_ct_variables);
        let _ = writeln!(user_prompt, "Coding standards:\n{:?}", self.ctx.coding_standards);
        let _ = writeln!(user_prompt, "Function registry:\n{}", self.ctx.registry_catalog);
        if !self.ctx.conventions.is_empty() {
            let _ = writeln!(user_prompt, "Conventions:");
            for (key, convention) in &self.ctx.conventions {
                let _ = writeln!(
                    user_prompt,
                    "- {key}: recommend {} ({})",
                    convention.recommended_option, convention.rationale
                );
            }
        }
        CompletionRequest {
            domain: self.ctx.domain.clone(),
            kind: CompletionKind::SpecDraft,
            system_prompt: "Propose a complete target-variable mapping for this SDTM domain, \
                 one JSON object per variable, matching the registered function catalog and \
                 the implementation guide."
                .to_string(),
            user_prompt,
        }
    }

    /// Enriches a drafted variable with a controlled-terminology
    /// resolution pass: any raw value that the CT Resolver cannot match
    /// against a non-extensible codelist forces `human_decision_required`
    /// with a generic set of options (`SPEC_FULL.md` §4.4.1, §4.7).
    fn enrich_controlled_terminology(&self, variable: &mut VariableMapping) -> Result<()> {
        let Some(code) = variable.codelist_code.clone() else {
            return Ok(());
        };
        let Some(samples) = self.raw_value_samples.get(&variable.target_variable) else {
            return Ok(());
        };
        // The vocabulary service being unreachable shouldn't fail the whole
        // draft (`CtResolver::resolve` already falls back to the overlay
        // table per raw value); when extensibility can't be confirmed,
        // assume non-extensible rather than silently waving unresolved
        // values through.
        let extensible = match self.ct.fetch_codelist(&code) {
            Ok(metadata) => metadata.extensible,
            Err(error) => {
                tracing::warn!(codelist = %code, error = %error, "codelist metadata unavailable, assuming non-extensible");
                false
            }
        };
        let mut unresolved = Vec::new();
        for raw_value in samples {
            let resolution = self.ct.resolve(&code, raw_value);
            if !resolution.is_resolved() {
                unresolved.push(raw_value.clone());
            }
        }
        if unresolved.is_empty() || extensible {
            return Ok(());
        }
        variable.human_decision_required = true;
        let ig_reference = self
            .ig
            .get_variable_detail(&self.ctx.domain, &variable.target_variable)?
            .map(|detail| detail.label);
        variable.decision_options = generic_ct_decision_options(&unresolved, ig_reference.as_deref());
        Ok(())
    }

    /// Stub entries for IG-required variables the model's draft left out
    /// entirely, so the spec always has a (possibly unmapped) record for
    /// every required variable rather than a silent gap (`SPEC_FULL.md`
    /// §4.3 rule 3).
    fn missing_required_stubs(&self, drafted: &[VariableMapping]) -> Vec<VariableMapping> {
        self.ctx
            .ig_required_variables
            .iter()
            .filter(|required| !drafted.iter().any(|v| &v.target_variable == *required))
            .map(|required| VariableMapping {
                target_variable: required.clone(),
                target_domain: self.ctx.domain.clone(),
                source_variable: None,
                source_dataset: None,
                data_type: DataType::Char,
                length: 0,
                codelist_code: None,
                codelist_name: None,
                controlled_terms: Vec::new(),
                mapping_logic: String::new(),
                macro_used: None,
                function_parameters: BTreeMap::new(),
                assumptions: vec![
                    "the implementation guide requires this variable but no automatic mapping was found".to_string(),
                ],
                human_decision_required: true,
                decision_options: vec![DecisionOption {
                    id: "manual-entry".to_string(),
                    description: "a human supplies the source or derivation for this variable".to_string(),
                    ig_reference: None,
                    pros: vec!["guarantees the required variable is not silently dropped".to_string()],
                    cons: vec!["blocks automatic mapping until reviewed".to_string()],
                }],
            })
            .collect()
    }
}

impl Agent for SpecBuilderAgent<'_> {
    type Output = SpecDocument;

    fn name(&self) -> &'static str {
        "spec-builder"
    }

    fn invoke(&self) -> Result<Self::Output> {
        if !self.ig.is_available() {
            return Err(AgentError::SchemaViolation {
                message: format!("implementation guide is unavailable for domain {}", self.ctx.domain),
            });
        }

        let request = self.build_prompt();
        let response = self.llm.complete(&request)?;
        let mut parsed: DraftSpecResponse =
            serde_json::from_str(&response.text).map_err(|source| AgentError::SchemaViolation {
                message: format!("could not parse spec-builder response: {source}"),
            })?;

        if parsed.variables.is_empty() {
            return Err(AgentError::NoVariables {
                domain: self.ctx.domain.clone(),
            });
        }

        for variable in &mut parsed.variables {
            self.enrich_controlled_terminology(variable)?;
        }
        parsed.variables.extend(self.missing_required_stubs(&parsed.variables.clone()));

        Ok(SpecDocument {
            study_id: self.study_id.to_string(),
            domain: self.ctx.domain.clone(),
            spec_version: "0.1".to_string(),
            created_by: self.name().to_string(),
            created_at: Utc::now(),
            variables: parsed.variables,
        })
    }
}

fn generic_ct_decision_options(unresolved_values: &[String], ig_reference: Option<&str>) -> Vec<DecisionOption> {
    let unresolved_list = unresolved_values.join(", ");
    vec![
        DecisionOption {
            id: "map-to-closest".to_string(),
            description: format!("map each unresolved value ({unresolved_list}) to its closest controlled term"),
            ig_reference: ig_reference.map(str::to_string),
            pros: vec!["preserves the controlled-terminology constraint exactly".to_string()],
            cons: vec!["may lose the distinction the raw value was recording".to_string()],
        },
        DecisionOption {
            id: "all-other-plus-supplemental".to_string(),
            description: "map unresolved values to the codelist's OTHER term and record the raw value in a supplemental qualifier".to_string(),
            ig_reference: ig_reference.map(str::to_string),
            pros: vec!["keeps the raw value traceable".to_string()],
            cons: vec!["requires a supplemental qualifier dataset entry per variable".to_string()],
        },
        DecisionOption {
            id: "flag-as-missing".to_string(),
            description: "leave the variable null and record the conflict as a pitfall for review".to_string(),
            ig_reference: ig_reference.map(str::to_string),
            pros: vec!["never guesses at a clinical meaning".to_string()],
            cons: vec!["produces a required-variable gap until a human resolves it".to_string()],
        },
    ]
}

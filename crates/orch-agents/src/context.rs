//! The context pack every agent is invoked with (§4.4): function-registry
//! catalog, IG excerpts, coding standards, memory, and (for spec-builder
//! and reviewer only) conventions. Built fresh per stage by the
//! orchestrator — never threaded through from a previous agent's state —
//! so the independence invariant (P9) is a constructor shape, not a
//! runtime filter.

use std::collections::BTreeMap;
use std::path::PathBuf;

use orch_conventions::Convention;
use orch_model::{ComparisonReport, DecisionRecord, PitfallRecord};

#[derive(Debug, Clone)]
pub struct ContextPack {
    pub domain: String,
    pub registry_catalog: String,
    pub ig_required_variables: Vec<String>,
    pub ig_conditional_variables: Vec<String>,
    pub ig_ct_variables: Vec<String>,
    pub coding_standards: Vec<String>,
    pub recent_decisions: Vec<DecisionRecord>,
    pub relevant_pitfalls: Vec<PitfallRecord>,
    /// Only populated for spec-builder and spec-reviewer (§4.9: "used
    /// only at the human-review gate and by spec-builder for
    /// defaulting" — the reviewer needs it too, to confirm a draft
    /// followed the recommended option).
    pub conventions: BTreeMap<String, Convention>,
    pub raw_data_root: PathBuf,
    pub study_root: PathBuf,
    /// Populated on comparison-loop retries so agents can bias toward
    /// self-correction; `None` on the first attempt.
    pub previous_mismatch_report: Option<ComparisonReport>,
}

impl ContextPack {
    /// Full pack for spec-building and spec-review — the only two stages
    /// that read conventions.
    #[must_use]
    pub fn for_spec_stage(
        domain: String,
        registry_catalog: String,
        ig_required_variables: Vec<String>,
        ig_conditional_variables: Vec<String>,
        ig_ct_variables: Vec<String>,
        coding_standards: Vec<String>,
        recent_decisions: Vec<DecisionRecord>,
        relevant_pitfalls: Vec<PitfallRecord>,
        conventions: BTreeMap<String, Convention>,
        raw_data_root: PathBuf,
        study_root: PathBuf,
    ) -> Self {
        Self {
            domain,
            registry_catalog,
            ig_required_variables,
            ig_conditional_variables,
            ig_ct_variables,
            coding_standards,
            recent_decisions,
            relevant_pitfalls,
            conventions,
            raw_data_root,
            study_root,
            previous_mismatch_report: None,
        }
    }

    /// Pack for the production-programmer agent. Takes the same shared
    /// inputs as [`Self::for_qc`] but is free to additionally be given
    /// prior attempts' own artifacts by the caller — unlike QC, there is
    /// no independence constraint on what production may see of itself.
    #[must_use]
    pub fn for_production(
        domain: String,
        registry_catalog: String,
        coding_standards: Vec<String>,
        raw_data_root: PathBuf,
        study_root: PathBuf,
        previous_mismatch_report: Option<ComparisonReport>,
    ) -> Self {
        Self {
            domain,
            registry_catalog,
            ig_required_variables: Vec::new(),
            ig_conditional_variables: Vec::new(),
            ig_ct_variables: Vec::new(),
            coding_standards,
            recent_decisions: Vec::new(),
            relevant_pitfalls: Vec::new(),
            conventions: BTreeMap::new(),
            raw_data_root,
            study_root,
            previous_mismatch_report,
        }
    }

    /// Pack for the QC agent (P9 independence invariant). This
    /// constructor's signature has no parameter through which a
    /// production artifact path could flow — it cannot be handed the
    /// production agent's code, execution log, or output dataset, by
    /// construction rather than by a runtime check.
    #[must_use]
    pub fn for_qc(
        domain: String,
        registry_catalog: String,
        coding_standards: Vec<String>,
        raw_data_root: PathBuf,
        study_root: PathBuf,
        previous_mismatch_report: Option<ComparisonReport>,
    ) -> Self {
        Self {
            domain,
            registry_catalog,
            ig_required_variables: Vec::new(),
            ig_conditional_variables: Vec::new(),
            ig_ct_variables: Vec::new(),
            coding_standards,
            recent_decisions: Vec::new(),
            relevant_pitfalls: Vec::new(),
            conventions: BTreeMap::new(),
            raw_data_root,
            study_root,
            previous_mismatch_report,
        }
    }

    /// Pack for the validator agent.
    #[must_use]
    pub fn for_validation(domain: String, coding_standards: Vec<String>, study_root: PathBuf) -> Self {
        Self {
            domain,
            registry_catalog: String::new(),
            ig_required_variables: Vec::new(),
            ig_conditional_variables: Vec::new(),
            ig_ct_variables: Vec::new(),
            coding_standards,
            recent_decisions: Vec::new(),
            relevant_pitfalls: Vec::new(),
            conventions: BTreeMap::new(),
            raw_data_root: PathBuf::new(),
            study_root,
            previous_mismatch_report: None,
        }
    }
}

//! Records written by the Memory Store (`SPEC_FULL.md` §4.10): decisions
//! made for a variable, and pitfalls worth remembering for future studies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    Company,
    Study,
}

/// Where a recorded decision came from (spec.md §3: `source ∈
/// {convention, human, inherited}`). Distinct from [`MemorySource`], which
/// tracks company-vs-study *layer* provenance rather than how the decision
/// itself was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Taken as-is from a pre-configured convention default.
    Convention,
    /// Selected or overridden by a human reviewer at the review gate.
    Human,
    /// Carried forward from a prior study's recorded decision for the
    /// same variable rather than freshly decided.
    Inherited,
}

/// A decision recorded against a variable, retrievable by
/// `recent_decisions(variable)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub study_id: String,
    pub domain: String,
    pub variable: String,
    pub option_id: Option<String>,
    pub rationale: String,
    pub source: DecisionSource,
    pub recorded_at: DateTime<Utc>,
    /// Populated after downstream stages observe how the decision played
    /// out (e.g. whether production/QC matched on the affected variable).
    /// `None` until a later stage fills it in.
    #[serde(default)]
    pub outcome: Option<String>,
}

/// A pitfall worth surfacing on future studies, retrievable by
/// `relevant_pitfalls(context)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitfallRecord {
    pub context: String,
    pub root_cause: String,
    pub resolution: String,
    pub domain: String,
    pub occurrence_count: u32,
    pub studies: Vec<String>,
    pub source: MemorySource,
    pub recorded_at: DateTime<Utc>,
}

impl PitfallRecord {
    /// A pitfall is a promotion candidate once it has recurred across at
    /// least two distinct studies (§4.10: "promotion candidates ... require
    /// human sign-off").
    #[must_use]
    pub fn is_promotion_candidate(&self) -> bool {
        self.source == MemorySource::Study && self.occurrence_count >= 2
    }

    pub fn record_occurrence(&mut self, study_id: impl Into<String>) {
        let study_id = study_id.into();
        if !self.studies.contains(&study_id) {
            self.studies.push(study_id);
            self.occurrence_count = self.studies.len() as u32;
        }
    }
}

//! Human-review gate (`SPEC_FULL.md` §4.4.3). Not an LLM agent: this
//! module takes the selections a human operator already made (surfaced
//! to them via conventions, memory, and each variable's
//! `decision_options`) and turns them into decision records plus a
//! verdict-gated spec. A reject sends control back to spec-building; an
//! approval persists the decisions the caller then writes to the Memory
//! Store and advances the spec to `approved`.

use chrono::{DateTime, Utc};
use orch_conventions::ConventionsStore;
use orch_model::{DecisionRecord, DecisionSource, SpecDocument};

use crate::agent::Agent;
use crate::error::{AgentError, Result};

/// One human selection for a variable flagged `human_decision_required`.
/// `option_id = None` is a free-text override outside the offered
/// options — always accepted, never checked against `decision_options`
/// (`SPEC_FULL.md` §9: "human override wins").
#[derive(Debug, Clone)]
pub struct HumanDecisionInput {
    pub variable: String,
    pub option_id: Option<String>,
    pub rationale: String,
}

#[derive(Debug, Clone)]
pub enum ReviewVerdict {
    Approve,
    ApproveWithChanges,
    Reject { comments: Vec<String> },
}

pub enum HumanReviewOutcome {
    Approved {
        spec: SpecDocument,
        decisions: Vec<DecisionRecord>,
    },
    Rejected {
        comments: Vec<String>,
    },
}

pub struct HumanReviewGate<'a> {
    pub study_id: &'a str,
    pub spec: &'a SpecDocument,
    /// Consulted only to surface the recommended option alongside each
    /// human's choice — never overrides it (`SPEC_FULL.md` §9).
    pub conventions: &'a ConventionsStore,
    pub decisions: &'a [HumanDecisionInput],
    pub verdict: ReviewVerdict,
    pub now: DateTime<Utc>,
}

impl Agent for HumanReviewGate<'_> {
    type Output = HumanReviewOutcome;

    fn name(&self) -> &'static str {
        "human-review-gate"
    }

    fn invoke(&self) -> Result<Self::Output> {
        if let ReviewVerdict::Reject { comments } = &self.verdict {
            return Ok(HumanReviewOutcome::Rejected {
                comments: comments.clone(),
            });
        }

        let mut records = Vec::with_capacity(self.decisions.len());
        for decision in self.decisions {
            let Some(variable) = self.spec.find(&decision.variable) else {
                continue;
            };
            if let Some(option_id) = &decision.option_id {
                if variable.human_decision_required
                    && !variable.decision_options.iter().any(|o| &o.id == option_id)
                {
                    return Err(AgentError::UnknownDecisionOption {
                        variable: decision.variable.clone(),
                        option_id: option_id.clone(),
                    });
                }
            }
            records.push(DecisionRecord {
                study_id: self.study_id.to_string(),
                domain: self.spec.domain.clone(),
                variable: decision.variable.clone(),
                option_id: decision.option_id.clone(),
                rationale: decision.rationale.clone(),
                source: DecisionSource::Human,
                recorded_at: self.now,
                outcome: None,
            });
        }

        let mut spec = self.spec.clone();
        spec.created_by = self.name().to_string();

        Ok(HumanReviewOutcome::Approved { spec, decisions: records })
    }
}

/// Whether a human's choice for `variable` contradicts a company-layer
/// recommended convention for the same key — logged as a
/// promotion-candidate note rather than silently dropped (`SPEC_FULL.md`
/// §9 open-question resolution 1).
#[must_use]
pub fn contradicts_convention(conventions: &ConventionsStore, key: &str, chosen_option_id: Option<&str>) -> bool {
    match (conventions.get(key), chosen_option_id) {
        (Some(convention), Some(chosen)) => convention.recommended_option != chosen,
        _ => false,
    }
}

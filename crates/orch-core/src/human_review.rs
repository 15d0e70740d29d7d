//! The decision contract the Pipeline Orchestrator drives the
//! human-review gate with. `spec.md` §9 treats the review UI itself as a
//! collaborator out of scope; this trait is that contract's Rust shape —
//! `orch-cli` implements it against a terminal prompt, tests implement it
//! against a scripted verdict.

use orch_agents::{HumanDecisionInput, ReviewVerdict};
use orch_model::SpecDocument;

/// What a human operator decided for one draft.
pub struct HumanReviewSubmission {
    pub verdict: ReviewVerdict,
    pub decisions: Vec<HumanDecisionInput>,
}

pub trait HumanReviewSource {
    /// Presents `spec` (and, implicitly, whatever surfaced it to the
    /// operator — conventions, memory, decision options) and returns
    /// their verdict. Blocking: the orchestrator has no stage to run
    /// concurrently with a human review.
    fn collect(&self, spec: &SpecDocument) -> HumanReviewSubmission;
}

/// Approves every draft with no overrides. Useful for template-mode runs
/// and tests; never wired up behind `orch-cli`'s real `--resume` path.
pub struct AutoApprove;

impl HumanReviewSource for AutoApprove {
    fn collect(&self, _spec: &SpecDocument) -> HumanReviewSubmission {
        HumanReviewSubmission {
            verdict: ReviewVerdict::Approve,
            decisions: Vec::new(),
        }
    }
}

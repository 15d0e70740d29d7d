//! The five agents driving the mapping-specification lifecycle
//! (`SPEC_FULL.md` §4.4): spec-builder, spec-reviewer, the human-review
//! gate, the production- and QC-programmer pair, and the validator.
//! Every LLM-backed agent shares one `Agent` trait and the
//! `run_with_retries` bounded-retry helper; the human-review gate and
//! validator implement the same trait for uniform orchestration even
//! though neither calls an LLM.

pub mod agent;
pub mod context;
pub mod error;
pub mod human_review;
pub mod production;
pub mod qc;
pub mod spec_builder;
pub mod spec_reviewer;
pub mod validator;

pub use agent::{run_with_retries, Agent, DEFAULT_MAX_RETRIES};
pub use context::ContextPack;
pub use error::{AgentError, Result};
pub use human_review::{contradicts_convention, HumanDecisionInput, HumanReviewGate, HumanReviewOutcome, ReviewVerdict};
pub use production::{GeneratedDataset, ProductionProgrammerAgent};
pub use qc::QcProgrammerAgent;
pub use spec_builder::SpecBuilderAgent;
pub use spec_reviewer::{ReviewOutcome, SpecReviewerAgent};
pub use validator::{
    CodelistSheetRow, DefineMetadataEntry, Severity as ValidationSeverity, ValidationIssue, ValidationOutcome,
    ValidationReport, ValidatorAgent,
};

//! The orchestrator's own error enum. Every component error crosses this
//! boundary exactly once (`SPEC_FULL.md` §7) and is immediately given a
//! `Stage` and an [`orch_model::ErrorKind`] so it can be folded into
//! `PipelineState::record_error` and, at the CLI boundary, mapped to an
//! exit code.

use std::path::PathBuf;

use orch_model::{ErrorKind, OrchError, Stage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{stage:?}: {source}")]
    Config {
        stage: Stage,
        #[source]
        source: orch_config::ConfigError,
    },
    #[error("{stage:?}: {source}")]
    Agent {
        stage: Stage,
        #[source]
        source: orch_agents::AgentError,
    },
    #[error("{stage:?}: {source}")]
    Spec {
        stage: Stage,
        #[source]
        source: orch_spec::SpecError,
    },
    #[error("{stage:?}: {source}")]
    State {
        stage: Stage,
        #[source]
        source: orch_state::StateError,
    },
    #[error("{stage:?}: {source}")]
    Registry {
        stage: Stage,
        #[source]
        source: orch_registry::RegistryError,
    },
    #[error("{stage:?}: {source}")]
    Ingest {
        stage: Stage,
        #[source]
        source: orch_ingest::IngestError,
    },
    #[error("{stage:?}: {source}")]
    Compare {
        stage: Stage,
        #[source]
        source: orch_compare::CompareError,
    },
    #[error("{stage:?}: {source}")]
    Ct {
        stage: Stage,
        #[source]
        source: orch_ct::CtError,
    },
    #[error("{stage:?}: {source}")]
    Conventions {
        stage: Stage,
        #[source]
        source: orch_conventions::ConventionsError,
    },
    #[error("{stage:?} gate failed: {message}")]
    Gate { stage: Stage, message: String },
    #[error("cannot run stage {stage:?}: predecessor artifact {artifact:?} is missing")]
    PredecessorMissing { stage: Stage, artifact: &'static str },
    #[error("comparison did not converge after {iterations} iteration(s)")]
    ComparisonExhausted { stage: Stage, iterations: u32 },
    #[error("output root already has an in-progress pipeline at {path}; pass --resume to continue it")]
    OutputRootInUse { path: PathBuf },
    #[error("no persisted state to resume at {path}")]
    NothingToResume { path: PathBuf },
    #[error("spec-review reported error-severity findings and --force was not set")]
    SpecReviewBlocked { findings: Vec<String> },
    #[error("human review rejected the draft after the maximum number of rebuild cycles")]
    HumanReviewExhausted { cycles: u32 },
}

impl CoreError {
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Config { stage, .. }
            | Self::Agent { stage, .. }
            | Self::Spec { stage, .. }
            | Self::State { stage, .. }
            | Self::Registry { stage, .. }
            | Self::Ingest { stage, .. }
            | Self::Compare { stage, .. }
            | Self::Ct { stage, .. }
            | Self::Conventions { stage, .. }
            | Self::Gate { stage, .. }
            | Self::PredecessorMissing { stage, .. }
            | Self::ComparisonExhausted { stage, .. } => *stage,
            Self::OutputRootInUse { .. } | Self::NothingToResume { .. } => Stage::SpecBuilding,
            Self::SpecReviewBlocked { .. } => Stage::SpecReview,
            Self::HumanReviewExhausted { .. } => Stage::HumanReview,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } | Self::OutputRootInUse { .. } | Self::NothingToResume { .. } => ErrorKind::Config,
            Self::Agent { source, .. } => match source {
                orch_agents::AgentError::Model(_) => ErrorKind::Model,
                orch_agents::AgentError::Ct(_) => ErrorKind::CtResolution,
                orch_agents::AgentError::Ig(_) => ErrorKind::IgUnavailable,
                orch_agents::AgentError::ScriptExecution { .. }
                | orch_agents::AgentError::ScriptSpawn { .. }
                | orch_agents::AgentError::ScriptWrite { .. } => ErrorKind::ScriptExecution,
                _ => ErrorKind::SchemaViolation,
            },
            Self::Spec { .. } | Self::SpecReviewBlocked { .. } => ErrorKind::SpecValidation,
            Self::State { .. } | Self::Registry { .. } | Self::Ingest { .. } => ErrorKind::Config,
            Self::Compare { .. } | Self::ComparisonExhausted { .. } => ErrorKind::ComparisonMismatch,
            Self::Ct { .. } => ErrorKind::CtResolution,
            Self::Conventions { .. } => ErrorKind::Config,
            Self::Gate { .. } | Self::HumanReviewExhausted { .. } => ErrorKind::ValidationFinding,
            Self::PredecessorMissing { .. } => ErrorKind::Config,
        }
    }

    /// Converts to the cross-crate [`OrchError`] the way every stage
    /// method's `Err` arm is funneled before `PipelineState::record_error`
    /// stores it (`SPEC_FULL.md` §7).
    #[must_use]
    pub fn to_orch_error(&self) -> OrchError {
        OrchError::new(self.kind(), self.stage(), self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

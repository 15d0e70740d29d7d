//! Shared value types for the SDTM mapping orchestrator workspace.
//!
//! Every other crate depends on `orch-model` for identifiers, the error
//! type, the pipeline state shape, the spec document shape, and the
//! decision/pitfall/comparison record shapes — nothing in here talks to
//! disk, the network, or an LLM.

pub mod compare;
pub mod decision;
pub mod error;
pub mod ids;
pub mod registry;
pub mod spec;
pub mod state;

pub use compare::{ColumnDiff, ComparisonReport, SampleMismatch, Side, StructuralMismatch};
pub use decision::{DecisionRecord, DecisionSource, MemorySource, PitfallRecord};
pub use error::{ErrorKind, OrchError, Result};
pub use ids::{DomainCode, InvalidId, StudyId};
pub use registry::{FunctionRegistryEntry, ParameterSpec};
pub use spec::{DataType, DecisionOption, Origin, SpecDocument, VariableMapping};
pub use state::{
    ComparisonResult, ErrorRecord, HumanDecision, PipelineState, Stage, StageStatus, SpecStatus,
    STATE_SCHEMA_VERSION,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("the model call failed: {0}")]
    Model(#[from] orch_llm::LlmError),
    #[error("agent output did not match the expected schema: {message}")]
    SchemaViolation { message: String },
    #[error("agent returned no variables for domain {domain}")]
    NoVariables { domain: String },
    #[error("controlled terminology could not be resolved: {0}")]
    Ct(#[from] orch_ct::CtError),
    #[error("the implementation guide is unavailable: {0}")]
    Ig(#[from] orch_ig::IgError),
    #[error("the spec could not be read or written: {0}")]
    Spec(#[from] orch_spec::SpecError),
    #[error("raw data could not be read: {0}")]
    Ingest(#[from] orch_ingest::IngestError),
    #[error("the memory store could not be updated: {0}")]
    Memory(#[from] orch_memory::MemoryError),
    #[error("could not write generated script {path}: {source}")]
    ScriptWrite {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not spawn interpreter for generated script {path}: {source}")]
    ScriptSpawn {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("generated script {path} exited with status {status}: {stderr}")]
    ScriptExecution {
        path: std::path::PathBuf,
        status: i32,
        stderr: String,
    },
    #[error("human review rejected with no path back to spec-building: {0}")]
    ReviewRejected(String),
    #[error("selected option {option_id:?} for {variable} is not among its decision_options")]
    UnknownDecisionOption { variable: String, option_id: String },
}

impl AgentError {
    /// Whether a retry of the same agent call is worth attempting: model
    /// flakiness and schema drift are, a structurally empty response or a
    /// rejected review are not (`SPEC_FULL.md` §4.4, §7).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Model(_) | Self::SchemaViolation { .. } | Self::Ct(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

//! Shared error type for orchestrator operations.
//!
//! Every crate in the workspace has its own `thiserror` error enum for
//! crate-local failures; [`OrchError`] is the one type that crosses stage
//! boundaries, because the orchestrator needs a single discriminant to
//! record in `error_log` and to map to a process exit code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Stage;

/// The error kinds from the error-handling design (`SPEC_FULL.md` §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Config,
    IgUnavailable,
    CtResolution,
    Model,
    SchemaViolation,
    SpecValidation,
    ScriptExecution,
    ComparisonMismatch,
    ValidationFinding,
}

impl ErrorKind {
    /// Whether this kind is, in general, worth retrying (network hiccups,
    /// transient schema mismatches) versus a hard stop.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Model | Self::SchemaViolation | Self::CtResolution)
    }
}

/// A typed, stage-attributed error.
#[derive(Debug, Error)]
#[error("{kind:?} error during {stage:?}: {message}")]
pub struct OrchError {
    pub kind: ErrorKind,
    pub stage: Stage,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl OrchError {
    #[must_use]
    pub fn new(kind: ErrorKind, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Human-friendly message suitable for CLI display.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::Config => format!("Configuration error: {}", self.message),
            ErrorKind::IgUnavailable => format!(
                "Implementation Guide content is unavailable for this domain: {}",
                self.message
            ),
            ErrorKind::CtResolution => format!(
                "Controlled terminology could not be resolved: {}",
                self.message
            ),
            ErrorKind::Model => format!("The language model call failed: {}", self.message),
            ErrorKind::SchemaViolation => {
                format!("Agent output did not match the expected schema: {}", self.message)
            }
            ErrorKind::SpecValidation => format!("Spec validation failed: {}", self.message),
            ErrorKind::ScriptExecution => {
                format!("Generated script exited with an error: {}", self.message)
            }
            ErrorKind::ComparisonMismatch => {
                format!("Production and QC outputs did not converge: {}", self.message)
            }
            ErrorKind::ValidationFinding => format!("Validation finding: {}", self.message),
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

pub type Result<T> = std::result::Result<T, OrchError>;

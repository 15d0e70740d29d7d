//! Validated newtype identifiers.
//!
//! Mirrors the teacher convention of rejecting blank identifiers at
//! construction rather than deep in the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudyId(String);

impl StudyId {
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidId> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(InvalidId::Study(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DomainCode(String);

impl DomainCode {
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidId> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(InvalidId::Domain(value));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum InvalidId {
    #[error("invalid study id: {0:?}")]
    Study(String),
    #[error("invalid domain code: {0:?}")]
    Domain(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_study_id() {
        assert!(StudyId::new("   ").is_err());
        assert!(StudyId::new("STUDY01").is_ok());
    }

    #[test]
    fn domain_code_is_uppercased() {
        let code = DomainCode::new("dm").unwrap();
        assert_eq!(code.as_str(), "DM");
    }
}

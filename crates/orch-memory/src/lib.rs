//! Memory Store: persistent decisions, pitfalls, and coding standards
//! (`SPEC_FULL.md` §4.10). Company layer is read-only during a pipeline
//! run; only the study layer is ever written here. Promotion from study to
//! company happens outside a pipeline run, under manual approval — this
//! crate only surfaces candidates, it never writes the company file.

pub mod error;

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
pub use error::{MemoryError, Result};
use orch_model::{DecisionRecord, MemorySource, PitfallRecord};
#[cfg(test)]
use orch_model::DecisionSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MemoryLayer {
    #[serde(default)]
    decisions: Vec<DecisionRecord>,
    #[serde(default)]
    pitfalls: Vec<PitfallRecord>,
    #[serde(default)]
    coding_standards: Vec<String>,
}

impl MemoryLayer {
    fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| MemoryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| MemoryError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Write-temp-then-rename, mirroring the teacher's
/// `tss_persistence::io::save_project` (mined before that crate was
/// removed from the workspace), with JSON in place of the rkyv payload.
fn save_atomically(layer: &MemoryLayer, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| MemoryError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let temp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(layer).expect("memory layer is always serializable");

    let mut file = File::create(&temp_path).map_err(|source| MemoryError::Write {
        path: temp_path.clone(),
        source,
    })?;
    file.write_all(&bytes).map_err(|source| MemoryError::Write {
        path: temp_path.clone(),
        source,
    })?;
    file.sync_all().map_err(|source| MemoryError::Write {
        path: temp_path.clone(),
        source,
    })?;

    fs::rename(&temp_path, path).map_err(|source| MemoryError::AtomicWriteFailed {
        temp_path,
        target_path: path.to_path_buf(),
        source,
    })
}

/// Company + study memory layers for one pipeline run.
pub struct MemoryStore {
    company: MemoryLayer,
    study: MemoryLayer,
    study_path: PathBuf,
}

impl MemoryStore {
    /// Loads the company layer (read-only for the lifetime of the store)
    /// and the study layer (created lazily on first write if absent).
    pub fn load(company_path: &Path, study_path: &Path) -> Result<Self> {
        Ok(Self {
            company: MemoryLayer::load_or_default(company_path)?,
            study: MemoryLayer::load_or_default(study_path)?,
            study_path: study_path.to_path_buf(),
        })
    }

    fn flush_study(&self) -> Result<()> {
        save_atomically(&self.study, &self.study_path)
    }

    pub fn record_decision(&mut self, record: DecisionRecord) -> Result<()> {
        self.study.decisions.push(record);
        self.flush_study()
    }

    /// Records an encountered pitfall, incrementing `occurrence_count` if a
    /// pitfall with the same context, domain, and root cause already
    /// exists in the study layer for this study, otherwise creating a new
    /// one.
    pub fn record_pitfall(
        &mut self,
        study_id: &str,
        domain: impl Into<String>,
        context: impl Into<String>,
        root_cause: impl Into<String>,
        resolution: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let domain = domain.into();
        let context = context.into();
        let root_cause = root_cause.into();
        let resolution = resolution.into();
        if let Some(existing) = self
            .study
            .pitfalls
            .iter_mut()
            .find(|p| p.context == context && p.domain == domain && p.root_cause == root_cause)
        {
            existing.record_occurrence(study_id);
        } else {
            self.study.pitfalls.push(PitfallRecord {
                context,
                root_cause,
                resolution,
                domain,
                occurrence_count: 1,
                studies: vec![study_id.to_string()],
                source: MemorySource::Study,
                recorded_at: now,
            });
        }
        self.flush_study()
    }

    #[must_use]
    pub fn recent_decisions(&self, variable: &str) -> Vec<&DecisionRecord> {
        self.company
            .decisions
            .iter()
            .chain(self.study.decisions.iter())
            .filter(|d| d.variable == variable)
            .collect()
    }

    #[must_use]
    pub fn relevant_pitfalls(&self, context: &str) -> Vec<&PitfallRecord> {
        self.company
            .pitfalls
            .iter()
            .chain(self.study.pitfalls.iter())
            .filter(|p| p.context == context)
            .collect()
    }

    #[must_use]
    pub fn coding_standards(&self) -> Vec<&str> {
        self.company
            .coding_standards
            .iter()
            .chain(self.study.coding_standards.iter())
            .map(String::as_str)
            .collect()
    }

    /// Pitfalls recurring across at least two distinct studies, surfaced
    /// for human sign-off before a promotion to the company layer. Never
    /// writes the company layer itself.
    #[must_use]
    pub fn promotion_candidates(&self) -> Vec<&PitfallRecord> {
        self.study
            .pitfalls
            .iter()
            .filter(|p| p.is_promotion_candidate())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn record_decision_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let company = dir.path().join("company.json");
        let study = dir.path().join("study.json");

        let mut store = MemoryStore::load(&company, &study).unwrap();
        store
            .record_decision(DecisionRecord {
                study_id: "STUDY01".into(),
                domain: "DM".into(),
                variable: "RACE".into(),
                option_id: Some("all-other-plus-supplemental".into()),
                rationale: "non-extensible codelist, site values unmatched".into(),
                source: DecisionSource::Human,
                recorded_at: now(),
                outcome: None,
            })
            .unwrap();

        let reloaded = MemoryStore::load(&company, &study).unwrap();
        let found = reloaded.recent_decisions("RACE");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].study_id, "STUDY01");
    }

    #[test]
    fn repeated_pitfall_becomes_a_promotion_candidate_after_two_studies() {
        let dir = tempfile::tempdir().unwrap();
        let company = dir.path().join("company.json");
        let study = dir.path().join("study.json");

        let mut store = MemoryStore::load(&company, &study).unwrap();
        store
            .record_pitfall(
                "STUDY01",
                "DM",
                "race-other-specify",
                "free text not in the non-extensible codelist",
                "mapped to OTHER with free text in a supplemental qualifier",
                now(),
            )
            .unwrap();
        assert!(store.promotion_candidates().is_empty());

        store
            .record_pitfall(
                "STUDY02",
                "DM",
                "race-other-specify",
                "free text not in the non-extensible codelist",
                "mapped to OTHER with free text in a supplemental qualifier",
                now(),
            )
            .unwrap();
        assert_eq!(store.promotion_candidates().len(), 1);
    }

    #[test]
    fn company_layer_is_never_written_by_record_calls() {
        let dir = tempfile::tempdir().unwrap();
        let company = dir.path().join("company.json");
        fs::write(
            &company,
            serde_json::to_string(&MemoryLayer {
                decisions: Vec::new(),
                pitfalls: Vec::new(),
                coding_standards: vec!["always uppercase domain codes".into()],
            })
            .unwrap(),
        )
        .unwrap();
        let study = dir.path().join("study.json");

        let mut store = MemoryStore::load(&company, &study).unwrap();
        store
            .record_pitfall("STUDY01", "DM", "ctx", "root cause", "resolution", now())
            .unwrap();

        let company_bytes_before = fs::read(&company).unwrap();
        let reparsed_company: MemoryLayer = serde_json::from_slice(&company_bytes_before).unwrap();
        assert_eq!(reparsed_company.pitfalls.len(), 0);
        assert_eq!(store.coding_standards(), vec!["always uppercase domain codes"]);
    }
}

//! State Manager (`SPEC_FULL.md` §4.2): atomic JSON persistence of
//! [`PipelineState`], the single artifact the orchestrator checkpoints
//! after every stage. Same write-temp-then-sync-then-rename mechanism as
//! `orch_memory::save_atomically`, applied here to pipeline state instead
//! of the memory layers.

pub mod error;

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
pub use error::{Result, StateError};
use orch_model::ids::{DomainCode, StudyId};
use orch_model::PipelineState;

/// Loads the state at `path` if present, otherwise creates a fresh
/// `SpecBuilding`/`Draft` state for `(study_id, domain)` — the "start or
/// resume" entrypoint `orch-core`'s `run()`/`resume()` build on.
pub fn load_or_new(path: &Path, study_id: StudyId, domain: DomainCode, now: DateTime<Utc>) -> Result<PipelineState> {
    if !path.exists() {
        return Ok(PipelineState::new(study_id, domain, now));
    }
    load(path)
}

pub fn load(path: &Path) -> Result<PipelineState> {
    let text = fs::read_to_string(path).map_err(|source| StateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| StateError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `state` atomically: unknown fields carried in `state.unknown`
/// round-trip because `PipelineState` derives `Serialize`/`Deserialize`
/// with `#[serde(flatten)]` over that map.
pub fn save(state: &PipelineState, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StateError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let temp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(state).map_err(|source| StateError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut file = File::create(&temp_path).map_err(|source| StateError::Write {
        path: temp_path.clone(),
        source,
    })?;
    file.write_all(&bytes).map_err(|source| StateError::Write {
        path: temp_path.clone(),
        source,
    })?;
    file.sync_all().map_err(|source| StateError::Write {
        path: temp_path.clone(),
        source,
    })?;

    fs::rename(&temp_path, path).map_err(|source| StateError::AtomicWriteFailed {
        temp_path,
        target_path: path.to_path_buf(),
        source,
    })
}

pub fn default_state_path(study_output_root: &Path) -> PathBuf {
    study_output_root.join("pipeline_state.json")
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
    fn missing_state_file_creates_a_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_state_path(dir.path());
        let state = load_or_new(
            &path,
            StudyId::new("STUDY01").unwrap(),
            DomainCode::new("DM").unwrap(),
            now(),
        )
        .unwrap();
        assert_eq!(state.comparison_iteration, 0);
    }

    #[test]
    fn save_then_load_round_trips_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_state_path(dir.path());
        let mut state = PipelineState::new(
            StudyId::new("STUDY01").unwrap(),
            DomainCode::new("DM").unwrap(),
            now(),
        );
        state
            .unknown
            .insert("future_field".to_string(), serde_json::json!("kept"));

        save(&state, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.unknown.get("future_field"), Some(&serde_json::json!("kept")));
    }

    #[test]
    fn save_is_atomic_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_state_path(dir.path());
        let state = PipelineState::new(
            StudyId::new("STUDY01").unwrap(),
            DomainCode::new("DM").unwrap(),
            now(),
        );
        save(&state, &path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}

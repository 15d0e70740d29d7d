//! Spec document load/save, keyed by domain under a study's output root.
//! Atomic-write pattern mirrors `orch_memory::save_atomically` (itself
//! grounded on `tss_persistence::io::save_project`): write to a sibling
//! `.tmp` file, `sync_all`, then rename over the target.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use orch_model::SpecDocument;

use crate::error::{Result, SpecError};

fn draft_path(root: &Path, domain: &str) -> PathBuf {
    root.join(domain).join("spec.draft.json")
}

fn approved_path(root: &Path, domain: &str) -> PathBuf {
    root.join(domain).join("spec.approved.json")
}

fn save_atomically(path: &Path, spec: &SpecDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SpecError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(spec).map_err(|source| SpecError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut file = File::create(&tmp_path).map_err(|source| SpecError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    file.write_all(&body).map_err(|source| SpecError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    file.sync_all().map_err(|source| SpecError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| SpecError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn load(path: &Path) -> Result<SpecDocument> {
    let body = fs::read_to_string(path).map_err(|source| SpecError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|source| SpecError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_draft(root: &Path, domain: &str) -> Result<SpecDocument> {
    let path = draft_path(root, domain);
    if !path.exists() {
        return Err(SpecError::DraftNotFound {
            domain: domain.to_string(),
        });
    }
    load(&path)
}

pub fn save_draft(root: &Path, spec: &SpecDocument) -> Result<()> {
    save_atomically(&draft_path(root, &spec.domain), spec)
}

pub fn load_approved(root: &Path, domain: &str) -> Result<SpecDocument> {
    let path = approved_path(root, domain);
    if !path.exists() {
        return Err(SpecError::ApprovedNotFound {
            domain: domain.to_string(),
        });
    }
    load(&path)
}

/// Writes only the approved slot; the draft slot is left untouched, so
/// `load_draft` keeps returning whatever was last drafted even after
/// approval (see `approved_and_draft_slots_are_independent` below).
pub fn save_approved(root: &Path, spec: &SpecDocument) -> Result<()> {
    save_atomically(&approved_path(root, &spec.domain), spec)
}

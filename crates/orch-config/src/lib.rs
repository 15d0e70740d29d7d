//! Config Resolver: deep-merges a base configuration with a per-study
//! overlay and resolves the paths every other component needs (registry,
//! IG content, CT overlay table, output root).

pub mod error;

use std::fs;
use std::path::{Path, PathBuf};

pub use error::{ConfigError, Result};

/// Override for the standards content root, named after and grounded on
/// the teacher's `CDISC_STANDARDS_DIR` (`sdtm_standards::paths`).
pub const STANDARDS_DIR_ENV_VAR: &str = "SDTM_ORCH_STANDARDS_DIR";
pub const VOCAB_SERVICE_URL_ENV_VAR: &str = "SDTM_ORCH_VOCAB_SERVICE_URL";
pub const LLM_API_KEY_ENV_VAR: &str = "SDTM_ORCH_LLM_API_KEY";

/// Resolved, ready-to-use paths and settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub standards_dir: PathBuf,
    pub registry_manifest: PathBuf,
    pub ct_overlay_path: PathBuf,
    pub output_root: PathBuf,
    pub vocab_service_url: Option<String>,
    pub max_comparison_iterations: u32,
    pub float_epsilon: f64,
}

/// Deep-mergeable raw config shape, as read from TOML. Every field is
/// optional so a study overlay can specify only what it overrides.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RawConfig {
    pub standards_dir: Option<String>,
    pub registry_manifest: Option<String>,
    pub ct_overlay_path: Option<String>,
    pub output_root: Option<String>,
    pub vocab_service_url: Option<String>,
    pub max_comparison_iterations: Option<u32>,
    pub float_epsilon: Option<f64>,
}

impl RawConfig {
    /// Reads and parses a TOML config file. A missing file is not an
    /// error for the study overlay (it's optional); callers that require
    /// the base config to exist should check `path.exists()` first.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Merges `overlay` over `self`, field by field, `overlay` winning
    /// wherever it sets a value (spec.md §2: "deep-merges a base
    /// configuration with a per-study overlay").
    #[must_use]
    pub fn merge(self, overlay: RawConfig) -> Self {
        Self {
            standards_dir: overlay.standards_dir.or(self.standards_dir),
            registry_manifest: overlay.registry_manifest.or(self.registry_manifest),
            ct_overlay_path: overlay.ct_overlay_path.or(self.ct_overlay_path),
            output_root: overlay.output_root.or(self.output_root),
            vocab_service_url: overlay.vocab_service_url.or(self.vocab_service_url),
            max_comparison_iterations: overlay
                .max_comparison_iterations
                .or(self.max_comparison_iterations),
            float_epsilon: overlay.float_epsilon.or(self.float_epsilon),
        }
    }
}

/// Default MAX_ITERATIONS for the production/QC comparison retry loop
/// (spec.md §4.1/P2), used when neither base nor overlay config sets one.
pub const DEFAULT_MAX_COMPARISON_ITERATIONS: u32 = 5;

/// Resolves the final configuration for a (study, domain) run: loads the
/// base config, merges a study overlay if present, applies environment
/// variable overrides (highest precedence, matching the teacher's
/// `sdtm_standards::paths::standards_root`), and defaults anything still
/// unset.
pub fn resolve(base_path: &Path, study_overlay_path: Option<&Path>) -> Result<ResolvedConfig> {
    let mut merged = RawConfig::load(base_path)?;
    if let Some(overlay_path) = study_overlay_path {
        if overlay_path.exists() {
            merged = merged.merge(RawConfig::load(overlay_path)?);
        }
    }

    let standards_dir = std::env::var(STANDARDS_DIR_ENV_VAR)
        .ok()
        .or(merged.standards_dir)
        .unwrap_or_else(|| "standards".to_string());
    let standards_dir = PathBuf::from(standards_dir);

    let registry_manifest = merged
        .registry_manifest
        .map(PathBuf::from)
        .unwrap_or_else(|| standards_dir.join("registry/manifest.toml"));

    let ct_overlay_path = merged
        .ct_overlay_path
        .map(PathBuf::from)
        .unwrap_or_else(|| standards_dir.join("ct/overlay.csv"));

    let output_root = merged
        .output_root
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("output"));

    let vocab_service_url = std::env::var(VOCAB_SERVICE_URL_ENV_VAR)
        .ok()
        .or(merged.vocab_service_url);

    Ok(ResolvedConfig {
        standards_dir,
        registry_manifest,
        ct_overlay_path,
        output_root,
        vocab_service_url,
        max_comparison_iterations: merged
            .max_comparison_iterations
            .unwrap_or(DEFAULT_MAX_COMPARISON_ITERATIONS),
        float_epsilon: merged.float_epsilon.unwrap_or(0.0),
    })
}

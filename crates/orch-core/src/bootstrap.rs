//! Single entry point that turns a [`ResolvedConfig`] plus run-specific
//! identifiers into a ready-to-drive [`PipelineOrchestrator`]. Exists so
//! `orch-cli` wires up the fourteen collaborator crates in exactly one
//! place instead of duplicating construction logic per subcommand.

use std::path::{Path, PathBuf};

use orch_config::ResolvedConfig;
use orch_conventions::ConventionsStore;
use orch_ct::{CtResolver, OverlayTable};
use orch_ig::FileIgClient;
use orch_llm::{LiveConfig, LlmClient, LlmMode, LogOnlyConfig};
use orch_memory::MemoryStore;
use orch_model::ids::{DomainCode, StudyId};
use orch_registry::FunctionRegistry;

use crate::error::{CoreError, Result};
use crate::human_review::HumanReviewSource;
use crate::orchestrator::PipelineOrchestrator;

/// What mode to construct the shared [`LlmClient`] in. `orch-cli` picks
/// one of these from `SDTM_ORCH_LLM_API_KEY`/`--log-only`/`--template`
/// rather than calling `orch_llm::LlmMode` variants directly, so adding a
/// fourth mode only touches this enum and the CLI flag that selects it.
pub enum LlmSelection {
    Live { endpoint: String, api_key: String, model: String },
    LogOnly { log_path: PathBuf },
    Template,
}

/// Everything `bootstrap` needs beyond what `ResolvedConfig` already
/// resolved: the identifiers and collaborators that vary per run rather
/// than per installation.
pub struct BootstrapArgs<'a> {
    pub config: &'a ResolvedConfig,
    pub study_id: StudyId,
    pub domain: DomainCode,
    pub raw_data_root: PathBuf,
    pub llm: LlmSelection,
    pub python_interpreter: String,
    pub identity_variables: Vec<String>,
    pub abort_on_validation_violation: bool,
    pub human_review: &'a dyn HumanReviewSource,
}

/// The per-study output directory every stage writes under
/// (`<output_root>/<study_id>`, domain subdirectories nested beneath it —
/// see `DESIGN.md`'s "output directory layout" note for why this deviates
/// from spec.md's illustrative type-based directories).
#[must_use]
pub fn study_output_root(config: &ResolvedConfig, study_id: &StudyId) -> PathBuf {
    config.output_root.join(study_id.as_str())
}

fn ig_root(config: &ResolvedConfig) -> PathBuf {
    config.standards_dir.join("ig")
}

fn company_memory_path(config: &ResolvedConfig) -> PathBuf {
    config.standards_dir.join("memory/company.json")
}

fn company_conventions_path(config: &ResolvedConfig) -> PathBuf {
    config.standards_dir.join("conventions/base.toml")
}

/// Builds a [`PipelineOrchestrator`] ready to `run()` or `resume()`.
///
/// # Errors
///
/// Returns [`CoreError::Config`] if the registry manifest, CT overlay, or
/// conventions base file cannot be loaded.
pub fn bootstrap(args: BootstrapArgs<'_>) -> Result<PipelineOrchestrator<'_>> {
    let config = args.config;
    let stage = orch_model::Stage::SpecBuilding;

    let registry = FunctionRegistry::load(&config.registry_manifest).map_err(|source| CoreError::Registry {
        stage,
        source,
    })?;

    let ig = Box::new(FileIgClient::new(ig_root(config)));

    let overlay = load_overlay(&config.ct_overlay_path).map_err(|source| CoreError::Ct { stage, source })?;
    let ct = CtResolver::new(config.vocab_service_url.clone(), overlay).map_err(|source| CoreError::Ct { stage, source })?;

    let study_root = study_output_root(config, &args.study_id);
    let conventions = ConventionsStore::load(&company_conventions_path(config), Some(&study_root.join("conventions.toml")))
        .map_err(|source| CoreError::Conventions { stage, source })?;

    let memory =
        MemoryStore::load(&company_memory_path(config), &study_root.join("memory.json")).map_err(|source| CoreError::Agent {
            stage,
            source: orch_agents::AgentError::Memory(source),
        })?;

    let llm = LlmClient::new(match args.llm {
        LlmSelection::Live { endpoint, api_key, model } => LlmMode::Live(LiveConfig::new(endpoint, api_key, model)),
        LlmSelection::LogOnly { log_path } => LlmMode::LogOnly(LogOnlyConfig { log_path }),
        LlmSelection::Template => LlmMode::Template,
    })
    .map_err(|source| CoreError::Agent {
        stage,
        source: orch_agents::AgentError::Model(source),
    })?;

    Ok(PipelineOrchestrator {
        study_id: args.study_id,
        domain: args.domain,
        output_root: study_root,
        raw_data_root: args.raw_data_root,
        registry,
        ig,
        ct,
        conventions,
        memory,
        llm,
        python_interpreter: args.python_interpreter,
        identity_variables: args.identity_variables,
        abort_on_validation_violation: args.abort_on_validation_violation,
        max_comparison_iterations: config.max_comparison_iterations,
        float_epsilon: config.float_epsilon,
        human_review: args.human_review,
    })
}

fn load_overlay(path: &Path) -> std::result::Result<OverlayTable, orch_ct::CtError> {
    if path.exists() {
        OverlayTable::load(path)
    } else {
        Ok(OverlayTable::empty())
    }
}

//! Integration tests over `PipelineOrchestrator` covering the testable
//! properties `SPEC_FULL.md` §8 names: the bounded comparison retry loop
//! (P2/B1), the human-review reject cycle bound (B3), the output-root
//! ownership guard and `--resume` contract (§5), and checkpointing of a
//! stage failure (§4.1's "state flushed before the next stage runs").
//!
//! Production/QC subprocess execution itself is exercised at the agent
//! level (`orch_agents::production`/`qc` unit tests) rather than here: a
//! real run needs a Python interpreter with `pandas`, which this
//! workspace cannot assume is present. These tests drive the
//! orchestrator up through human review (template LLM mode needs no
//! network or interpreter) and exercise the comparison stage directly
//! against hand-written parquet fixtures.

use std::path::{Path, PathBuf};

use orch_core::{
    human_review::{AutoApprove, HumanReviewSource, HumanReviewSubmission},
    orchestrator::PipelineOrchestrator,
};
use orch_agents::{HumanDecisionInput, ReviewVerdict};
use orch_ct::{CtResolver, OverlayTable};
use orch_ig::FileIgClient;
use orch_llm::{LlmClient, LlmMode};
use orch_model::ids::{DomainCode, StudyId};
use orch_model::{ErrorKind, SpecStatus, Stage};
use orch_registry::FunctionRegistry;
use proptest::prelude::*;

struct Fixture {
    _study_dir: tempfile::TempDir,
    _ig_dir: tempfile::TempDir,
    _registry_dir: tempfile::TempDir,
    study_root: PathBuf,
    ig_root: PathBuf,
    registry_root: PathBuf,
}

fn write_ig(dir: &Path) {
    std::fs::write(
        dir.join("DM.md"),
        "## USUBJID\nUnique subject id.\n\n## AGE\nAge in years.\n\n## SEX\nSex.\n\n\
         | Variable | Label | Type | CT | Requirement |\n|---|---|---|---|---|\n\
         | USUBJID | Subject | Char | N | Req |\n| AGE | Age | Num | N | Req |\n| SEX | Sex | Char | Y | Req |\n",
    )
    .unwrap();
}

fn registry_at(dir: &Path) -> FunctionRegistry {
    let path = dir.join("manifest.toml");
    std::fs::write(&path, "[manifest]\nschema = \"sdtm-orchestrator.function-registry\"\nschema_version = 1\n").unwrap();
    FunctionRegistry::load(&path).unwrap()
}

fn fixture() -> Fixture {
    let study_dir = tempfile::tempdir().unwrap();
    let ig_dir = tempfile::tempdir().unwrap();
    let registry_dir = tempfile::tempdir().unwrap();
    write_ig(ig_dir.path());
    let study_root = study_dir.path().join("STUDY01");
    let ig_root = ig_dir.path().to_path_buf();
    let registry_root = registry_dir.path().to_path_buf();
    Fixture {
        _study_dir: study_dir,
        _ig_dir: ig_dir,
        _registry_dir: registry_dir,
        study_root,
        ig_root,
        registry_root,
    }
}

/// Builds a fresh orchestrator over `fx`'s fixture paths. `python_interpreter`
/// is deliberately left invalid by default: nothing in these tests drives a
/// real production/QC subprocess to completion.
fn orchestrator<'a>(fx: &'a Fixture, human_review: &'a dyn HumanReviewSource) -> PipelineOrchestrator<'a> {
    PipelineOrchestrator {
        study_id: StudyId::new("STUDY01").unwrap(),
        domain: DomainCode::new("DM").unwrap(),
        output_root: fx.study_root.clone(),
        raw_data_root: fx.study_root.join("raw"),
        registry: registry_at(&fx.registry_root),
        ig: Box::new(FileIgClient::new(fx.ig_root.clone())),
        ct: CtResolver::new(None, OverlayTable::empty()).unwrap(),
        conventions: orch_conventions::ConventionsStore::default(),
        memory: orch_memory::MemoryStore::load(
            &fx.study_root.join("company_memory.json"),
            &fx.study_root.join("memory.json"),
        )
        .unwrap(),
        llm: LlmClient::new(LlmMode::Template).unwrap(),
        python_interpreter: "this-interpreter-does-not-exist-in-any-path".to_string(),
        identity_variables: vec!["USUBJID".to_string()],
        abort_on_validation_violation: false,
        max_comparison_iterations: 5,
        float_epsilon: 0.0,
        human_review,
    }
}

#[test]
fn run_refuses_to_start_over_an_in_progress_output_root() {
    let fx = fixture();
    let domain_dir = fx.study_root.join("DM");
    std::fs::create_dir_all(&domain_dir).unwrap();
    std::fs::write(domain_dir.join("pipeline_state.json"), "{}").unwrap();

    let mut orch = orchestrator(&fx, &AutoApprove);
    let err = orch.run(None, false).unwrap_err();
    assert!(matches!(err, orch_core::error::CoreError::OutputRootInUse { .. }));
}

#[test]
fn resume_without_a_persisted_state_fails_instead_of_starting_fresh() {
    let fx = fixture();
    let mut orch = orchestrator(&fx, &AutoApprove);
    let err = orch.resume(None, false).unwrap_err();
    assert!(matches!(err, orch_core::error::CoreError::NothingToResume { .. }));
}

#[test]
fn happy_path_reaches_approved_spec_then_fails_the_production_stage_cleanly() {
    let fx = fixture();
    let mut orch = orchestrator(&fx, &AutoApprove);

    let err = orch.run(None, false).unwrap_err();
    // the interpreter doesn't exist, so production can never exit 0 in this
    // sandbox; what matters is everything upstream of it succeeded.
    assert!(matches!(err, orch_core::error::CoreError::Agent { stage: Stage::Production, .. }));

    let state_path = fx.study_root.join("DM").join("pipeline_state.json");
    let state = orch_state::load(&state_path).unwrap();
    assert_eq!(state.spec_status, SpecStatus::Approved);
    assert_eq!(state.current_phase, Stage::Production);
    assert!(state.artifact("draft_spec").is_some());
    assert!(state.artifact("approved_spec").is_some());
    assert_eq!(state.error_log.len(), 1);
    assert_eq!(state.error_log[0].kind, ErrorKind::ScriptExecution);
}

#[test]
fn raw_sex_values_the_ct_service_cannot_confirm_flag_a_human_decision() {
    // No CT service is configured in this fixture, so every sampled raw
    // value is unresolved (B2) — this is what Scenario 2 (Race "Other
    // Specify") looks like end to end for a CT-controlled variable once
    // raw data actually reaches the spec-builder.
    let fx = fixture();
    std::fs::create_dir_all(fx.study_root.join("raw")).unwrap();
    std::fs::write(
        fx.study_root.join("raw").join("DM.csv"),
        "STUDYID,SUBJID,AGE,SEX\nSTUDY01,001,34,M\nSTUDY01,002,41,F\n",
    )
    .unwrap();

    let mut orch = orchestrator(&fx, &AutoApprove);
    orch.run(Some(Stage::SpecBuilding), false).unwrap();

    let draft = orch_spec::load_draft(&fx.study_root, "DM").unwrap();
    let sex = draft.find("SEX").expect("SEX variable in draft");
    assert!(sex.human_decision_required);
    assert!(!sex.decision_options.is_empty());
}

struct AlwaysReject;

impl HumanReviewSource for AlwaysReject {
    fn collect(&self, _spec: &orch_model::SpecDocument) -> HumanReviewSubmission {
        HumanReviewSubmission {
            verdict: ReviewVerdict::Reject {
                comments: vec!["needs another pass".to_string()],
            },
            decisions: Vec::<HumanDecisionInput>::new(),
        }
    }
}

#[test]
fn a_human_reviewer_who_never_approves_exhausts_the_rebuild_cycle_bound() {
    let fx = fixture();
    let mut orch = orchestrator(&fx, &AlwaysReject);

    let err = orch.run(None, false).unwrap_err();
    assert!(matches!(
        err,
        orch_core::error::CoreError::HumanReviewExhausted {
            cycles: orch_core::orchestrator::MAX_HUMAN_REVIEW_CYCLES
        }
    ));

    let state_path = fx.study_root.join("DM").join("pipeline_state.json");
    let state = orch_state::load(&state_path).unwrap();
    // a rejected draft must never be treated as approved (B3).
    assert_eq!(state.spec_status, SpecStatus::Reviewed);
}

fn write_parquet(path: &Path, usubjid: &[&str], age: &[i64]) {
    use polars::prelude::*;
    let mut df = df! {
        "USUBJID" => usubjid,
        "AGE" => age,
    }
    .unwrap();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = std::fs::File::create(path).unwrap();
    ParquetWriter::new(file).finish(&mut df).unwrap();
}

fn craft_state_at_comparison(fx: &Fixture, iteration: u32, production_rows: (&[&str], &[i64]), qc_rows: (&[&str], &[i64])) -> PathBuf {
    let domain_dir = fx.study_root.join("DM");
    let production_path = domain_dir.join("production.parquet");
    let qc_path = domain_dir.join("qc.parquet");
    write_parquet(&production_path, production_rows.0, production_rows.1);
    write_parquet(&qc_path, qc_rows.0, qc_rows.1);

    let mut state = orch_model::PipelineState::new(StudyId::new("STUDY01").unwrap(), DomainCode::new("DM").unwrap(), chrono::Utc::now());
    state.current_phase = Stage::Comparison;
    state.comparison_iteration = iteration;
    state.set_artifact("production_dataset", production_path.display().to_string());
    state.set_artifact("qc_dataset", qc_path.display().to_string());
    let state_path = domain_dir.join("pipeline_state.json");
    orch_state::save(&state, &state_path).unwrap();
    state_path
}

#[test]
fn matching_datasets_advance_straight_to_validation() {
    let fx = fixture();
    craft_state_at_comparison(&fx, 0, (&["S-1", "S-2"], &[30, 40]), (&["S-1", "S-2"], &[30, 40]));

    let mut orch = orchestrator(&fx, &AutoApprove);
    let state = orch.resume(Some(Stage::Comparison), false).unwrap();

    assert_eq!(state.comparison_result, orch_model::ComparisonResult::Match);
    assert_eq!(state.current_phase, Stage::Validation);
    assert_eq!(state.comparison_iteration, 0);
}

#[test]
fn a_mismatch_below_the_bound_rewinds_to_production_for_another_attempt() {
    let fx = fixture();
    craft_state_at_comparison(&fx, 0, (&["S-1", "S-2"], &[30, 40]), (&["S-1", "S-2"], &[30, 41]));

    let mut orch = orchestrator(&fx, &AutoApprove);
    let state = orch.resume(Some(Stage::Comparison), false).unwrap();

    assert_eq!(state.comparison_result, orch_model::ComparisonResult::Mismatch);
    assert_eq!(state.comparison_iteration, 1);
    assert_eq!(state.current_phase, Stage::Production);
}

#[test]
fn a_mismatch_at_the_bound_fails_the_pipeline_instead_of_retrying_forever() {
    let fx = fixture();
    craft_state_at_comparison(&fx, 0, (&["S-1"], &[30]), (&["S-1"], &[31]));

    let mut orch = orchestrator(&fx, &AutoApprove);
    orch.max_comparison_iterations = 1;
    let err = orch.resume(Some(Stage::Comparison), false).unwrap_err();

    assert!(matches!(
        err,
        orch_core::error::CoreError::ComparisonExhausted { iterations: 1, .. }
    ));

    let state_path = fx.study_root.join("DM").join("pipeline_state.json");
    let state = orch_state::load(&state_path).unwrap();
    assert_eq!(state.comparison_iteration, 1);
    assert!(state.error_log.iter().any(|e| e.kind == ErrorKind::ComparisonMismatch));
}

proptest! {
    /// P2: no matter how the bound is configured, a run of persistently
    /// mismatching comparisons stops exactly at that bound and never
    /// exceeds it.
    #[test]
    fn comparison_iteration_never_exceeds_the_configured_bound(bound in 1u32..6) {
        let fx = fixture();
        craft_state_at_comparison(&fx, 0, (&["S-1"], &[30]), (&["S-1"], &[31]));
        let state_path = fx.study_root.join("DM").join("pipeline_state.json");

        let mut orch = orchestrator(&fx, &AutoApprove);
        orch.max_comparison_iterations = bound;

        loop {
            match orch.resume(Some(Stage::Comparison), false) {
                Ok(state) => {
                    prop_assert!(state.comparison_iteration < bound);
                    prop_assert_eq!(state.current_phase, Stage::Production);
                    // rewind so the next resume re-enters the comparison stage
                    // against the same still-mismatching fixture.
                    let mut reloaded = orch_state::load(&state_path).unwrap();
                    reloaded.current_phase = Stage::Comparison;
                    orch_state::save(&reloaded, &state_path).unwrap();
                }
                Err(orch_core::error::CoreError::ComparisonExhausted { iterations, .. }) => {
                    prop_assert_eq!(iterations, bound);
                    break;
                }
                Err(other) => panic!("unexpected error at bound {bound}: {other}"),
            }
        }
    }
}

//! Pipeline Orchestrator (`SPEC_FULL.md` §4.1). Staged execution modeled
//! on the teacher's `sdtm_cli::pipeline::PipelineRunner`: a struct holding
//! the shared collaborators, a `run` entry point that executes
//! `info_span!`-wrapped stages in sequence and logs `duration_ms` after
//! each, and a `resume()` path that re-enters at `state.current_phase`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use orch_agents::{
    run_with_retries, ContextPack, GeneratedDataset, HumanReviewGate, HumanReviewOutcome,
    ProductionProgrammerAgent, QcProgrammerAgent, SpecBuilderAgent, SpecReviewerAgent, ValidatorAgent,
    DEFAULT_MAX_RETRIES,
};
use orch_ct::CtResolver;
use orch_ig::IgClient;
use orch_llm::LlmClient;
use orch_memory::MemoryStore;
use orch_model::ids::{DomainCode, StudyId};
use orch_model::{ComparisonResult, PipelineState, SpecStatus, Stage, StageStatus};
use orch_registry::FunctionRegistry;

use crate::error::{CoreError, Result};
use crate::human_review::HumanReviewSource;

/// Bounded number of spec-build/spec-review/human-review cycles before the
/// orchestrator gives up on ever reaching an approved spec. Not part of
/// `spec.md`'s MAX_ITERATIONS (that one bounds the production/QC
/// comparison loop only) — a separate, smaller bound so a reviewer who
/// keeps rejecting doesn't spin the pipeline forever.
pub const MAX_HUMAN_REVIEW_CYCLES: u32 = 5;

pub struct PipelineOrchestrator<'a> {
    pub study_id: StudyId,
    pub domain: DomainCode,
    pub output_root: PathBuf,
    pub raw_data_root: PathBuf,
    pub registry: FunctionRegistry,
    pub ig: Box<dyn IgClient>,
    pub ct: CtResolver,
    pub conventions: orch_conventions::ConventionsStore,
    pub memory: MemoryStore,
    pub llm: LlmClient,
    pub python_interpreter: String,
    pub identity_variables: Vec<String>,
    pub abort_on_validation_violation: bool,
    pub max_comparison_iterations: u32,
    pub float_epsilon: f64,
    pub human_review: &'a dyn HumanReviewSource,
}

impl<'a> PipelineOrchestrator<'a> {
    fn state_path(&self) -> PathBuf {
        orch_state::default_state_path(&self.output_root.join(self.domain.as_str()))
    }

    /// Starts a fresh pipeline. Refuses to run over an already-started one
    /// (`SPEC_FULL.md` §5: "the output directory is exclusively owned by
    /// the pipeline for its duration; `--resume` is the only way to
    /// re-enter").
    pub fn run(&mut self, only_stage: Option<Stage>, force: bool) -> Result<PipelineState> {
        let state_path = self.state_path();
        if state_path.exists() {
            return Err(CoreError::OutputRootInUse { path: state_path });
        }
        let mut state = PipelineState::new(self.study_id.clone(), self.domain.clone(), Utc::now());
        self.drive(&mut state, only_stage, force)
    }

    /// Resumes a previously checkpointed pipeline from `state.current_phase`.
    pub fn resume(&mut self, only_stage: Option<Stage>, force: bool) -> Result<PipelineState> {
        let state_path = self.state_path();
        if !state_path.exists() {
            return Err(CoreError::NothingToResume { path: state_path });
        }
        let mut state = orch_state::load(&state_path).map_err(|source| CoreError::State {
            stage: Stage::SpecBuilding,
            source,
        })?;
        self.drive(&mut state, only_stage, force)
    }

    fn save_checkpoint(&self, state: &PipelineState) -> Result<()> {
        orch_state::save(state, &self.state_path()).map_err(|source| CoreError::State {
            stage: state.current_phase,
            source,
        })
    }

    fn fail(&self, state: &mut PipelineState, error: CoreError) -> CoreError {
        state.record_error(&error.to_orch_error(), Utc::now());
        state.updated_at = Utc::now();
        let _ = self.save_checkpoint(state);
        error
    }

    /// Runs either every remaining stage from `state.current_phase` (the
    /// full-pipeline path) or exactly one stage (`--stage`), asserting its
    /// predecessor's artifact is already recorded.
    fn drive(&mut self, state: &mut PipelineState, only_stage: Option<Stage>, force: bool) -> Result<PipelineState> {
        if let Some(stage) = only_stage {
            self.assert_predecessor_artifacts(state, stage)?;
            state.current_phase = stage;
            self.run_stage(state, stage, force)?;
            return Ok(state.clone());
        }

        let sequence = Stage::sequence();
        let mut idx = sequence
            .iter()
            .position(|s| *s == state.current_phase)
            .unwrap_or(0);
        while sequence[idx] != Stage::Complete {
            let stage = sequence[idx];
            self.run_stage(state, stage, force)?;
            // human-review may have sent current_phase back to SpecBuilding;
            // re-derive idx from state rather than assuming forward progress.
            idx = sequence
                .iter()
                .position(|s| *s == state.current_phase)
                .unwrap_or(idx);
        }
        Ok(state.clone())
    }

    fn assert_predecessor_artifacts(&self, state: &PipelineState, stage: Stage) -> Result<()> {
        let Some(predecessor) = stage.predecessor() else {
            return Ok(());
        };
        let required: &[&str] = match predecessor {
            Stage::SpecBuilding => &["draft_spec"],
            Stage::SpecReview => &["draft_spec"],
            Stage::HumanReview => &["approved_spec"],
            Stage::Production => &["production_dataset"],
            Stage::Qc => &["qc_dataset"],
            Stage::Comparison => &["comparison_report"],
            Stage::Validation | Stage::Complete => &[],
        };
        for artifact in required {
            if state.artifact(artifact).is_none() {
                return Err(CoreError::PredecessorMissing { stage, artifact });
            }
        }
        Ok(())
    }

    fn run_stage(&mut self, state: &mut PipelineState, stage: Stage, force: bool) -> Result<()> {
        let span = tracing::info_span!(
            "pipeline_stage",
            study_id = %self.study_id,
            domain = %self.domain,
            stage = ?stage
        );
        let _enter = span.enter();
        let started = Instant::now();

        let result = match stage {
            Stage::SpecBuilding => self.stage_spec_building(state),
            Stage::SpecReview => self.stage_spec_review(state, force),
            Stage::HumanReview => self.stage_human_review(state),
            Stage::Production => self.stage_production(state),
            Stage::Qc => self.stage_qc(state),
            Stage::Comparison => self.stage_comparison(state),
            Stage::Validation => self.stage_validation(state),
            Stage::Complete => Ok(()),
        };

        match result {
            Ok(()) => {
                tracing::info!(duration_ms = started.elapsed().as_millis() as u64, "stage succeeded");
                state.updated_at = Utc::now();
                self.save_checkpoint(state)?;
                Ok(())
            }
            Err(error) => {
                tracing::error!(duration_ms = started.elapsed().as_millis() as u64, error = %error, "stage failed");
                Err(self.fail(state, error))
            }
        }
    }

    fn registry_catalog(&self) -> String {
        self.registry.format_for_prompt()
    }

    fn coding_standards(&self) -> Vec<String> {
        self.memory.coding_standards().into_iter().map(str::to_string).collect()
    }

    fn recent_decisions_for(&self, variables: &[String]) -> Vec<orch_model::DecisionRecord> {
        let mut seen = std::collections::BTreeSet::new();
        let mut out = Vec::new();
        for variable in variables {
            for decision in self.memory.recent_decisions(variable) {
                let key = (decision.variable.clone(), decision.recorded_at);
                if seen.insert(key) {
                    out.push(decision.clone());
                }
            }
        }
        out
    }

    fn relevant_pitfalls(&self) -> Vec<orch_model::PitfallRecord> {
        self.memory
            .relevant_pitfalls(self.domain.as_str())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Distinct raw values per controlled-terminology variable for this
    /// domain's raw table, keyed by variable name so
    /// `SpecBuilderAgent::enrich_controlled_terminology` can look them up
    /// by `target_variable` (`SPEC_FULL.md` §4.4.1: "inspect each column
    /// in raw data"). Missing or unreadable raw data is not fatal to
    /// spec-building — it just means CT enrichment runs against an empty
    /// map, same as before this was wired up.
    fn raw_value_samples(&self, ig_ct: &[String]) -> BTreeMap<String, Vec<String>> {
        const MAX_SAMPLES_PER_VARIABLE: usize = 50;

        let known = vec![self.domain.as_str().to_string()];
        let discovered = match orch_ingest::discover_files(&self.raw_data_root, &known) {
            Ok(files) => files,
            Err(error) => {
                tracing::warn!(error = %error, "skipping raw-value sampling: could not discover raw data files");
                return BTreeMap::new();
            }
        };
        if discovered.is_empty() {
            return BTreeMap::new();
        }
        let tables = match orch_ingest::load_raw_tables(&discovered) {
            Ok(tables) => tables,
            Err(error) => {
                tracing::warn!(error = %error, "skipping raw-value sampling: could not load raw data tables");
                return BTreeMap::new();
            }
        };
        let Some(table) = tables.get(self.domain.as_str()) else {
            return BTreeMap::new();
        };

        let mut samples = BTreeMap::new();
        for variable in ig_ct {
            let Ok(series) = table.column(variable) else {
                continue;
            };
            let mut seen = std::collections::BTreeSet::new();
            let mut values = Vec::new();
            for value in series.iter() {
                let Some(rendered) = orch_ingest::any_to_string_non_empty(&value) else {
                    continue;
                };
                if seen.insert(rendered.clone()) {
                    values.push(rendered);
                    if values.len() >= MAX_SAMPLES_PER_VARIABLE {
                        break;
                    }
                }
            }
            if !values.is_empty() {
                samples.insert(variable.clone(), values);
            }
        }
        samples
    }

    fn stage_spec_building(&mut self, state: &mut PipelineState) -> Result<()> {
        let stage = Stage::SpecBuilding;
        let ig_required = self.ig.get_required_variables(self.domain.as_str()).map_err(|source| {
            CoreError::Agent {
                stage,
                source: orch_agents::AgentError::Ig(source),
            }
        })?;
        let ig_conditional =
            self.ig
                .get_conditional_variables(self.domain.as_str())
                .map_err(|source| CoreError::Agent {
                    stage,
                    source: orch_agents::AgentError::Ig(source),
                })?;
        let ig_ct = self.ig.get_ct_variables(self.domain.as_str()).map_err(|source| CoreError::Agent {
            stage,
            source: orch_agents::AgentError::Ig(source),
        })?;

        let mut tracked = ig_required.clone();
        tracked.extend(ig_conditional.clone());
        tracked.extend(ig_ct.clone());

        let ctx = ContextPack::for_spec_stage(
            self.domain.as_str().to_string(),
            self.registry_catalog(),
            ig_required,
            ig_conditional,
            ig_ct,
            self.coding_standards(),
            self.recent_decisions_for(&tracked),
            self.relevant_pitfalls(),
            self.conventions.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            self.raw_data_root.clone(),
            self.output_root.clone(),
        );

        let raw_value_samples = self.raw_value_samples(&ctx.ig_ct_variables);

        let agent = SpecBuilderAgent {
            study_id: self.study_id.as_str(),
            llm: &self.llm,
            ig: self.ig.as_ref(),
            ct: &self.ct,
            registry: &self.registry,
            ctx: &ctx,
            raw_value_samples: &raw_value_samples,
        };
        let draft = run_with_retries(&agent, DEFAULT_MAX_RETRIES).map_err(|source| CoreError::Agent { stage, source })?;

        orch_spec::save_draft(&self.output_root, &draft).map_err(|source| CoreError::Spec { stage, source })?;
        let human_readable = orch_spec::export_human_readable(&draft);
        let human_readable_path = self
            .output_root
            .join(self.domain.as_str())
            .join("spec_human_readable.txt");
        std::fs::write(&human_readable_path, human_readable).map_err(|source| CoreError::Agent {
            stage,
            source: orch_agents::AgentError::ScriptWrite {
                path: human_readable_path.clone(),
                source,
            },
        })?;

        state.set_artifact("draft_spec", self.output_root.join(self.domain.as_str()).join("spec.draft.json").display().to_string());
        state.set_artifact("human_readable_spec", human_readable_path.display().to_string());
        state.current_phase = Stage::SpecReview;
        Ok(())
    }

    fn stage_spec_review(&mut self, state: &mut PipelineState, force: bool) -> Result<()> {
        let stage = Stage::SpecReview;
        let draft = orch_spec::load_draft(&self.output_root, self.domain.as_str())
            .map_err(|source| CoreError::Spec { stage, source })?;

        let ig_required = self.ig.get_required_variables(self.domain.as_str()).map_err(|source| {
            CoreError::Agent {
                stage,
                source: orch_agents::AgentError::Ig(source),
            }
        })?;
        let ig_conditional =
            self.ig
                .get_conditional_variables(self.domain.as_str())
                .map_err(|source| CoreError::Agent {
                    stage,
                    source: orch_agents::AgentError::Ig(source),
                })?;

        let ctx = ContextPack::for_spec_stage(
            self.domain.as_str().to_string(),
            self.registry_catalog(),
            ig_required,
            ig_conditional,
            Vec::new(),
            self.coding_standards(),
            Vec::new(),
            Vec::new(),
            self.conventions.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            self.raw_data_root.clone(),
            self.output_root.clone(),
        );

        let agent = SpecReviewerAgent {
            llm: &self.llm,
            registry: &self.registry,
            ctx: &ctx,
            draft: &draft,
        };
        let outcome = run_with_retries(&agent, DEFAULT_MAX_RETRIES).map_err(|source| CoreError::Agent { stage, source })?;

        if !outcome.passes() && !force {
            let messages = outcome
                .findings
                .iter()
                .filter(|f| f.severity == orch_spec::Severity::Error)
                .map(|f| f.message.clone())
                .collect();
            return Err(CoreError::SpecReviewBlocked { findings: messages });
        }

        orch_spec::save_draft(&self.output_root, &outcome.spec).map_err(|source| CoreError::Spec { stage, source })?;
        state
            .advance_spec_status(SpecStatus::Reviewed)
            .map_err(|message| CoreError::Gate { stage, message })?;
        state.current_phase = Stage::HumanReview;
        Ok(())
    }

    fn stage_human_review(&mut self, state: &mut PipelineState) -> Result<()> {
        let stage = Stage::HumanReview;
        let mut cycles = 0u32;
        loop {
            let draft = orch_spec::load_draft(&self.output_root, self.domain.as_str())
                .map_err(|source| CoreError::Spec { stage, source })?;
            let submission = self.human_review.collect(&draft);

            let gate = HumanReviewGate {
                study_id: self.study_id.as_str(),
                spec: &draft,
                conventions: &self.conventions,
                decisions: &submission.decisions,
                verdict: submission.verdict,
                now: Utc::now(),
            };
            let outcome = run_with_retries(&gate, 0).map_err(|source| CoreError::Agent { stage, source })?;

            match outcome {
                HumanReviewOutcome::Approved { spec, decisions } => {
                    for decision in &decisions {
                        if orch_agents::contradicts_convention(
                            &self.conventions,
                            &decision.variable,
                            decision.option_id.as_deref(),
                        ) {
                            self.memory
                                .record_pitfall(
                                    self.study_id.as_str(),
                                    self.domain.as_str(),
                                    format!("{}-convention-override", decision.variable),
                                    format!(
                                        "human override for {} disagreed with the recommended convention",
                                        decision.variable
                                    ),
                                    "recorded as a promotion-candidate-shaped note for later company-convention review".to_string(),
                                    Utc::now(),
                                )
                                .map_err(|source| CoreError::Agent {
                                    stage,
                                    source: orch_agents::AgentError::Memory(source),
                                })?;
                        }
                        self.memory.record_decision(decision.clone()).map_err(|source| CoreError::Agent {
                            stage,
                            source: orch_agents::AgentError::Memory(source),
                        })?;
                        state.human_decisions.insert(
                            decision.variable.clone(),
                            orch_model::HumanDecision {
                                variable: decision.variable.clone(),
                                option_id: decision.option_id.clone().unwrap_or_default(),
                                rationale: Some(decision.rationale.clone()),
                                decided_at: Utc::now(),
                            },
                        );
                    }

                    orch_spec::save_approved(&self.output_root, &spec).map_err(|source| CoreError::Spec { stage, source })?;
                    state
                        .advance_spec_status(SpecStatus::Approved)
                        .map_err(|message| CoreError::Gate { stage, message })?;
                    state.set_artifact(
                        "approved_spec",
                        self.output_root
                            .join(self.domain.as_str())
                            .join("spec.approved.json")
                            .display()
                            .to_string(),
                    );
                    state.current_phase = Stage::Production;
                    return Ok(());
                }
                HumanReviewOutcome::Rejected { .. } => {
                    cycles += 1;
                    if cycles >= MAX_HUMAN_REVIEW_CYCLES {
                        return Err(CoreError::HumanReviewExhausted { cycles });
                    }
                    // loop back to spec-building in the same stage run so a
                    // resumed pipeline doesn't need operator intervention
                    // between every rebuild.
                    state.current_phase = Stage::SpecBuilding;
                    self.stage_spec_building(state)?;
                    self.stage_spec_review(state, false)?;
                }
            }
        }
    }

    fn stage_production(&mut self, state: &mut PipelineState) -> Result<()> {
        let stage = Stage::Production;
        let spec = orch_spec::load_approved(&self.output_root, self.domain.as_str())
            .map_err(|source| CoreError::Spec { stage, source })?;
        let previous_mismatch_report = if state.comparison_result == ComparisonResult::Mismatch {
            self.last_comparison_report(state)
        } else {
            None
        };

        let ctx = ContextPack::for_production(
            self.domain.as_str().to_string(),
            self.registry_catalog(),
            self.coding_standards(),
            self.raw_data_root.clone(),
            self.output_root.clone(),
            previous_mismatch_report,
        );
        let agent = ProductionProgrammerAgent {
            llm: &self.llm,
            registry: &self.registry,
            ctx: &ctx,
            spec: &spec,
            python_interpreter: &self.python_interpreter,
        };
        let dataset: GeneratedDataset =
            run_with_retries(&agent, DEFAULT_MAX_RETRIES).map_err(|source| CoreError::Agent { stage, source })?;

        state.production_status = StageStatus::Succeeded;
        state.set_artifact("production_script", dataset.script_path.display().to_string());
        state.set_artifact("production_dataset", dataset.output_path.display().to_string());
        state.current_phase = Stage::Qc;
        Ok(())
    }

    fn stage_qc(&mut self, state: &mut PipelineState) -> Result<()> {
        let stage = Stage::Qc;
        let spec = orch_spec::load_approved(&self.output_root, self.domain.as_str())
            .map_err(|source| CoreError::Spec { stage, source })?;
        let previous_mismatch_report = if state.comparison_result == ComparisonResult::Mismatch {
            self.last_comparison_report(state)
        } else {
            None
        };

        // P9: built via `for_qc`, whose signature has no parameter a
        // production artifact path could flow through.
        let ctx = ContextPack::for_qc(
            self.domain.as_str().to_string(),
            self.registry_catalog(),
            self.coding_standards(),
            self.raw_data_root.clone(),
            self.output_root.clone(),
            previous_mismatch_report,
        );
        let agent = QcProgrammerAgent {
            llm: &self.llm,
            registry: &self.registry,
            ctx: &ctx,
            spec: &spec,
            python_interpreter: &self.python_interpreter,
        };
        let dataset: GeneratedDataset =
            run_with_retries(&agent, DEFAULT_MAX_RETRIES).map_err(|source| CoreError::Agent { stage, source })?;

        state.qc_status = StageStatus::Succeeded;
        state.set_artifact("qc_script", dataset.script_path.display().to_string());
        state.set_artifact("qc_dataset", dataset.output_path.display().to_string());
        state.current_phase = Stage::Comparison;
        Ok(())
    }

    fn last_comparison_report(&self, state: &PipelineState) -> Option<orch_model::ComparisonReport> {
        let path = state.artifact("comparison_report")?;
        let text = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&text).ok()
    }

    fn stage_comparison(&mut self, state: &mut PipelineState) -> Result<()> {
        let stage = Stage::Comparison;
        let production_path = state
            .artifact("production_dataset")
            .ok_or(CoreError::PredecessorMissing {
                stage,
                artifact: "production_dataset",
            })?
            .to_string();
        let qc_path = state
            .artifact("qc_dataset")
            .ok_or(CoreError::PredecessorMissing {
                stage,
                artifact: "qc_dataset",
            })?
            .to_string();

        let production_df =
            orch_ingest::read_parquet_table(std::path::Path::new(&production_path)).map_err(|source| CoreError::Ingest {
                stage,
                source,
            })?;
        let qc_df = orch_ingest::read_parquet_table(std::path::Path::new(&qc_path))
            .map_err(|source| CoreError::Ingest { stage, source })?;

        let identity_key = self
            .identity_variables
            .first()
            .cloned()
            .unwrap_or_else(|| "USUBJID".to_string());
        let mut compare_config = orch_compare::CompareConfig::new(identity_key);
        compare_config.float_epsilon = self.float_epsilon;

        let report = orch_compare::compare(&production_df, &qc_df, &compare_config)
            .map_err(|source| CoreError::Compare { stage, source })?;

        let report_path = self.output_root.join(self.domain.as_str()).join("compare_report.json");
        let body = serde_json::to_vec_pretty(&report).expect("comparison report is always serializable");
        std::fs::write(&report_path, body).map_err(|source| CoreError::Agent {
            stage,
            source: orch_agents::AgentError::ScriptWrite {
                path: report_path.clone(),
                source,
            },
        })?;
        state.set_artifact("comparison_report", report_path.display().to_string());

        if report.is_match() {
            state.comparison_result = ComparisonResult::Match;
            state.current_phase = Stage::Validation;
            return Ok(());
        }

        state.comparison_result = ComparisonResult::Mismatch;
        state.comparison_iteration += 1;
        if state.comparison_iteration >= self.max_comparison_iterations {
            return Err(CoreError::ComparisonExhausted {
                stage,
                iterations: state.comparison_iteration,
            });
        }

        // Send control back to `drive()`'s stage loop at `Production`
        // rather than recursing, so each of the next production/QC/
        // comparison attempts gets its own checkpoint — a crash mid-retry
        // resumes at the attempt in progress, not at the start of the
        // whole loop (both still see the mismatch report, never each
        // other's output).
        state.current_phase = Stage::Production;
        Ok(())
    }

    fn stage_validation(&mut self, state: &mut PipelineState) -> Result<()> {
        let stage = Stage::Validation;
        let spec = orch_spec::load_approved(&self.output_root, self.domain.as_str())
            .map_err(|source| CoreError::Spec { stage, source })?;
        let dataset_path = state
            .artifact("production_dataset")
            .ok_or(CoreError::PredecessorMissing {
                stage,
                artifact: "production_dataset",
            })?
            .to_string();

        let ctx = ContextPack::for_validation(self.domain.as_str().to_string(), self.coding_standards(), self.output_root.clone());
        let agent = ValidatorAgent {
            spec: &spec,
            dataset_path: std::path::Path::new(&dataset_path),
            identity_variables: &self.identity_variables,
            abort_on_violation: self.abort_on_validation_violation,
            ctx: &ctx,
        };
        let outcome = run_with_retries(&agent, 0).map_err(|source| CoreError::Agent { stage, source })?;

        let domain_dir = self.output_root.join(self.domain.as_str());
        let report_path = domain_dir.join("validation_report.json");
        let codelist_path = domain_dir.join("codelist_sheet.json");
        let define_path = domain_dir.join("define_metadata.json");

        std::fs::write(
            &report_path,
            serde_json::to_vec_pretty(&outcome.report).expect("validation report is always serializable"),
        )
        .map_err(|source| CoreError::Agent {
            stage,
            source: orch_agents::AgentError::ScriptWrite {
                path: report_path.clone(),
                source,
            },
        })?;
        std::fs::write(
            &codelist_path,
            serde_json::to_vec_pretty(&outcome.codelist_sheet).expect("codelist sheet is always serializable"),
        )
        .map_err(|source| CoreError::Agent {
            stage,
            source: orch_agents::AgentError::ScriptWrite {
                path: codelist_path.clone(),
                source,
            },
        })?;
        std::fs::write(
            &define_path,
            serde_json::to_vec_pretty(&outcome.define_metadata).expect("define metadata is always serializable"),
        )
        .map_err(|source| CoreError::Agent {
            stage,
            source: orch_agents::AgentError::ScriptWrite {
                path: define_path.clone(),
                source,
            },
        })?;

        state.set_artifact("validation_report", report_path.display().to_string());
        state.set_artifact("codelist_sheet", codelist_path.display().to_string());
        state.set_artifact("define_metadata", define_path.display().to_string());

        if outcome.report.has_errors() {
            state.validation_status = StageStatus::Failed;
        } else {
            state.validation_status = StageStatus::Succeeded;
            state
                .advance_spec_status(SpecStatus::Finalized)
                .map_err(|message| CoreError::Gate { stage, message })?;
        }
        state.current_phase = Stage::Complete;
        Ok(())
    }
}

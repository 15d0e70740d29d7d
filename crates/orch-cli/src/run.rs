//! Wires a [`RunArgs`] invocation into a bootstrapped orchestrator, drives
//! it, prints the resulting state, and maps a [`CoreError`] to a process
//! exit code.

use anyhow::Context;
use orch_core::{bootstrap, AutoApprove, BootstrapArgs, CoreError, LlmSelection};
use orch_model::{DomainCode, ErrorKind, StudyId};

use crate::cli::{LlmModeArg, RunArgs, StageArg};
use crate::human_review::TerminalReview;
use crate::summary::print_state;

pub fn run(args: RunArgs) -> anyhow::Result<i32> {
    let config = orch_config::resolve(&args.config, args.study_config.as_deref())
        .with_context(|| format!("resolving configuration from {}", args.config.display()))?;

    let study_id = StudyId::new(args.study.clone()).context("invalid --study")?;
    let domain = DomainCode::new(args.domain.clone()).context("invalid --domain")?;

    let llm = match args.llm_mode {
        LlmModeArg::Live => LlmSelection::Live {
            endpoint: args
                .llm_endpoint
                .clone()
                .context("--llm-endpoint is required for --llm-mode live")?,
            api_key: std::env::var(orch_config::LLM_API_KEY_ENV_VAR)
                .with_context(|| format!("{} must be set for --llm-mode live", orch_config::LLM_API_KEY_ENV_VAR))?,
            model: args.llm_model.clone(),
        },
        LlmModeArg::LogOnly => LlmSelection::LogOnly {
            log_path: args.llm_log_path.clone(),
        },
        LlmModeArg::Template => LlmSelection::Template,
    };

    let identity_variables = if args.identity_variables.is_empty() {
        vec!["USUBJID".to_string()]
    } else {
        args.identity_variables.clone()
    };

    let terminal_review = TerminalReview;
    let auto_approve = AutoApprove;
    let human_review: &dyn orch_core::HumanReviewSource = if matches!(args.llm_mode, LlmModeArg::Template) && !args.resume {
        &auto_approve
    } else {
        &terminal_review
    };

    let mut orchestrator = bootstrap(BootstrapArgs {
        config: &config,
        study_id,
        domain,
        raw_data_root: args.raw_data_root.clone(),
        llm,
        python_interpreter: args.python_interpreter.clone(),
        identity_variables,
        abort_on_validation_violation: args.abort_on_validation_violation,
        human_review,
    })
    .context("bootstrapping pipeline orchestrator")?;

    let only_stage = args.stage.map(StageArg::into);

    let outcome = if args.resume {
        orchestrator.resume(only_stage, args.force)
    } else {
        orchestrator.run(only_stage, args.force)
    };

    match outcome {
        Ok(state) => {
            print_state(&state);
            Ok(0)
        }
        Err(err) => {
            eprintln!("pipeline error: {err}");
            Ok(exit_code_for(&err))
        }
    }
}

fn exit_code_for(err: &CoreError) -> i32 {
    match err.kind() {
        ErrorKind::Config => 2,
        ErrorKind::IgUnavailable | ErrorKind::CtResolution => 3,
        ErrorKind::Model => 4,
        ErrorKind::SchemaViolation => 5,
        ErrorKind::SpecValidation => 6,
        ErrorKind::ScriptExecution => 7,
        ErrorKind::ComparisonMismatch => 8,
        ErrorKind::ValidationFinding => 9,
    }
}

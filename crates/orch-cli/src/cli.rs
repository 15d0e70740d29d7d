//! CLI argument definitions for the SDTM pipeline orchestrator.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "sdtm-orchestrator",
    version,
    about = "SDTM mapping pipeline orchestrator",
    long_about = "Drives the spec-build, review, production, QC, comparison, and validation \
                  stages of an SDTM mapping run for one study/domain pair, checkpointing \
                  progress after every stage so a crashed or interrupted run can be resumed."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow subject-level values (PHI/PII) to appear in logs. Off by
    /// default; every value that would otherwise be logged at this level
    /// is replaced with a redacted placeholder.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run or resume a pipeline for one study/domain pair.
    Run(RunArgs),

    /// List the stages a pipeline run passes through, in order.
    Stages,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Study identifier (e.g. STUDY01).
    #[arg(long)]
    pub study: String,

    /// SDTM domain code (e.g. DM, AE, VS).
    #[arg(long)]
    pub domain: String,

    /// Directory containing the study's raw source datasets.
    #[arg(long = "raw-data-root", value_name = "DIR")]
    pub raw_data_root: PathBuf,

    /// Base configuration file (standards dir, registry, CT overlay, output root).
    #[arg(long = "config", value_name = "PATH", default_value = "orchestrator.toml")]
    pub config: PathBuf,

    /// Optional per-study configuration overlay, deep-merged over `--config`.
    #[arg(long = "study-config", value_name = "PATH")]
    pub study_config: Option<PathBuf>,

    /// Run only this stage instead of the full remaining sequence. The
    /// stage's predecessor artifact must already be recorded.
    #[arg(long, value_enum)]
    pub stage: Option<StageArg>,

    /// Resume a previously checkpointed run instead of starting a fresh one.
    #[arg(long)]
    pub resume: bool,

    /// Proceed past a spec-review gate that reported error-severity findings.
    #[arg(long)]
    pub force: bool,

    /// Abort the run if the validation stage reports an error-severity finding
    /// (otherwise validation findings are recorded but do not stop the pipeline).
    #[arg(long = "abort-on-validation-violation")]
    pub abort_on_validation_violation: bool,

    /// Identity variables that must be present and unique in the production
    /// dataset (e.g. USUBJID). Defaults to USUBJID alone.
    #[arg(long = "identity-variable", value_name = "VAR")]
    pub identity_variables: Vec<String>,

    /// Python interpreter used to execute generated production/QC scripts.
    #[arg(long = "python", default_value = "python3")]
    pub python_interpreter: String,

    /// LLM mode: "live" calls the configured endpoint, "log-only" records
    /// prompts to a file without calling out, "template" fills deterministic
    /// placeholder responses for offline runs.
    #[arg(long = "llm-mode", value_enum, default_value = "template")]
    pub llm_mode: LlmModeArg,

    /// Endpoint URL for `--llm-mode live`.
    #[arg(long = "llm-endpoint")]
    pub llm_endpoint: Option<String>,

    /// Model name for `--llm-mode live`.
    #[arg(long = "llm-model", default_value = "gpt-4")]
    pub llm_model: String,

    /// Prompt/response log path for `--llm-mode log-only`.
    #[arg(long = "llm-log-path", default_value = "llm.log")]
    pub llm_log_path: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StageArg {
    SpecBuilding,
    SpecReview,
    HumanReview,
    Production,
    Qc,
    Comparison,
    Validation,
}

impl From<StageArg> for orch_model::Stage {
    fn from(value: StageArg) -> Self {
        match value {
            StageArg::SpecBuilding => Self::SpecBuilding,
            StageArg::SpecReview => Self::SpecReview,
            StageArg::HumanReview => Self::HumanReview,
            StageArg::Production => Self::Production,
            StageArg::Qc => Self::Qc,
            StageArg::Comparison => Self::Comparison,
            StageArg::Validation => Self::Validation,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LlmModeArg {
    Live,
    LogOnly,
    Template,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

//! `sdtm-orchestrator`: CLI entry point driving the Pipeline Orchestrator.

mod cli;
mod human_review;
mod logging;
mod run;
mod summary;

use clap::Parser;
use cli::{Cli, Command};
use logging::LogConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.write_global();

    let log_config = LogConfig::from_verbosity(cli.verbosity.tracing_level_filter(), cli.log_level)
        .with_format(cli.log_format.into())
        .with_log_file(cli.log_file.clone())
        .with_log_data(cli.log_data);
    logging::init_logging(&log_config)?;

    match cli.command {
        Command::Stages => {
            for stage in orch_model::Stage::sequence() {
                println!("{stage:?}");
            }
            Ok(())
        }
        Command::Run(args) => {
            let code = run::run(args)?;
            std::process::exit(code);
        }
    }
}
